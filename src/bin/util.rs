//! ipregion-util: query, inspect, and generate xdb files.

use clap::{Parser, Subcommand};
use ipregion::{CachePolicy, Searcher, XdbWriter};
use std::fs;
use std::io::BufRead;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ipregion-util")]
#[command(version = "0.1.0")]
#[command(about = "Offline IP-to-region lookup over xdb files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up regions for addresses (from args, or stdin when omitted)
    Query {
        /// Path to the xdb file
        #[arg(short, long)]
        db: PathBuf,

        /// Cache policy: file, vector-index, or content
        #[arg(short, long, default_value = "vector-index")]
        policy: String,

        /// Addresses to resolve
        ips: Vec<String>,
    },

    /// Print the decoded file header
    Header {
        /// Path to the xdb file
        #[arg(short, long)]
        db: PathBuf,
    },

    /// Generate an xdb file from `start|end|region` lines
    Gen {
        /// Input text file, one inclusive range per line
        #[arg(short, long)]
        input: PathBuf,

        /// Output xdb file
        #[arg(short, long)]
        output: PathBuf,

        /// Build an IPv6 image instead of IPv4
        #[arg(long)]
        ipv6: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Query { db, policy, ips } => {
            if let Err(e) = run_query(&db, &policy, &ips) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Header { db } => {
            if let Err(e) = run_header(&db) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Gen {
            input,
            output,
            ipv6,
        } => {
            if let Err(e) = run_gen(&input, &output, ipv6) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_query(db: &PathBuf, policy: &str, ips: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let policy: CachePolicy = policy.parse()?;
    let searcher = Searcher::new(policy, db)?;

    if ips.is_empty() {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = line?;
            let addr = line.trim();
            if addr.is_empty() {
                continue;
            }
            print_lookup(&searcher, addr);
        }
    } else {
        for addr in ips {
            print_lookup(&searcher, addr);
        }
    }

    Ok(())
}

fn print_lookup(searcher: &Searcher, addr: &str) {
    match searcher.search(addr) {
        Ok(region) => println!("{}\t{}\t({} reads)", addr, region, searcher.io_count()),
        Err(e) => eprintln!("{}: {}", addr, e),
    }
}

fn run_header(db: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let searcher = Searcher::new(CachePolicy::File, db)?;
    let header = searcher.header()?;

    println!("version:         {}", header.version);
    println!("index policy:    {}", header.index_policy);
    println!("created at:      {}", header.created_at);
    println!("start index ptr: {}", header.start_index_ptr);
    println!("end index ptr:   {}", header.end_index_ptr);

    Ok(())
}

fn run_gen(input: &PathBuf, output: &PathBuf, ipv6: bool) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(input)?;
    let mut writer = if ipv6 {
        XdbWriter::new_v6()
    } else {
        XdbWriter::new_v4()
    };

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(3, '|');
        let (Some(start), Some(end), Some(region)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("line {}: expected start|end|region", lineno + 1).into());
        };
        let start = start
            .trim()
            .parse()
            .map_err(|_| format!("line {}: invalid start address", lineno + 1))?;
        let end = end
            .trim()
            .parse()
            .map_err(|_| format!("line {}: invalid end address", lineno + 1))?;
        writer.add_range(start, end, region)?;
    }

    let image = writer.build()?;
    fs::write(output, &image)?;
    println!(
        "wrote {} records ({} bytes) to {}",
        writer.record_count(),
        image.len(),
        output.display()
    );

    Ok(())
}

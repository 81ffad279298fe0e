//! ipregion - offline IP-to-region lookup over xdb binary index files.
//!
//! This crate answers "which region does this IP belong to" against a
//! precomputed binary index file (the xdb format) with no network access.
//! A query walks a two-level index: a dense 256 x 256 vector table keyed
//! by the first two address bytes, then a binary search over that slot's
//! sorted range records.
//!
//! # Features
//!
//! - **Three cache policies**: query straight from the file, preload the
//!   524 KiB vector index, or preload the whole file
//! - **IPv4 and IPv6**: one address family per file, selected by the
//!   query's byte length
//! - **Thread-safe**: a constructed searcher is read-only and serves
//!   concurrent queries without locking
//! - **I/O accounting**: per-query count of physical reads
//!
//! # Quick Start
//!
//! ```ignore
//! use ipregion::{CachePolicy, Searcher};
//!
//! let searcher = Searcher::new(CachePolicy::VectorIndex, "ip2region.xdb")?;
//! let region = searcher.search("1.2.3.4")?;
//! println!("{} ({} reads)", region, searcher.io_count());
//! ```
//!
//! An address covered by no range resolves to the empty string rather
//! than an error, which distinguishes "unknown IP" from "lookup failed".

mod error;
mod searcher;

pub mod xdb;

// Re-export core types
pub use error::{Error, Result};
pub use searcher::{CachePolicy, Searcher};

// Re-export the format header and the image builder for advanced usage
pub use xdb::format::Header;
pub use xdb::writer::XdbWriter;

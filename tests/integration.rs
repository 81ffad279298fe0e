//! Integration tests for the public searcher API.

use ipregion::{CachePolicy, Error, Searcher, XdbWriter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::thread;
use tempfile::NamedTempFile;

fn sample_image() -> Vec<u8> {
    let mut writer = XdbWriter::new_v4();
    for a in 1..=50u8 {
        writer
            .add_record(
                &[a, 0, 0, 0],
                &[a, 3, 255, 255],
                &format!("country|{}|carrier", a),
            )
            .unwrap();
    }
    writer
        .add_record(&[100, 0, 0, 0], &[100, 0, 0, 255], "single|block")
        .unwrap();
    writer.build().unwrap()
}

fn write_temp(image: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(image).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_search_textual_and_parsed_addresses() {
    let file = write_temp(&sample_image());
    let searcher = Searcher::new(CachePolicy::VectorIndex, file.path()).unwrap();

    assert_eq!(searcher.search("7.1.2.3").unwrap(), "country|7|carrier");
    assert_eq!(
        searcher
            .search_ip(IpAddr::V4(Ipv4Addr::new(7, 1, 2, 3)))
            .unwrap(),
        "country|7|carrier"
    );
    assert_eq!(
        searcher.search_bytes(&[7, 1, 2, 3]).unwrap(),
        "country|7|carrier"
    );

    // Outside every range.
    assert_eq!(searcher.search("60.0.0.1").unwrap(), "");
}

#[test]
fn test_search_rejects_unparseable_text() {
    let file = write_temp(&sample_image());
    let searcher = Searcher::new(CachePolicy::Content, file.path()).unwrap();

    assert!(matches!(
        searcher.search("not-an-ip"),
        Err(Error::InvalidIpAddress(_))
    ));
}

#[test]
fn test_search_bytes_rejects_bad_lengths() {
    let file = write_temp(&sample_image());
    let searcher = Searcher::new(CachePolicy::Content, file.path()).unwrap();

    for len in [0usize, 3, 5, 8, 17] {
        let buf = vec![0u8; len];
        assert!(matches!(
            searcher.search_bytes(&buf),
            Err(Error::InvalidIpLength(l)) if l == len
        ));
    }
}

#[test]
fn test_from_content_matches_file_backed() {
    let image = sample_image();
    let file = write_temp(&image);

    let on_disk = Searcher::new(CachePolicy::File, file.path()).unwrap();
    let in_memory = Searcher::from_content(image).unwrap();
    assert_eq!(in_memory.policy(), CachePolicy::Content);

    for addr in ["1.0.0.0", "25.3.255.255", "100.0.0.128", "200.0.0.1"] {
        assert_eq!(
            in_memory.search(addr).unwrap(),
            on_disk.search(addr).unwrap()
        );
    }
    assert_eq!(in_memory.io_count(), 0);
}

#[test]
fn test_io_count_through_facade() {
    let file = write_temp(&sample_image());

    let content = Searcher::new(CachePolicy::Content, file.path()).unwrap();
    content.search("10.1.1.1").unwrap();
    assert_eq!(content.io_count(), 0);

    let vector = Searcher::new(CachePolicy::VectorIndex, file.path()).unwrap();
    vector.search("10.1.1.1").unwrap();
    assert!(vector.io_count() >= 1);

    let by_file = Searcher::new(CachePolicy::File, file.path()).unwrap();
    by_file.search("10.1.1.1").unwrap();
    assert!(by_file.io_count() >= 2);
}

#[test]
fn test_close_is_idempotent_through_facade() {
    let file = write_temp(&sample_image());
    let searcher = Searcher::new(CachePolicy::VectorIndex, file.path()).unwrap();

    assert_eq!(searcher.search("3.0.0.1").unwrap(), "country|3|carrier");
    searcher.close();
    searcher.close();
    assert!(matches!(searcher.search("3.0.0.1"), Err(Error::Closed)));
}

#[test]
fn test_ipv6_end_to_end() {
    let mut writer = XdbWriter::new_v6();
    writer
        .add_range(
            "2001:db8::".parse().unwrap(),
            "2001:db8::ffff".parse().unwrap(),
            "TEST|documentation",
        )
        .unwrap();
    let file = write_temp(&writer.build().unwrap());

    for policy in [
        CachePolicy::File,
        CachePolicy::VectorIndex,
        CachePolicy::Content,
    ] {
        let searcher = Searcher::new(policy, file.path()).unwrap();
        assert_eq!(
            searcher.search("2001:db8::1").unwrap(),
            "TEST|documentation"
        );
        assert_eq!(searcher.search("2001:db9::1").unwrap(), "");
    }
}

#[test]
fn test_concurrent_queries_match_serial_results() {
    let image = sample_image();
    let file = write_temp(&image);

    let mut rng = StdRng::seed_from_u64(42);
    let queries: Vec<[u8; 4]> = (0..400).map(|_| rng.gen::<u32>().to_be_bytes()).collect();

    for policy in [CachePolicy::VectorIndex, CachePolicy::Content] {
        let searcher = Arc::new(Searcher::new(policy, file.path()).unwrap());
        let expected: Vec<String> = queries
            .iter()
            .map(|ip| searcher.search_bytes(ip).unwrap())
            .collect();
        let expected = Arc::new(expected);
        let queries = Arc::new(queries.clone());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let searcher = Arc::clone(&searcher);
                let expected = Arc::clone(&expected);
                let queries = Arc::clone(&queries);
                thread::spawn(move || {
                    for (ip, want) in queries.iter().zip(expected.iter()) {
                        assert_eq!(&searcher.search_bytes(ip).unwrap(), want);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}

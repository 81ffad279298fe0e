//! Cache strategies for xdb queries.
//!
//! All three strategies run the same two-level lookup: the first two bytes
//! of the address pick a vector index slot, the slot names a sorted
//! fixed-stride segment array, and a binary search over that array finds
//! the containing range. They differ only in what is preloaded at
//! construction:
//!
//! - [`FileCache`]: nothing; the vector slot costs one extra 8-byte read
//!   per query.
//! - [`VectorCache`]: the 524 KiB vector index, decoded once into two flat
//!   u32 arrays.
//! - [`ContentCache`]: the whole file plus the decoded vector index;
//!   queries never touch the backing store.
//!
//! A miss is not an error: an address outside every range resolves to the
//! empty string.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::path::Path;

use crate::xdb::format::{
    compare_ip, read_u16, read_u32, segment_record_len, vector_slot, vector_slot_offset, Header,
    HEADER_LEN, MAX_RECORD_LEN, MIN_FILE_LEN, VECTOR_INDEX_LEN, VECTOR_SLOTS, VECTOR_SLOT_LEN,
};
use crate::xdb::reader::{ContentReader, FileReader};
use crate::{Error, Result};

/// Payloads up to this length decode from a stack buffer.
const STACK_BUF_LEN: usize = 256;

thread_local! {
    // Scratch for payloads above STACK_BUF_LEN, reused across queries on
    // the same thread.
    static REGION_BUF: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

/// Vector index materialized as two flat arrays of 65 536 u32 entries.
#[derive(Debug)]
pub(crate) struct VectorTable {
    start: Vec<u32>,
    end: Vec<u32>,
}

impl VectorTable {
    /// Decode the 524 288-byte vector index region.
    fn decode(raw: &[u8]) -> Self {
        debug_assert_eq!(raw.len(), VECTOR_INDEX_LEN);
        let mut start = Vec::with_capacity(VECTOR_SLOTS);
        let mut end = Vec::with_capacity(VECTOR_SLOTS);
        for slot in raw.chunks_exact(VECTOR_SLOT_LEN) {
            start.push(read_u32(slot, 0));
            end.push(read_u32(slot, 4));
        }
        Self { start, end }
    }

    #[inline]
    fn get(&self, slot: usize) -> (u32, u32) {
        (self.start[slot], self.end[slot])
    }
}

/// Validate a vector slot's pointer pair.
#[inline]
fn check_slot(slot: usize, s_ptr: u32, e_ptr: u32) -> Result<()> {
    if e_ptr < s_ptr {
        log::warn!(
            "vector slot {} is corrupt: end pointer {} precedes start pointer {}",
            slot,
            e_ptr,
            s_ptr
        );
        return Err(Error::CorruptVectorSlot {
            slot,
            start: s_ptr,
            end: e_ptr,
        });
    }
    Ok(())
}

/// Binary-search the segment array at `[s_ptr, e_ptr)` through `reader`.
///
/// Returns the matched record's payload length and pointer, or `None` when
/// no range contains the address. A single stack scratch buffer serves
/// every iteration.
fn search_segments(
    reader: &FileReader,
    ip: &[u8],
    s_ptr: u32,
    e_ptr: u32,
) -> Result<Option<(u16, u32)>> {
    let ip_len = ip.len();
    let record_len = segment_record_len(ip_len);
    let mut scratch = [0u8; MAX_RECORD_LEN];
    let record = &mut scratch[..record_len];

    let mut low: i64 = 0;
    let mut high = (e_ptr - s_ptr) as i64 / record_len as i64 - 1;
    while low <= high {
        let mid = (low + high) >> 1;
        let offset = s_ptr as u64 + mid as u64 * record_len as u64;
        reader.read_into(offset, record)?;
        if compare_ip(ip, &record[..ip_len]) == Ordering::Less {
            high = mid - 1;
        } else if compare_ip(ip, &record[ip_len..2 * ip_len]) == Ordering::Greater {
            low = mid + 1;
        } else {
            let data_len = read_u16(record, 2 * ip_len);
            let data_ptr = read_u32(record, 2 * ip_len + 2);
            return Ok(Some((data_len, data_ptr)));
        }
    }
    Ok(None)
}

/// Fetch and decode a region payload through `reader`.
fn read_region(reader: &FileReader, data_len: u16, data_ptr: u32) -> Result<String> {
    if data_len == 0 {
        return Ok(String::new());
    }
    let len = data_len as usize;
    if len <= STACK_BUF_LEN {
        let mut buf = [0u8; STACK_BUF_LEN];
        reader.read_into(data_ptr as u64, &mut buf[..len])?;
        decode_region(&buf[..len], data_ptr)
    } else {
        REGION_BUF.with(|cell| {
            let mut buf = cell.borrow_mut();
            buf.resize(len, 0);
            reader.read_into(data_ptr as u64, &mut buf)?;
            decode_region(&buf, data_ptr)
        })
    }
}

/// Decode payload bytes as UTF-8; anything else is data corruption.
fn decode_region(raw: &[u8], offset: u32) -> Result<String> {
    match std::str::from_utf8(raw) {
        Ok(s) => Ok(s.to_owned()),
        Err(_) => Err(Error::InvalidRegionData { offset }),
    }
}

/// Strategy reading everything from the file on every query.
///
/// Holds only the positional reader; memory footprint is O(1).
#[derive(Debug)]
pub struct FileCache {
    reader: FileReader,
}

impl FileCache {
    /// Open `path` without preloading anything.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: FileReader::open(path)?,
        })
    }

    /// Look up the region for a network-order address.
    pub fn search(&self, ip: &[u8]) -> Result<String> {
        self.reader.reset_io_count();
        let slot = vector_slot(ip);
        let mut slot_buf = [0u8; VECTOR_SLOT_LEN];
        self.reader.read_into(vector_slot_offset(slot), &mut slot_buf)?;
        let s_ptr = read_u32(&slot_buf, 0);
        let e_ptr = read_u32(&slot_buf, 4);
        check_slot(slot, s_ptr, e_ptr)?;
        match search_segments(&self.reader, ip, s_ptr, e_ptr)? {
            Some((data_len, data_ptr)) => read_region(&self.reader, data_len, data_ptr),
            None => Ok(String::new()),
        }
    }

    /// Decode the file header.
    pub fn read_header(&self) -> Result<Header> {
        let mut buf = [0u8; HEADER_LEN];
        self.reader.read_into(0, &mut buf)?;
        Header::decode(&buf)
    }

    /// Physical reads issued by the most recent search.
    pub fn io_count(&self) -> usize {
        self.reader.io_count()
    }

    /// Release the file handle. Idempotent.
    pub fn close(&self) {
        self.reader.close();
    }
}

/// Strategy with the vector index preloaded.
///
/// The 8-byte vector slot lookup is served from memory; segment records
/// and region payloads still go through the positional reader.
#[derive(Debug)]
pub struct VectorCache {
    reader: FileReader,
    vector: VectorTable,
}

impl VectorCache {
    /// Open `path` and preload the vector index with one bulk read.
    pub fn open(path: &Path) -> Result<Self> {
        let file_len = std::fs::metadata(path)?.len() as usize;
        if file_len < MIN_FILE_LEN {
            return Err(Error::Truncated {
                expected: MIN_FILE_LEN,
                actual: file_len,
            });
        }
        let reader = FileReader::open(path)?;
        let mut raw = vec![0u8; VECTOR_INDEX_LEN];
        reader.read_into(HEADER_LEN as u64, &mut raw)?;
        reader.reset_io_count();
        log::debug!("preloaded vector index from {}", path.display());
        Ok(Self {
            reader,
            vector: VectorTable::decode(&raw),
        })
    }

    /// Look up the region for a network-order address.
    pub fn search(&self, ip: &[u8]) -> Result<String> {
        self.reader.reset_io_count();
        let slot = vector_slot(ip);
        let (s_ptr, e_ptr) = self.vector.get(slot);
        check_slot(slot, s_ptr, e_ptr)?;
        match search_segments(&self.reader, ip, s_ptr, e_ptr)? {
            Some((data_len, data_ptr)) => read_region(&self.reader, data_len, data_ptr),
            None => Ok(String::new()),
        }
    }

    /// Decode the file header.
    pub fn read_header(&self) -> Result<Header> {
        let mut buf = [0u8; HEADER_LEN];
        self.reader.read_into(0, &mut buf)?;
        Header::decode(&buf)
    }

    /// Physical reads issued by the most recent search.
    pub fn io_count(&self) -> usize {
        self.reader.io_count()
    }

    /// Release the file handle. Idempotent.
    pub fn close(&self) {
        self.reader.close();
    }
}

/// Strategy with the whole file preloaded.
///
/// Queries are pure memory work: the vector lookup hits the decoded
/// arrays, segment records and payloads are slices of the preloaded
/// image. The I/O count is always zero.
#[derive(Debug)]
pub struct ContentCache {
    reader: ContentReader,
    vector: VectorTable,
}

impl ContentCache {
    /// Load the whole file at `path` and decode its vector index.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_reader(ContentReader::load(path)?)
    }

    /// Build from an already loaded xdb image.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_reader(ContentReader::from_bytes(data))
    }

    fn from_reader(reader: ContentReader) -> Result<Self> {
        if reader.len() < MIN_FILE_LEN {
            return Err(Error::Truncated {
                expected: MIN_FILE_LEN,
                actual: reader.len(),
            });
        }
        let vector = VectorTable::decode(reader.slice(HEADER_LEN, VECTOR_INDEX_LEN)?);
        Ok(Self { reader, vector })
    }

    /// Look up the region for a network-order address.
    pub fn search(&self, ip: &[u8]) -> Result<String> {
        let slot = vector_slot(ip);
        let (s_ptr, e_ptr) = self.vector.get(slot);
        check_slot(slot, s_ptr, e_ptr)?;

        let ip_len = ip.len();
        let record_len = segment_record_len(ip_len);
        let mut low: i64 = 0;
        let mut high = (e_ptr - s_ptr) as i64 / record_len as i64 - 1;
        while low <= high {
            let mid = (low + high) >> 1;
            let offset = s_ptr as usize + mid as usize * record_len;
            let record = self.reader.slice(offset, record_len)?;
            if compare_ip(ip, &record[..ip_len]) == Ordering::Less {
                high = mid - 1;
            } else if compare_ip(ip, &record[ip_len..2 * ip_len]) == Ordering::Greater {
                low = mid + 1;
            } else {
                let data_len = read_u16(record, 2 * ip_len);
                let data_ptr = read_u32(record, 2 * ip_len + 2);
                if data_len == 0 {
                    return Ok(String::new());
                }
                let raw = self.reader.slice(data_ptr as usize, data_len as usize)?;
                return decode_region(raw, data_ptr);
            }
        }
        Ok(String::new())
    }

    /// Decode the file header.
    pub fn read_header(&self) -> Result<Header> {
        Header::decode(self.reader.slice(0, HEADER_LEN)?)
    }

    /// Always zero: queries never touch the backing store.
    pub fn io_count(&self) -> usize {
        0
    }

    /// No-op: there is no file handle to release. The preloaded image is
    /// freed when the strategy is dropped.
    pub fn close(&self) {}
}

//! Byte readers over the xdb payload.
//!
//! Both readers satisfy the same contract: fill a destination buffer with
//! exactly the requested bytes at an absolute offset, or fail. They differ
//! in where the bytes live and in what a read costs.

use parking_lot::RwLock;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{Error, Result};

/// Reader over a fully preloaded xdb image.
///
/// The whole file is held as one immutable byte region; reads are bounded
/// slice views and never touch the backing store, so the I/O count of any
/// query through this reader is zero.
#[derive(Debug)]
pub struct ContentReader {
    data: Vec<u8>,
}

impl ContentReader {
    /// Load the whole file at `path` into memory.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        log::debug!("preloaded {} bytes from {}", data.len(), path.display());
        Ok(Self { data })
    }

    /// Wrap an already loaded xdb image.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Borrow `len` bytes at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = offset.checked_add(len).unwrap_or(usize::MAX);
        if end > self.data.len() {
            return Err(Error::Truncated {
                expected: end,
                actual: self.data.len(),
            });
        }
        Ok(&self.data[offset..end])
    }

    /// Length of the underlying image.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Positional reader over an xdb file on disk.
///
/// Reads use `pread`-style positional primitives, so concurrent queries
/// never race on a shared file cursor and need no external locking. Each
/// physical read increments the I/O counter by one; the counter is reset
/// at the top of every search, which makes it a per-query metric only for
/// serial use.
#[derive(Debug)]
pub struct FileReader {
    file: RwLock<Option<File>>,
    io_count: AtomicUsize,
}

impl FileReader {
    /// Open `path` for shared random-access reads.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            file: RwLock::new(Some(file)),
            io_count: AtomicUsize::new(0),
        })
    }

    /// Fill `buf` with bytes starting at `offset`.
    ///
    /// Loops on short reads until `buf` is full; hitting EOF first is an
    /// IO error. Fails with [`Error::Closed`] after [`FileReader::close`].
    pub fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let guard = self.file.read();
        let file = guard.as_ref().ok_or(Error::Closed)?;
        let mut filled = 0;
        while filled < buf.len() {
            self.io_count.fetch_add(1, Ordering::Relaxed);
            let n = read_at(file, &mut buf[filled..], offset + filled as u64)?;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("short read of {} bytes at offset {}", buf.len(), offset),
                )));
            }
            filled += n;
        }
        Ok(())
    }

    /// Physical reads issued since the last reset.
    pub fn io_count(&self) -> usize {
        self.io_count.load(Ordering::Relaxed)
    }

    /// Reset the per-query I/O counter.
    pub fn reset_io_count(&self) {
        self.io_count.store(0, Ordering::Relaxed);
    }

    /// Release the file handle.
    ///
    /// Idempotent: the handle is closed exactly once behind a single write
    /// guard, and later calls are no-ops. Reads issued after the first
    /// close fail with [`Error::Closed`].
    pub fn close(&self) {
        if self.file.write().take().is_some() {
            log::debug!("released xdb file handle");
        }
    }
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}

//! Public query façade over the xdb cache strategies.

use std::fmt;
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;

use crate::xdb::cache::{ContentCache, FileCache, VectorCache};
use crate::xdb::format::{Header, IPV4_LEN, IPV6_LEN};
use crate::{Error, Result};

/// Cache policy selecting how much of the xdb file is preloaded.
///
/// The set is closed and the choice is fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CachePolicy {
    /// No preloading; each query reads the vector slot, the segment
    /// records, and the region payload from the file.
    File,
    /// Preload the 524 KiB vector index; segment and payload reads still
    /// hit the file.
    #[default]
    VectorIndex,
    /// Preload the whole file; queries never touch the backing store.
    Content,
}

impl CachePolicy {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CachePolicy::File => "file",
            CachePolicy::VectorIndex => "vector-index",
            CachePolicy::Content => "content",
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CachePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(CachePolicy::File),
            "vector-index" | "vector_index" | "vectorindex" | "vector" => {
                Ok(CachePolicy::VectorIndex)
            }
            "content" => Ok(CachePolicy::Content),
            _ => Err(Error::InvalidCachePolicy(s.to_string())),
        }
    }
}

/// The chosen strategy, resolved once at construction.
#[derive(Debug)]
enum SearchCache {
    File(FileCache),
    Vector(VectorCache),
    Content(ContentCache),
}

/// Offline IP-to-region searcher over a single xdb file.
///
/// After construction a searcher holds only read-only state and may be
/// shared across threads; see [`Searcher::io_count`] for the counter's
/// semantics under concurrent queries.
///
/// # Example
///
/// ```ignore
/// use ipregion::{CachePolicy, Searcher};
///
/// let searcher = Searcher::new(CachePolicy::VectorIndex, "ip2region.xdb")?;
/// assert_eq!(searcher.search("1.2.3.4")?, "CN|0|Shanghai|Shanghai|Telecom");
/// ```
#[derive(Debug)]
pub struct Searcher {
    cache: SearchCache,
}

impl Searcher {
    /// Open `path` with the given cache policy.
    ///
    /// Fails if the file is missing or unreadable, and for the preloading
    /// policies if it is shorter than the header plus the vector index.
    pub fn new(policy: CachePolicy, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let cache = match policy {
            CachePolicy::File => SearchCache::File(FileCache::open(path)?),
            CachePolicy::VectorIndex => SearchCache::Vector(VectorCache::open(path)?),
            CachePolicy::Content => SearchCache::Content(ContentCache::open(path)?),
        };
        Ok(Self { cache })
    }

    /// Build a Content-policy searcher from an already loaded xdb image.
    pub fn from_content(data: Vec<u8>) -> Result<Self> {
        Ok(Self {
            cache: SearchCache::Content(ContentCache::from_bytes(data)?),
        })
    }

    /// Look up the region for a textual IPv4 or IPv6 address.
    pub fn search(&self, addr: &str) -> Result<String> {
        let ip: IpAddr = addr
            .parse()
            .map_err(|_| Error::InvalidIpAddress(addr.to_string()))?;
        self.search_ip(ip)
    }

    /// Look up the region for a parsed address.
    pub fn search_ip(&self, ip: IpAddr) -> Result<String> {
        match ip {
            IpAddr::V4(v4) => self.search_bytes(&v4.octets()),
            IpAddr::V6(v6) => self.search_bytes(&v6.octets()),
        }
    }

    /// Look up the region for a raw network-order address.
    ///
    /// `ip` must be 4 bytes (IPv4) or 16 bytes (IPv6), and the file must
    /// serve that family. Returns the empty string when no range contains
    /// the address, which distinguishes "unknown IP" from a failed lookup.
    pub fn search_bytes(&self, ip: &[u8]) -> Result<String> {
        if ip.len() != IPV4_LEN && ip.len() != IPV6_LEN {
            return Err(Error::InvalidIpLength(ip.len()));
        }
        match &self.cache {
            SearchCache::File(cache) => cache.search(ip),
            SearchCache::Vector(cache) => cache.search(ip),
            SearchCache::Content(cache) => cache.search(ip),
        }
    }

    /// Decode the file header.
    ///
    /// On the file-backed policies this issues physical reads; the I/O
    /// counter is reset again by the next search.
    pub fn header(&self) -> Result<Header> {
        match &self.cache {
            SearchCache::File(cache) => cache.read_header(),
            SearchCache::Vector(cache) => cache.read_header(),
            SearchCache::Content(cache) => cache.read_header(),
        }
    }

    /// Physical reads issued by the most recent search.
    ///
    /// The counter is reset at the start of every search, so under
    /// concurrent queries it reports an interleaved total rather than any
    /// single query's cost. Always zero for [`CachePolicy::Content`].
    pub fn io_count(&self) -> usize {
        match &self.cache {
            SearchCache::File(cache) => cache.io_count(),
            SearchCache::Vector(cache) => cache.io_count(),
            SearchCache::Content(cache) => cache.io_count(),
        }
    }

    /// Release the underlying file handle.
    ///
    /// Idempotent. Searches on the file-backed policies fail with
    /// [`Error::Closed`] afterwards; the Content policy holds no handle
    /// and keeps serving until the searcher is dropped.
    pub fn close(&self) {
        match &self.cache {
            SearchCache::File(cache) => cache.close(),
            SearchCache::Vector(cache) => cache.close(),
            SearchCache::Content(cache) => cache.close(),
        }
    }

    /// The policy this searcher was constructed with.
    pub fn policy(&self) -> CachePolicy {
        match &self.cache {
            SearchCache::File(_) => CachePolicy::File,
            SearchCache::Vector(_) => CachePolicy::VectorIndex,
            SearchCache::Content(_) => CachePolicy::Content,
        }
    }
}

//! Error types for ipregion.

use thiserror::Error;

/// Error type for xdb open and search operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File or buffer too short for the requested structure
    #[error("xdb image too short: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Query byte length other than 4 or 16
    #[error("invalid IP byte length: {0} (expected 4 or 16)")]
    InvalidIpLength(usize),

    /// Unparseable textual address
    #[error("invalid IP address: {0}")]
    InvalidIpAddress(String),

    /// Unknown cache policy name
    #[error("invalid cache policy: {0}")]
    InvalidCachePolicy(String),

    /// Rejected record range during image generation
    #[error("invalid region range: {0}")]
    InvalidRange(String),

    /// Vector slot whose end pointer precedes its start pointer
    #[error("corrupt vector slot {slot}: end pointer {end} precedes start pointer {start}")]
    CorruptVectorSlot { slot: usize, start: u32, end: u32 },

    /// Region payload bytes are not valid UTF-8
    #[error("region payload at offset {offset} is not valid UTF-8")]
    InvalidRegionData { offset: u32 },

    /// Reader used after its file handle was released
    #[error("xdb reader is closed")]
    Closed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ipregion operations.
pub type Result<T> = std::result::Result<T, Error>;

//! The xdb binary index format: layout, readers, and cache strategies.
//!
//! An xdb file is a single immutable image laid out for two-level lookup:
//! the first two bytes of an address select a vector index slot, and the
//! slot points at a sorted fixed-stride segment array to binary-search.
//!
//! # File Structure
//!
//! ```text
//! +--------------------+
//! |       HEADER       |  256 bytes (fixed)
//! +--------------------+
//! |    VECTOR INDEX    |  256 x 256 x 8 bytes (fixed)
//! +--------------------+
//! |   SEGMENT INDEX    |  variable, sorted fixed-stride records
//! |   + REGION POOL    |  variable, UTF-8 payloads
//! +--------------------+
//! ```

pub mod cache;
pub mod format;
pub mod reader;
pub mod writer;


pub use cache::{ContentCache, FileCache, VectorCache};
pub use format::Header;
pub use reader::{ContentReader, FileReader};
pub use writer::XdbWriter;

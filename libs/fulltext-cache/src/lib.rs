//! Content-addressed cache for extracted fulltext
//!
//! Extraction is expensive and runs against a remote engine, so its result is
//! stored on disk keyed by the MD5 and SHA-256 digests of the source file.
//! Existence of the entry file is the index; there is no separate manifest.

mod cache;
pub mod error;

pub use cache::{FulltextCache, MAX_READ_BYTES};
pub use error::{FulltextError, Result};

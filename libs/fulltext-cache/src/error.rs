//! Error types for the fulltext cache

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FulltextError>;

#[derive(Debug, Error)]
pub enum FulltextError {
    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FulltextError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FulltextError::Storage {
            path: path.into(),
            source,
        }
    }
}

//! Error types for index maintenance

use scriptorium_config::ConfigError;
use scriptorium_fulltext::FulltextError;
use scriptorium_query::QueryError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Search service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Index integrity violation: document {id} is indexed {count} times")]
    IntegrityViolation { id: u64, count: usize },

    #[error("Extraction of {path} not supported for MIME type '{mime_type}'")]
    ExtractionUnsupported { path: PathBuf, mime_type: String },

    #[error("Storage error: {0}")]
    Storage(#[from] FulltextError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine error (status {status}): {message}")]
    Engine { status: u16, message: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document not found: {0}")]
    DocumentNotFound(u64),

    #[error("Job queue error: {0}")]
    Queue(String),

    #[error("Failed to {operation}")]
    Batch {
        operation: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Map a non-success engine status to the error taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 | 500..=599 => Error::ServiceUnavailable(format!("status {}: {}", status, message)),
            400 => Error::InvalidQuery(message),
            _ => Error::Engine { status, message },
        }
    }

    pub(crate) fn batch(operation: &'static str, source: Error) -> Self {
        Error::Batch {
            operation,
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through batch wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Batch { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_service_unavailable(&self) -> bool {
        matches!(self.root(), Error::ServiceUnavailable(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.root(), Error::Configuration(_))
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidQuery(message) => Error::InvalidQuery(message),
            QueryError::MalformedResponse(message) => Error::Engine {
                status: 200,
                message,
            },
            QueryError::Json(e) => Error::Json(e),
        }
    }
}

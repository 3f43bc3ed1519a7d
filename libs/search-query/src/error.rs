//! Error types for query building and result parsing

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Malformed engine response: {0}")]
    MalformedResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        QueryError::InvalidQuery(message.into())
    }
}

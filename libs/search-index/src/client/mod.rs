//! Engine client abstraction
//!
//! The adapter talks to the search engine exclusively through
//! [`EngineClient::execute`], so tests can substitute an in-memory engine.

mod http;

pub use http::HttpEngineClient;

use crate::models::EngineDocument;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineRequest {
    /// Add or replace documents (uncommitted).
    Update { documents: Vec<EngineDocument> },
    DeleteById { ids: Vec<u64> },
    DeleteByQuery { query: String },
    Commit,
    Rollback,
    /// Search with raw engine parameters; repeated keys are allowed.
    Select { params: Vec<(String, String)> },
    /// Extract text from a file without indexing it.
    Extract {
        file_name: String,
        content_type: String,
        body: Vec<u8>,
    },
}

impl EngineRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineRequest::Update { .. } => "update",
            EngineRequest::DeleteById { .. } => "delete_by_id",
            EngineRequest::DeleteByQuery { .. } => "delete_by_query",
            EngineRequest::Commit => "commit",
            EngineRequest::Rollback => "rollback",
            EngineRequest::Select { .. } => "select",
            EngineRequest::Extract { .. } => "extract",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineResponse {
    pub status: u16,
    pub body: Value,
}

impl EngineResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Check that the engine is reachable.
    async fn ping(&self) -> Result<()>;

    /// Execute one request. Non-success statuses map to
    /// [`Error::from_status`](crate::Error::from_status).
    async fn execute(&self, request: EngineRequest) -> Result<EngineResponse>;
}

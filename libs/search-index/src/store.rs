//! Authoritative document store

use crate::models::{Document, IdRange, ServerState};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Ids in ascending order, optionally restricted to one server state.
    async fn document_ids(&self, state: Option<ServerState>, range: IdRange) -> Result<Vec<u64>>;

    /// Fails with [`Error::DocumentNotFound`] for unknown ids.
    async fn document(&self, id: u64) -> Result<Document>;
}

/// Store backed by an in-memory map, loadable from a JSON snapshot
/// (an array of documents).
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: BTreeMap<u64, Document>,
}

impl MemoryDocumentStore {
    pub fn new(documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            documents: documents.into_iter().map(|d| (d.id, d)).collect(),
        }
    }

    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let documents: Vec<Document> = serde_json::from_slice(&bytes)?;
        tracing::info!(path = %path.display(), count = documents.len(), "Loaded document snapshot");
        Ok(Self::new(documents))
    }

    pub fn insert(&mut self, document: Document) {
        self.documents.insert(document.id, document);
    }

    pub fn remove(&mut self, id: u64) -> Option<Document> {
        self.documents.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn document_ids(&self, state: Option<ServerState>, range: IdRange) -> Result<Vec<u64>> {
        Ok(self
            .documents
            .values()
            .filter(|d| range.contains(d.id))
            .filter(|d| state.map_or(true, |s| d.server_state == s))
            .map(|d| d.id)
            .collect())
    }

    async fn document(&self, id: u64) -> Result<Document> {
        self.documents
            .get(&id)
            .cloned()
            .ok_or(Error::DocumentNotFound(id))
    }
}

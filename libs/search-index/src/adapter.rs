//! Chunked index maintenance
//!
//! Every write operation is sent as a sequence of chunk requests followed by
//! a single commit. If any request fails the pending transaction is rolled
//! back (unless disabled) and the error is returned wrapped in
//! [`Error::Batch`]. Callers must treat the whole operation as failed.

use crate::client::{EngineClient, EngineRequest};
use crate::models::Document;
use crate::serializer::{DocumentSerializer, FieldSerializer};
use crate::{Error, Result};
use async_trait::async_trait;
use scriptorium_config::{FacetPolicy, ServiceOptions};
use scriptorium_fulltext::FulltextCache;
use scriptorium_query::MATCH_ALL;
use std::sync::Arc;

pub const DEFAULT_INDEX_CHUNK_SIZE: usize = 16;
pub const DEFAULT_DELETE_CHUNK_SIZE: usize = 128;

/// MIME types sent to the extraction endpoint unless configured otherwise.
pub const DEFAULT_EXTRACT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/postscript",
    "application/xhtml+xml",
    "application/xml",
    "text/html",
    "text/plain",
    "application/msword",
    "application/rtf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.oasis.opendocument.text",
];

/// Write side of the index, as used by the dispatcher and reconciliation.
#[async_trait]
pub trait IndexWriter: Send + Sync {
    async fn add_documents(&self, documents: &[Document]) -> Result<()>;
    async fn remove_documents_by_id(&self, ids: &[u64]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterSettings {
    pub domain: String,
    pub index_chunk_size: usize,
    pub delete_chunk_size: usize,
    pub rollback_on_error: bool,
    pub extract_mime_types: Vec<String>,
    /// Facet set used for searches without an explicit one.
    pub facet_set: Option<String>,
}

impl AdapterSettings {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            index_chunk_size: DEFAULT_INDEX_CHUNK_SIZE,
            delete_chunk_size: DEFAULT_DELETE_CHUNK_SIZE,
            rollback_on_error: true,
            extract_mime_types: DEFAULT_EXTRACT_MIME_TYPES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            facet_set: None,
        }
    }

    /// Read `chunk_size`, `delete_chunk_size`, `rollback_on_error` and
    /// `facet_set` from the service options and `mime_types` from the
    /// extraction options.
    pub fn from_options(options: &ServiceOptions, extract: &ServiceOptions) -> Result<Self> {
        let mut settings = Self::new(options.domain());
        if let Some(size) = options.get_u64("chunk_size") {
            settings.index_chunk_size = positive(size, "chunk_size")?;
        }
        if let Some(size) = options.get_u64("delete_chunk_size") {
            settings.delete_chunk_size = positive(size, "delete_chunk_size")?;
        }
        if let Some(rollback) = options.get_bool("rollback_on_error") {
            settings.rollback_on_error = rollback;
        }
        settings.facet_set = options.get_str("facet_set").map(str::to_string);
        if let Some(types) = extract.get("mime_types").and_then(|v| v.as_array()) {
            settings.extract_mime_types = types
                .iter()
                .filter_map(|t| t.as_str())
                .map(|t| t.trim().to_ascii_lowercase())
                .collect();
        }
        Ok(settings)
    }

    pub fn supports_mime_type(&self, mime_type: &str) -> bool {
        let mime_type = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.extract_mime_types.iter().any(|m| *m == mime_type)
    }
}

fn positive(value: u64, option: &str) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            Error::Configuration(scriptorium_config::ConfigError::InvalidConfiguration(
                format!("{} must be a positive integer", option),
            ))
        })
}

pub struct IndexingAdapter {
    pub(crate) client: Arc<dyn EngineClient>,
    pub(crate) extract_client: Arc<dyn EngineClient>,
    pub(crate) serializer: Arc<dyn DocumentSerializer>,
    pub(crate) cache: FulltextCache,
    pub(crate) facets: Option<Arc<FacetPolicy>>,
    pub(crate) settings: AdapterSettings,
}

impl IndexingAdapter {
    pub fn new(client: Arc<dyn EngineClient>, cache: FulltextCache, settings: AdapterSettings) -> Self {
        Self {
            extract_client: client.clone(),
            client,
            serializer: Arc::new(FieldSerializer),
            cache,
            facets: None,
            settings,
        }
    }

    /// Use a separate engine endpoint for text extraction.
    pub fn with_extract_client(mut self, client: Arc<dyn EngineClient>) -> Self {
        self.extract_client = client;
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn DocumentSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Configured facet defaults for searches.
    pub fn with_facets(mut self, facets: Arc<FacetPolicy>) -> Self {
        self.facets = Some(facets);
        self
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    pub fn cache(&self) -> &FulltextCache {
        &self.cache
    }

    pub async fn ping(&self) -> Result<()> {
        self.client.ping().await
    }

    /// Index `documents`, silently skipping those that are not indexable.
    pub async fn add_documents_to_index(&self, documents: &[Document]) -> Result<()> {
        let eligible: Vec<&Document> = documents.iter().filter(|d| d.is_indexable()).collect();
        if eligible.is_empty() {
            tracing::debug!(requested = documents.len(), "No indexable documents in batch");
            return Ok(());
        }

        let result = self.send_updates(&eligible).await;
        self.finish("add documents to index", result).await?;
        tracing::info!(
            indexed = eligible.len(),
            skipped = documents.len() - eligible.len(),
            "Documents indexed"
        );
        Ok(())
    }

    pub async fn remove_documents_from_index(&self, documents: &[Document]) -> Result<()> {
        let ids: Vec<u64> = documents.iter().map(|d| d.id).collect();
        self.remove_documents_from_index_by_id(&ids).await
    }

    pub async fn remove_documents_from_index_by_id(&self, ids: &[u64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let result = self.send_deletes(ids).await;
        self.finish("remove documents from index", result).await?;
        tracing::info!(removed = ids.len(), "Documents removed from index");
        Ok(())
    }

    pub async fn remove_all_documents_from_index(&self) -> Result<()> {
        let result = async {
            self.client
                .execute(EngineRequest::DeleteByQuery {
                    query: MATCH_ALL.to_string(),
                })
                .await?;
            self.client.execute(EngineRequest::Commit).await?;
            Ok::<(), Error>(())
        }
        .await;
        self.finish("remove all documents from index", result).await?;
        tracing::info!("Index cleared");
        Ok(())
    }

    async fn send_updates(&self, documents: &[&Document]) -> Result<()> {
        let chunk_size = self.settings.index_chunk_size.max(1);
        for (number, chunk) in documents.chunks(chunk_size).enumerate() {
            let mut serialized = Vec::with_capacity(chunk.len());
            for document in chunk {
                serialized.push(self.serializer.to_engine_document(document, self).await?);
            }
            tracing::debug!(chunk = number + 1, size = chunk.len(), "Sending update chunk");
            self.client
                .execute(EngineRequest::Update {
                    documents: serialized,
                })
                .await?;
        }
        self.client.execute(EngineRequest::Commit).await?;
        Ok(())
    }

    async fn send_deletes(&self, ids: &[u64]) -> Result<()> {
        let chunk_size = self.settings.delete_chunk_size.max(1);
        for (number, chunk) in ids.chunks(chunk_size).enumerate() {
            tracing::debug!(chunk = number + 1, size = chunk.len(), "Sending delete chunk");
            self.client
                .execute(EngineRequest::DeleteById {
                    ids: chunk.to_vec(),
                })
                .await?;
        }
        self.client.execute(EngineRequest::Commit).await?;
        Ok(())
    }

    /// Roll back and wrap a failed batch.
    async fn finish(&self, operation: &'static str, result: Result<()>) -> Result<()> {
        let Err(error) = result else {
            return Ok(());
        };
        tracing::error!(operation, error = %error, "Index operation failed");

        if self.settings.rollback_on_error {
            match self.client.execute(EngineRequest::Rollback).await {
                Ok(_) => tracing::info!(operation, "Pending index changes rolled back"),
                Err(rollback_error) => tracing::warn!(
                    operation,
                    error = %rollback_error,
                    "Rollback after failed index operation failed"
                ),
            }
        }

        Err(Error::batch(operation, error))
    }
}

#[async_trait]
impl IndexWriter for IndexingAdapter {
    async fn add_documents(&self, documents: &[Document]) -> Result<()> {
        self.add_documents_to_index(documents).await
    }

    async fn remove_documents_by_id(&self, ids: &[u64]) -> Result<()> {
        self.remove_documents_from_index_by_id(ids).await
    }
}

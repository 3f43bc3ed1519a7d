//! Search index maintenance
//!
//! - [`IndexingAdapter`]: chunked add/remove with commit/rollback, fulltext
//!   extraction through the engine backed by the fulltext cache, and search
//! - [`ReconciliationEngine`]: detects and repairs drift between the document
//!   store and the index
//! - [`ServiceLocator`]: pooled adapters built from resolved configuration
//! - [`IndexDispatcher`]: synchronous or queued single-document updates
//!
//! The engine is reached only through [`EngineClient`]; [`HttpEngineClient`]
//! speaks the Solr JSON API.

pub mod adapter;
pub mod client;
pub mod dispatch;
pub mod error;
mod extract;
pub mod locator;
pub mod models;
pub mod queue;
pub mod reconcile;
pub mod search;
pub mod serializer;
pub mod store;

pub use adapter::{AdapterSettings, IndexWriter, IndexingAdapter};
pub use client::{EngineClient, EngineRequest, EngineResponse, HttpEngineClient};
pub use dispatch::{ExecutionMode, IndexDispatcher, ModeOverride};
pub use error::{Error, Result};
pub use locator::ServiceLocator;
pub use models::{Document, DocumentFile, EngineDocument, IdRange, ServerState};
pub use queue::{IndexJob, IndexTask, InlineJobQueue, JobQueue, MemoryJobQueue};
pub use reconcile::{ReconciliationEngine, ReconciliationReport};
pub use search::{select_params, IndexReader};
pub use serializer::{DocumentSerializer, FieldSerializer, FulltextExtractor};
pub use store::{DocumentStore, MemoryDocumentStore};

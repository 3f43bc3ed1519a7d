use super::MemoryEngine;
use chrono::{DateTime, TimeZone, Utc};
use scriptorium_fulltext::FulltextCache;
use scriptorium_index::{
    AdapterSettings, Document, DocumentFile, IndexDispatcher, IndexingAdapter, MemoryDocumentStore,
    ServerState,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const T1: i64 = 1_700_000_000;
pub const T2: i64 = 1_700_086_400;

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap()
}

pub fn published(id: u64, seconds: i64) -> Document {
    Document::new(id, ServerState::Published, at(seconds))
}

pub fn with_state(id: u64, state: ServerState, seconds: i64) -> Document {
    Document::new(id, state, at(seconds))
}

/// Write `contents` under `dir` and describe it as a document file.
pub fn file(dir: &Path, name: &str, mime_type: &str, contents: &[u8]) -> DocumentFile {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    DocumentFile {
        id: 1,
        path,
        mime_type: mime_type.to_string(),
        visible: true,
    }
}

/// Adapter wired to an in-memory engine and a fulltext cache in a fresh workspace.
pub struct Harness {
    pub engine: Arc<MemoryEngine>,
    pub adapter: Arc<IndexingAdapter>,
    pub workspace: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    pub fn with_settings(configure: impl FnOnce(&mut AdapterSettings)) -> Self {
        let workspace = TempDir::new().unwrap();
        let engine = Arc::new(MemoryEngine::new());
        let mut settings = AdapterSettings::new("solr");
        configure(&mut settings);
        let adapter = IndexingAdapter::new(
            engine.clone(),
            FulltextCache::in_workspace(workspace.path()),
            settings,
        );
        Self {
            engine,
            adapter: Arc::new(adapter),
            workspace,
        }
    }

    pub fn files_dir(&self) -> std::path::PathBuf {
        let dir = self.workspace.path().join("files");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn dispatcher(&self) -> Arc<IndexDispatcher> {
        Arc::new(IndexDispatcher::synchronous(self.adapter.clone()))
    }
}

pub fn store(documents: impl IntoIterator<Item = Document>) -> Arc<MemoryDocumentStore> {
    Arc::new(MemoryDocumentStore::new(documents))
}

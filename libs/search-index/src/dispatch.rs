//! Synchronous or queued execution of single-document index updates

use crate::adapter::IndexWriter;
use crate::models::Document;
use crate::queue::{IndexJob, IndexTask, JobQueue};
use crate::Result;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Call the index writer directly.
    #[default]
    Synchronous,
    /// Enqueue a job and return.
    Asynchronous,
}

pub struct IndexDispatcher {
    writer: Arc<dyn IndexWriter>,
    queue: Option<Arc<dyn JobQueue>>,
    mode: RwLock<ExecutionMode>,
}

impl IndexDispatcher {
    pub fn synchronous(writer: Arc<dyn IndexWriter>) -> Self {
        Self {
            writer,
            queue: None,
            mode: RwLock::new(ExecutionMode::Synchronous),
        }
    }

    pub fn with_queue(writer: Arc<dyn IndexWriter>, queue: Arc<dyn JobQueue>, mode: ExecutionMode) -> Self {
        Self {
            writer,
            queue: Some(queue),
            mode: RwLock::new(mode),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        *self.mode.read().unwrap()
    }

    pub fn set_mode(&self, mode: ExecutionMode) {
        *self.mode.write().unwrap() = mode;
    }

    /// Run synchronously until the returned guard is dropped.
    pub fn force_synchronous(&self) -> ModeOverride<'_> {
        let previous = std::mem::replace(&mut *self.mode.write().unwrap(), ExecutionMode::Synchronous);
        tracing::debug!(?previous, "Forcing synchronous index updates");
        ModeOverride {
            dispatcher: self,
            previous,
        }
    }

    pub async fn index_document(&self, document: &Document) -> Result<()> {
        match self.queue_for_mode() {
            Some(queue) => queue.enqueue(IndexJob::new(document.id, IndexTask::Index)).await,
            None => self.writer.add_documents(std::slice::from_ref(document)).await,
        }
    }

    pub async fn remove_document(&self, id: u64) -> Result<()> {
        match self.queue_for_mode() {
            Some(queue) => queue.enqueue(IndexJob::new(id, IndexTask::Remove)).await,
            None => self.writer.remove_documents_by_id(&[id]).await,
        }
    }

    fn queue_for_mode(&self) -> Option<&Arc<dyn JobQueue>> {
        match self.mode() {
            ExecutionMode::Asynchronous => self.queue.as_ref(),
            ExecutionMode::Synchronous => None,
        }
    }
}

/// Restores the previous execution mode when dropped.
#[must_use = "the override ends when the guard is dropped"]
pub struct ModeOverride<'a> {
    dispatcher: &'a IndexDispatcher,
    previous: ExecutionMode,
}

impl Drop for ModeOverride<'_> {
    fn drop(&mut self) {
        self.dispatcher.set_mode(self.previous);
        tracing::debug!(restored = ?self.previous, "Index update mode restored");
    }
}

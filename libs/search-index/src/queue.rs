//! Deferred index jobs

use crate::adapter::IndexWriter;
use crate::store::DocumentStore;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexTask {
    Index,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexJob {
    pub id: Uuid,
    pub document_id: u64,
    pub task: IndexTask,
}

impl IndexJob {
    pub fn new(document_id: u64, task: IndexTask) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            task,
        }
    }
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: IndexJob) -> Result<()>;
}

/// Queue that runs each job as soon as it is enqueued.
pub struct InlineJobQueue {
    store: Arc<dyn DocumentStore>,
    writer: Arc<dyn IndexWriter>,
}

impl InlineJobQueue {
    pub fn new(store: Arc<dyn DocumentStore>, writer: Arc<dyn IndexWriter>) -> Self {
        Self { store, writer }
    }
}

#[async_trait]
impl JobQueue for InlineJobQueue {
    async fn enqueue(&self, job: IndexJob) -> Result<()> {
        tracing::debug!(job_id = %job.id, document_id = job.document_id, task = ?job.task, "Running index job inline");
        match job.task {
            IndexTask::Index => {
                let document = self.store.document(job.document_id).await?;
                self.writer.add_documents(std::slice::from_ref(&document)).await
            }
            IndexTask::Remove => self.writer.remove_documents_by_id(&[job.document_id]).await,
        }
    }
}

/// Queue that only collects jobs, for a worker to drain later.
#[derive(Debug, Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<Vec<IndexJob>>,
    capacity: Option<usize>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            capacity: Some(capacity),
        }
    }

    pub fn drain(&self) -> Vec<IndexJob> {
        std::mem::take(&mut *self.jobs.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: IndexJob) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(capacity) = self.capacity {
            if jobs.len() >= capacity {
                return Err(Error::Queue(format!(
                    "queue full ({} jobs), rejected job for document {}",
                    capacity, job.document_id
                )));
            }
        }
        jobs.push(job);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_serializes_with_lowercase_task() {
        let job = IndexJob::new(7, IndexTask::Remove);
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["document_id"], 7);
        assert_eq!(value["task"], "remove");
    }

    #[tokio::test]
    async fn memory_queue_collects_and_drains() {
        let queue = MemoryJobQueue::with_capacity_limit(1);
        queue.enqueue(IndexJob::new(1, IndexTask::Index)).await.unwrap();
        assert!(queue.enqueue(IndexJob::new(2, IndexTask::Index)).await.is_err());

        let jobs = queue.drain();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].document_id, 1);
        assert!(queue.is_empty());
    }
}

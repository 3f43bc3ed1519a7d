//! Consistency check between the document store and the index
//!
//! The forward pass walks all published documents and reindexes those that
//! are missing from the index or indexed with a stale modification date. The
//! reverse pass walks all indexed ids and removes entries whose document is
//! gone or no longer published. The forward pass runs first so documents it
//! just reindexed are seen as current by the reverse pass.

use crate::dispatch::IndexDispatcher;
use crate::models::{Document, IdRange, ServerState};
use crate::search::IndexReader;
use crate::store::DocumentStore;
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Drift detected, including integrity violations.
    pub inconsistencies: usize,
    /// Documents reindexed.
    pub updates: usize,
    /// Index entries removed.
    pub deletions: usize,
    /// Documents indexed more than once (not repaired).
    pub integrity_violations: usize,
    /// Lookups that failed before a document could be checked.
    pub errors: usize,
}

impl ReconciliationReport {
    pub fn resolved(&self) -> usize {
        self.updates + self.deletions
    }

    pub fn unresolved(&self) -> usize {
        self.inconsistencies.saturating_sub(self.resolved())
    }

    pub fn is_consistent(&self) -> bool {
        self.inconsistencies == 0 && self.errors == 0
    }
}

pub struct ReconciliationEngine {
    store: Arc<dyn DocumentStore>,
    reader: Arc<dyn IndexReader>,
    dispatcher: Arc<IndexDispatcher>,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        reader: Arc<dyn IndexReader>,
        dispatcher: Arc<IndexDispatcher>,
    ) -> Self {
        Self {
            store,
            reader,
            dispatcher,
        }
    }

    /// Run both passes. Individual repair failures are counted, never fatal;
    /// only failing to enumerate documents or index entries aborts the run.
    pub async fn run(&self) -> Result<ReconciliationReport> {
        let _sync = self.dispatcher.force_synchronous();
        let mut report = ReconciliationReport::default();

        tracing::info!("Consistency check started");
        self.forward_pass(&mut report).await?;
        self.reverse_pass(&mut report).await?;

        if report.is_consistent() {
            tracing::info!("Consistency check completed, no inconsistencies found");
        } else {
            tracing::info!(
                inconsistencies = report.inconsistencies,
                updates = report.updates,
                deletions = report.deletions,
                unresolved = report.unresolved(),
                integrity_violations = report.integrity_violations,
                errors = report.errors,
                "Consistency check completed"
            );
        }
        Ok(report)
    }

    async fn forward_pass(&self, report: &mut ReconciliationReport) -> Result<()> {
        let ids = self
            .store
            .document_ids(Some(ServerState::Published), IdRange::all())
            .await?;
        tracing::debug!(published = ids.len(), "Checking published documents");

        for id in ids {
            let document = match self.store.document(id).await {
                Ok(document) => document,
                Err(e) => {
                    tracing::error!(document_id = id, error = %e, "Cannot load document");
                    report.errors += 1;
                    continue;
                }
            };

            let matches = match self.reader.find_by_id(id).await {
                Ok(matches) => matches,
                Err(e) => {
                    tracing::error!(document_id = id, error = %e, "Index lookup failed");
                    report.errors += 1;
                    continue;
                }
            };

            match matches.len() {
                0 => {
                    tracing::warn!(document_id = id, "Published document missing from index");
                    report.inconsistencies += 1;
                    self.reindex(&document, report).await;
                }
                1 => {
                    let indexed = matches[0].server_date_modified.map(|d| d.timestamp());
                    if indexed != Some(document.server_date_modified.timestamp()) {
                        tracing::warn!(
                            document_id = id,
                            indexed = ?indexed,
                            stored = document.server_date_modified.timestamp(),
                            "Index entry is stale"
                        );
                        report.inconsistencies += 1;
                        self.reindex(&document, report).await;
                    }
                }
                count => {
                    let violation = Error::IntegrityViolation { id, count };
                    tracing::error!(document_id = id, error = %violation, "Index integrity violated");
                    report.inconsistencies += 1;
                    report.integrity_violations += 1;
                }
            }
        }
        Ok(())
    }

    async fn reverse_pass(&self, report: &mut ReconciliationReport) -> Result<()> {
        let ids = self.reader.all_ids().await?;
        tracing::debug!(indexed = ids.len(), "Checking index entries");

        for id in ids {
            let reason = match self.store.document(id).await {
                Err(Error::DocumentNotFound(_)) => "document no longer exists",
                Ok(document) if document.server_state != ServerState::Published => {
                    "document is not published"
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!(document_id = id, error = %e, "Cannot load document");
                    report.errors += 1;
                    continue;
                }
            };

            tracing::warn!(document_id = id, reason, "Removing index entry");
            report.inconsistencies += 1;
            match self.dispatcher.remove_document(id).await {
                Ok(()) => report.deletions += 1,
                Err(e) => {
                    tracing::error!(document_id = id, error = %e, "Removing index entry failed")
                }
            }
        }
        Ok(())
    }

    async fn reindex(&self, document: &Document, report: &mut ReconciliationReport) {
        match self.dispatcher.index_document(document).await {
            Ok(()) => report.updates += 1,
            Err(e) => tracing::error!(document_id = document.id, error = %e, "Reindexing failed"),
        }
    }
}

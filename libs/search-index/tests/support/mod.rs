pub mod fixtures;

pub use fixtures::*;

use async_trait::async_trait;
use scriptorium_index::{EngineClient, EngineDocument, EngineRequest, EngineResponse, Error, Result};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// In-memory engine
// ---------------------------------------------------------------------------

enum PendingOp {
    Upsert(EngineDocument),
    Delete(u64),
    DeleteAll,
}

#[derive(Default)]
struct EngineState {
    committed: BTreeMap<u64, EngineDocument>,
    duplicates: Vec<EngineDocument>,
    pending: Vec<PendingOp>,
    requests: Vec<&'static str>,
    update_calls: usize,
    fail_on_update: Option<usize>,
    extract_calls: usize,
    extract_text: String,
    fail_extract: bool,
}

/// Engine double with transactional semantics: updates and deletes stay
/// pending until commit and are discarded on rollback.
#[derive(Default)]
pub struct MemoryEngine {
    state: Mutex<EngineState>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        let engine = Self::default();
        engine.state.lock().unwrap().extract_text = "extracted text".to_string();
        engine
    }

    /// Fail the `n`-th update request (1-based).
    pub fn fail_on_update(&self, n: usize) {
        self.state.lock().unwrap().fail_on_update = Some(n);
    }

    pub fn fail_extraction(&self, fail: bool) {
        self.state.lock().unwrap().fail_extract = fail;
    }

    pub fn set_extract_text(&self, text: &str) {
        self.state.lock().unwrap().extract_text = text.to_string();
    }

    /// Place a committed entry directly in the index.
    pub fn seed(&self, id: u64, server_date_modified: i64) {
        let doc = engine_doc(id, server_date_modified);
        self.state.lock().unwrap().committed.insert(id, doc);
    }

    /// Add a second index entry for an already indexed id.
    pub fn seed_duplicate(&self, id: u64, server_date_modified: i64) {
        let doc = engine_doc(id, server_date_modified);
        self.state.lock().unwrap().duplicates.push(doc);
    }

    pub fn requests(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.requests().iter().filter(|k| **k == kind).count()
    }

    pub fn extract_calls(&self) -> usize {
        self.state.lock().unwrap().extract_calls
    }

    pub fn committed_ids(&self) -> Vec<u64> {
        self.state.lock().unwrap().committed.keys().copied().collect()
    }

    pub fn committed(&self, id: u64) -> Option<EngineDocument> {
        self.state.lock().unwrap().committed.get(&id).cloned()
    }

    pub fn reset_requests(&self) {
        self.state.lock().unwrap().requests.clear();
    }
}

fn engine_doc(id: u64, server_date_modified: i64) -> EngineDocument {
    let mut doc = EngineDocument::new();
    doc.insert("id".into(), json!(id.to_string()));
    doc.insert("server_date_modified".into(), json!(server_date_modified));
    doc
}

fn doc_id(doc: &EngineDocument) -> u64 {
    doc.get("id")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

impl EngineState {
    fn select(&self, params: &[(String, String)]) -> Value {
        let q = param(params, "q").unwrap_or("*:*");
        let start: usize = param(params, "start").and_then(|s| s.parse().ok()).unwrap_or(0);
        let rows: usize = param(params, "rows").and_then(|s| s.parse().ok()).unwrap_or(10);

        let all = self.committed.values().chain(self.duplicates.iter());
        let mut hits: Vec<&EngineDocument> = match q.strip_prefix("id:") {
            Some(id) => {
                let id: u64 = id.parse().unwrap_or(u64::MAX);
                all.filter(|doc| doc_id(doc) == id).collect()
            }
            None => all.collect(),
        };
        hits.sort_by_key(|doc| doc_id(doc));

        let docs: Vec<Value> = hits
            .iter()
            .skip(start)
            .take(rows)
            .map(|doc| Value::Object((*doc).clone()))
            .collect();
        json!({
            "responseHeader": {"status": 0, "QTime": 1},
            "response": {"numFound": hits.len(), "start": start, "docs": docs}
        })
    }
}

#[async_trait]
impl EngineClient for MemoryEngine {
    async fn ping(&self) -> Result<()> {
        self.state.lock().unwrap().requests.push("ping");
        Ok(())
    }

    async fn execute(&self, request: EngineRequest) -> Result<EngineResponse> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.kind());
        let ok = || EngineResponse::ok(json!({"responseHeader": {"status": 0}}));

        match request {
            EngineRequest::Update { documents } => {
                state.update_calls += 1;
                if state.fail_on_update == Some(state.update_calls) {
                    return Err(Error::from_status(503, "engine overloaded"));
                }
                state
                    .pending
                    .extend(documents.into_iter().map(PendingOp::Upsert));
                Ok(ok())
            }
            EngineRequest::DeleteById { ids } => {
                state.pending.extend(ids.into_iter().map(PendingOp::Delete));
                Ok(ok())
            }
            EngineRequest::DeleteByQuery { query } => {
                assert_eq!(query, "*:*", "only match-all deletes are supported");
                state.pending.push(PendingOp::DeleteAll);
                Ok(ok())
            }
            EngineRequest::Commit => {
                let pending = std::mem::take(&mut state.pending);
                for op in pending {
                    match op {
                        PendingOp::Upsert(doc) => {
                            state.committed.insert(doc_id(&doc), doc);
                        }
                        PendingOp::Delete(id) => {
                            state.committed.remove(&id);
                            state.duplicates.retain(|d| doc_id(d) != id);
                        }
                        PendingOp::DeleteAll => {
                            state.committed.clear();
                            state.duplicates.clear();
                        }
                    }
                }
                Ok(ok())
            }
            EngineRequest::Rollback => {
                state.pending.clear();
                Ok(ok())
            }
            EngineRequest::Select { params } => Ok(EngineResponse::ok(state.select(&params))),
            EngineRequest::Extract { file_name, .. } => {
                state.extract_calls += 1;
                if state.fail_extract {
                    return Err(Error::from_status(500, "extraction failed"));
                }
                let mut body = serde_json::Map::new();
                body.insert("responseHeader".into(), json!({"status": 0}));
                body.insert(
                    file_name.clone(),
                    json!(format!(
                        "<html><head><title>t</title></head><body><p>{}</p></body></html>",
                        state.extract_text
                    )),
                );
                body.insert(format!("{}_metadata", file_name), json!([]));
                Ok(EngineResponse::ok(Value::Object(body)))
            }
        }
    }
}

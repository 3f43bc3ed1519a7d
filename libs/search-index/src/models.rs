//! Document domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Document as sent to the engine.
pub type EngineDocument = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    Published,
    Unpublished,
    Inprogress,
    Audited,
    Restricted,
    Deleted,
    Temporary,
}

impl ServerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Published => "published",
            ServerState::Unpublished => "unpublished",
            ServerState::Inprogress => "inprogress",
            ServerState::Audited => "audited",
            ServerState::Restricted => "restricted",
            ServerState::Deleted => "deleted",
            ServerState::Temporary => "temporary",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "published" => Ok(ServerState::Published),
            "unpublished" => Ok(ServerState::Unpublished),
            "inprogress" => Ok(ServerState::Inprogress),
            "audited" => Ok(ServerState::Audited),
            "restricted" => Ok(ServerState::Restricted),
            "deleted" => Ok(ServerState::Deleted),
            "temporary" => Ok(ServerState::Temporary),
            other => Err(format!("unknown server state '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFile {
    pub id: u64,
    pub path: PathBuf,
    pub mime_type: String,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
}

fn visible_by_default() -> bool {
    true
}

impl DocumentFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    pub server_state: ServerState,
    pub server_date_modified: DateTime<Utc>,
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    /// Additional metadata fields, indexed as-is.
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub files: Vec<DocumentFile>,
}

impl Document {
    pub fn new(id: u64, server_state: ServerState, server_date_modified: DateTime<Utc>) -> Self {
        Self {
            id,
            server_state,
            server_date_modified,
            doc_type: None,
            year: None,
            fields: Map::new(),
            files: Vec::new(),
        }
    }

    /// Temporary documents are still being created and never reach the index.
    pub fn is_indexable(&self) -> bool {
        self.server_state != ServerState::Temporary
    }
}

/// Inclusive id range with optional open ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl IdRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(start: Option<u64>, end: Option<u64>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.start.map_or(true, |start| id >= start) && self.end.map_or(true, |end| id <= end)
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<u64>| b.map_or_else(|| "-".to_string(), |v| v.to_string());
        write!(f, "{}..{}", bound(self.start), bound(self.end))
    }
}

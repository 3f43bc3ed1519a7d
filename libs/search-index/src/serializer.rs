//! Document → engine document conversion

use crate::models::{Document, DocumentFile, EngineDocument};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Source of extracted fulltext, implemented by the indexing adapter.
#[async_trait]
pub trait FulltextExtractor: Send + Sync {
    async fn extract_document_file(
        &self,
        file: &DocumentFile,
        document: Option<&Document>,
    ) -> Result<String>;
}

#[async_trait]
pub trait DocumentSerializer: Send + Sync {
    async fn to_engine_document(
        &self,
        document: &Document,
        extractor: &dyn FulltextExtractor,
    ) -> Result<EngineDocument>;
}

/// Maps core document attributes plus the extracted fulltext of every
/// visible file. Files whose extraction fails are recorded in
/// `fulltext_id_failure` and do not fail the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSerializer;

/// Core keys that free-form metadata fields cannot override.
const RESERVED_FIELDS: &[&str] = &[
    "id",
    "server_state",
    "server_date_modified",
    "doctype",
    "year",
    "fulltext",
    "fulltext_id_success",
    "fulltext_id_failure",
];

pub(crate) fn file_marker(file: &DocumentFile) -> String {
    format!("{}:{}", file.id, file.file_name())
}

#[async_trait]
impl DocumentSerializer for FieldSerializer {
    async fn to_engine_document(
        &self,
        document: &Document,
        extractor: &dyn FulltextExtractor,
    ) -> Result<EngineDocument> {
        let mut out = EngineDocument::new();
        out.insert("id".into(), Value::String(document.id.to_string()));
        out.insert(
            "server_state".into(),
            Value::String(document.server_state.to_string()),
        );
        out.insert(
            "server_date_modified".into(),
            Value::from(document.server_date_modified.timestamp()),
        );
        if let Some(doc_type) = &document.doc_type {
            out.insert("doctype".into(), Value::String(doc_type.clone()));
        }
        if let Some(year) = document.year {
            out.insert("year".into(), Value::from(year));
        }
        for (key, value) in &document.fields {
            if !RESERVED_FIELDS.contains(&key.as_str()) {
                out.insert(key.clone(), value.clone());
            }
        }

        let mut fulltext = Vec::new();
        let mut success = Vec::new();
        let mut failure = Vec::new();
        for file in document.files.iter().filter(|f| f.visible) {
            match extractor.extract_document_file(file, Some(document)).await {
                Ok(text) => {
                    if !text.is_empty() {
                        fulltext.push(Value::String(text));
                    }
                    success.push(Value::String(file_marker(file)));
                }
                Err(e) => {
                    tracing::warn!(
                        document_id = document.id,
                        file = %file.path.display(),
                        error = %e,
                        "Fulltext extraction failed"
                    );
                    failure.push(Value::String(file_marker(file)));
                }
            }
        }
        if !fulltext.is_empty() {
            out.insert("fulltext".into(), Value::Array(fulltext));
        }
        if !success.is_empty() {
            out.insert("fulltext_id_success".into(), Value::Array(success));
        }
        if !failure.is_empty() {
            out.insert("fulltext_id_failure".into(), Value::Array(failure));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServerState;
    use crate::Error;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::path::PathBuf;

    struct StubExtractor;

    #[async_trait]
    impl FulltextExtractor for StubExtractor {
        async fn extract_document_file(
            &self,
            file: &DocumentFile,
            _document: Option<&Document>,
        ) -> Result<String> {
            match file.mime_type.as_str() {
                "application/pdf" => Ok(format!("text of {}", file.file_name())),
                "text/plain" => Ok(String::new()),
                other => Err(Error::ExtractionUnsupported {
                    path: file.path.clone(),
                    mime_type: other.to_string(),
                }),
            }
        }
    }

    fn file(id: u64, name: &str, mime: &str, visible: bool) -> DocumentFile {
        DocumentFile {
            id,
            path: PathBuf::from(format!("/files/{}", name)),
            mime_type: mime.to_string(),
            visible,
        }
    }

    #[tokio::test]
    async fn serializes_core_fields_and_fulltext() {
        let mut doc = Document::new(
            42,
            ServerState::Published,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        );
        doc.doc_type = Some("article".into());
        doc.year = Some(2023);
        doc.fields.insert("title".into(), json!("On Indexing"));
        doc.fields.insert("id".into(), json!("spoofed"));
        doc.files = vec![
            file(1, "a.pdf", "application/pdf", true),
            file(2, "b.txt", "text/plain", true),
            file(3, "c.exe", "application/octet-stream", true),
            file(4, "hidden.pdf", "application/pdf", false),
        ];

        let out = FieldSerializer
            .to_engine_document(&doc, &StubExtractor)
            .await
            .unwrap();

        assert_eq!(out["id"], json!("42"));
        assert_eq!(out["server_state"], json!("published"));
        assert_eq!(out["server_date_modified"], json!(1_700_000_000));
        assert_eq!(out["doctype"], json!("article"));
        assert_eq!(out["year"], json!(2023));
        assert_eq!(out["title"], json!("On Indexing"));
        assert_eq!(out["fulltext"], json!(["text of a.pdf"]));
        assert_eq!(out["fulltext_id_success"], json!(["1:a.pdf", "2:b.txt"]));
        assert_eq!(out["fulltext_id_failure"], json!(["3:c.exe"]));
    }
}

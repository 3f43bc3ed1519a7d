//! Fulltext extraction through the engine, backed by the fulltext cache

use crate::adapter::IndexingAdapter;
use crate::client::EngineRequest;
use crate::models::{Document, DocumentFile};
use crate::serializer::FulltextExtractor;
use crate::{Error, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::Value;
use std::path::Path;

fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl IndexingAdapter {
    async fn extract_uncached(&self, file: &DocumentFile, document_id: Option<u64>) -> Result<String> {
        let body = tokio::fs::read(&file.path)
            .await
            .map_err(|e| io_error(&file.path, e))?;

        let response = self
            .extract_client
            .execute(EngineRequest::Extract {
                file_name: file.file_name(),
                content_type: file.mime_type.clone(),
                body,
            })
            .await?;

        let text = text_from_extract_response(&response.body);
        tracing::debug!(
            document_id,
            file = %file.path.display(),
            chars = text.len(),
            "Fulltext extracted"
        );
        Ok(text)
    }
}

#[async_trait]
impl FulltextExtractor for IndexingAdapter {
    /// Extract the text of `file`, consulting the cache first.
    ///
    /// The result is cached even when it is empty or extraction failed, so
    /// files the engine cannot handle are not resent on every indexing run.
    async fn extract_document_file(
        &self,
        file: &DocumentFile,
        document: Option<&Document>,
    ) -> Result<String> {
        let document_id = document.map(|d| d.id);
        let metadata = tokio::fs::metadata(&file.path)
            .await
            .map_err(|e| io_error(&file.path, e))?;
        if !metadata.is_file() {
            return Err(io_error(
                &file.path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        if !self.settings.supports_mime_type(&file.mime_type) {
            return Err(Error::ExtractionUnsupported {
                path: file.path.clone(),
                mime_type: file.mime_type.clone(),
            });
        }

        if let Some(text) = self.cache.read(&file.path) {
            return Ok(text);
        }

        if metadata.len() == 0 {
            self.cache.write(&file.path, "");
            return Ok(String::new());
        }

        match self.extract_uncached(file, document_id).await {
            Ok(text) => {
                self.cache.write(&file.path, &text);
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(
                    document_id,
                    file = %file.path.display(),
                    error = %e,
                    "Extraction failed, caching empty result"
                );
                self.cache.write(&file.path, "");
                Err(e)
            }
        }
    }
}

/// Pull the extracted text out of an extract-only response.
///
/// The payload is the first entry that is neither the response header nor a
/// `*_metadata` entry. XHTML payloads contribute the text of their `body`
/// (or the whole document when there is none).
pub(crate) fn text_from_extract_response(body: &Value) -> String {
    let payload = body
        .as_object()
        .into_iter()
        .flat_map(|map| map.iter())
        .filter(|(key, _)| key.as_str() != "responseHeader" && !key.ends_with("_metadata"))
        .find_map(|(_, value)| value.as_str());

    let Some(payload) = payload else {
        return String::new();
    };

    let text = if payload.trim_start().starts_with('<') {
        markup_text(payload)
    } else {
        payload.to_string()
    };
    sanitize(&text)
}

fn markup_text(markup: &str) -> String {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(false);

    let mut all = String::new();
    let mut body = String::new();
    let mut body_depth = 0usize;
    let mut seen_body = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"body" {
                    seen_body = true;
                    body_depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"body" {
                    body_depth = body_depth.saturating_sub(1);
                }
            }
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                if body_depth > 0 {
                    body.push_str(&text);
                }
                all.push_str(&text);
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                if body_depth > 0 {
                    body.push_str(&text);
                }
                all.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!(error = %e, "Malformed extraction markup, keeping text read so far");
                break;
            }
            _ => {}
        }
    }

    if seen_body {
        body
    } else {
        all
    }
}

/// Trim and drop control characters other than line breaks and tabs.
fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn takes_body_text_from_xhtml() {
        let body = json!({
            "responseHeader": {"status": 0, "QTime": 12},
            "article.pdf": "<?xml version=\"1.0\"?><html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>Meta</title></head><body><p>Hello &amp; welcome</p>\n<p>World</p></body></html>",
            "article.pdf_metadata": ["Content-Type", ["application/pdf"]]
        });
        assert_eq!(text_from_extract_response(&body), "Hello & welcome\nWorld");
    }

    #[test]
    fn markup_without_body_uses_all_text() {
        let body = json!({"doc": "<doc><title>T</title><p>text</p></doc>"});
        assert_eq!(text_from_extract_response(&body), "Ttext");
    }

    #[test]
    fn plain_payload_is_trimmed_and_sanitized() {
        let body = json!({"responseHeader": {}, "file.txt": "  plain\u{0007} text\n "});
        assert_eq!(text_from_extract_response(&body), "plain text");
    }

    #[test]
    fn missing_payload_is_empty() {
        let body = json!({"responseHeader": {}, "x_metadata": []});
        assert_eq!(text_from_extract_response(&body), "");
    }
}

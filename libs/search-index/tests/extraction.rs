#![allow(unused)]

#[allow(unused)]
mod support;

use scriptorium_index::{Error, FulltextExtractor};
use serde_json::json;
use support::*;

// ---------------------------------------------------------------------------
// Cache behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn extracted_text_is_cached() -> anyhow::Result<()> {
    let h = Harness::new();
    h.engine.set_extract_text("Hello  world");
    let pdf = file(&h.files_dir(), "a.pdf", "application/pdf", b"%PDF-1.4 body");

    let first = h.adapter.extract_document_file(&pdf, None).await?;
    let second = h.adapter.extract_document_file(&pdf, None).await?;

    assert_eq!(first, "Hello  world");
    assert_eq!(second, first);
    assert_eq!(h.engine.extract_calls(), 1);
    assert_eq!(h.adapter.cache().read(&pdf.path).as_deref(), Some("Hello  world"));
    Ok(())
}

#[tokio::test]
async fn changed_file_is_extracted_again() -> anyhow::Result<()> {
    let h = Harness::new();
    let pdf = file(&h.files_dir(), "a.pdf", "application/pdf", b"first version");
    h.adapter.extract_document_file(&pdf, None).await?;

    std::fs::write(&pdf.path, b"second version")?;
    h.engine.set_extract_text("updated");
    let text = h.adapter.extract_document_file(&pdf, None).await?;

    assert_eq!(text, "updated");
    assert_eq!(h.engine.extract_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_extraction_is_cached_as_empty() -> anyhow::Result<()> {
    let h = Harness::new();
    h.engine.fail_extraction(true);
    let pdf = file(&h.files_dir(), "broken.pdf", "application/pdf", b"garbage");

    let err = h.adapter.extract_document_file(&pdf, None).await.unwrap_err();
    assert!(err.is_service_unavailable());
    assert_eq!(h.adapter.cache().read(&pdf.path).as_deref(), Some(""));

    let retry = h.adapter.extract_document_file(&pdf, None).await?;
    assert_eq!(retry, "");
    assert_eq!(h.engine.extract_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn empty_file_is_not_sent() -> anyhow::Result<()> {
    let h = Harness::new();
    let empty = file(&h.files_dir(), "empty.txt", "text/plain", b"");

    let text = h.adapter.extract_document_file(&empty, None).await?;

    assert_eq!(text, "");
    assert_eq!(h.engine.extract_calls(), 0);
    assert_eq!(h.adapter.cache().read(&empty.path).as_deref(), Some(""));
    Ok(())
}

// ---------------------------------------------------------------------------
// Rejected files
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsupported_mime_type_is_rejected() -> anyhow::Result<()> {
    let h = Harness::new();
    let image = file(&h.files_dir(), "cover.png", "image/png", b"\x89PNG");

    let err = h.adapter.extract_document_file(&image, None).await.unwrap_err();

    assert!(matches!(err, Error::ExtractionUnsupported { ref mime_type, .. } if mime_type == "image/png"));
    assert_eq!(h.engine.extract_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_file_is_an_io_error() -> anyhow::Result<()> {
    let h = Harness::new();
    let mut missing = file(&h.files_dir(), "gone.pdf", "application/pdf", b"x");
    std::fs::remove_file(&missing.path)?;

    let err = h.adapter.extract_document_file(&missing, None).await.unwrap_err();
    assert!(matches!(err, Error::Io { ref path, .. } if *path == missing.path));

    missing.path = h.files_dir();
    let err = h.adapter.extract_document_file(&missing, None).await.unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    Ok(())
}

// ---------------------------------------------------------------------------
// Fulltext during indexing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn indexing_records_extraction_outcome_per_file() -> anyhow::Result<()> {
    let h = Harness::new();
    h.engine.set_extract_text("chapter one");
    let dir = h.files_dir();

    let mut doc = published(5, T1);
    let mut good = file(&dir, "text.pdf", "application/pdf", b"pdf");
    good.id = 11;
    let mut bad = file(&dir, "scan.tiff", "image/tiff", b"tiff");
    bad.id = 12;
    let mut hidden = file(&dir, "hidden.pdf", "application/pdf", b"pdf");
    hidden.id = 13;
    hidden.visible = false;
    doc.files = vec![good, bad, hidden];

    h.adapter.add_documents_to_index(&[doc]).await?;

    let indexed = h.engine.committed(5).expect("document committed");
    assert_eq!(indexed["fulltext"], json!(["chapter one"]));
    assert_eq!(indexed["fulltext_id_success"], json!(["11:text.pdf"]));
    assert_eq!(indexed["fulltext_id_failure"], json!(["12:scan.tiff"]));
    assert_eq!(h.engine.extract_calls(), 1);
    Ok(())
}

//! Integration tests for the filesystem object store.

use docchat_core::{Error, ObjectStore, PdfKind, PdfMetadata};
use docchat_store::FilesystemStore;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use tempfile::TempDir;

fn setup() -> (TempDir, FilesystemStore) {
    let dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(dir.path());
    (dir, store)
}

#[tokio::test]
async fn test_put_get_roundtrip() {
    let (_dir, store) = setup();

    let key = store
        .put("pdfs/report.pdf", b"%PDF-1.4 body", HashMap::new())
        .await
        .unwrap();
    assert_eq!(key, "pdfs/report.pdf");

    let bytes = store.get("pdfs/report.pdf").await.unwrap();
    assert_eq!(bytes, b"%PDF-1.4 body");
}

#[tokio::test]
async fn test_put_overwrites_existing_object() {
    let (_dir, store) = setup();
    store.put("pdfs/a.pdf", b"one", HashMap::new()).await.unwrap();
    store.put("pdfs/a.pdf", b"two", HashMap::new()).await.unwrap();
    assert_eq!(store.get("pdfs/a.pdf").await.unwrap(), b"two");
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let (_dir, store) = setup();
    let err = store.get("pdfs/missing.pdf").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_pdf_metadata_survives_storage() {
    let (_dir, store) = setup();
    let meta = PdfMetadata::new(
        Utc.with_ymd_and_hms(2025, 12, 9, 19, 54, 8).unwrap(),
        PdfKind::VectorContent,
        vec!["pdfs/b.pdf".to_string(), "pdfs/a.pdf".to_string()],
    );
    let key = "generated_pdfs/20251209_195408_topic_content.pdf";
    store
        .put(key, b"%PDF", meta.to_storage_map())
        .await
        .unwrap();

    let map = store.head_metadata(key).await.unwrap();
    let parsed = PdfMetadata::from_storage_map(&map).unwrap();
    assert_eq!(parsed, meta);
}

#[tokio::test]
async fn test_head_metadata_missing_object() {
    let (_dir, store) = setup();
    assert!(matches!(
        store.head_metadata("generated_pdfs/none.pdf").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_skips_sidecars_and_sorts_keys() {
    let (_dir, store) = setup();
    let mut meta = HashMap::new();
    meta.insert("type".to_string(), "history".to_string());

    store.put("pdfs/b.pdf", b"bb", HashMap::new()).await.unwrap();
    store.put("pdfs/a.pdf", b"a", HashMap::new()).await.unwrap();
    store
        .put("generated_pdfs/20250101_000000_x.pdf", b"xyz", meta)
        .await
        .unwrap();

    let objects = store.list().await.unwrap();
    let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "generated_pdfs/20250101_000000_x.pdf",
            "pdfs/a.pdf",
            "pdfs/b.pdf"
        ]
    );
    assert_eq!(objects[2].size, 2);
}

#[tokio::test]
async fn test_list_empty_when_base_missing() {
    let dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(dir.path().join("not-created"));
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_removes_object_and_metadata() {
    let (dir, store) = setup();
    let mut meta = HashMap::new();
    meta.insert("k".to_string(), "v".to_string());
    store.put("pdfs/a.pdf", b"a", meta).await.unwrap();

    store.delete("pdfs/a.pdf").await.unwrap();
    assert!(!dir.path().join("pdfs/a.pdf").exists());
    assert!(!dir.path().join("pdfs/a.pdf.meta.json").exists());

    // Deleting again is not an error
    store.delete("pdfs/a.pdf").await.unwrap();
}

#[tokio::test]
async fn test_put_rejects_traversal_key() {
    let (_dir, store) = setup();
    let err = store
        .put("../escape.pdf", b"x", HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_validate_probe() {
    let (dir, store) = setup();
    store.validate().await.unwrap();
    assert!(!dir.path().join(".health-check").exists());
    assert!(store.list().await.unwrap().is_empty());
}

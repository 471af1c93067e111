use std::fs;

use tempfile::TempDir;

use super::*;

fn write_page(dir: &Path, stem: &str, content: &str, meta: Option<&str>) {
    fs::write(dir.join(format!("{stem}.md")), content).expect("write markdown");
    if let Some(meta) = meta {
        fs::write(dir.join(format!("{stem}_meta.json")), meta).expect("write sidecar");
    }
}

#[test]
fn latest_batch_prefers_most_recent_date_dir() {
    let temp = TempDir::new().expect("tempdir");
    let old = temp.path().join("axum").join("2025-01-01");
    let new = temp.path().join("axum").join("2025-02-15");
    fs::create_dir_all(&old).expect("create old batch");
    fs::create_dir_all(&new).expect("create new batch");

    write_page(&old, "routing", "stale content", None);
    write_page(&new, "routing", "fresh content", None);

    let repo = DocumentRepository::new(temp.path());
    let docs = repo.latest_batch("axum").expect("load batch");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].content, "fresh content");
}

#[test]
fn sidecar_metadata_is_merged_into_document() {
    let temp = TempDir::new().expect("tempdir");
    let batch = temp.path().join("axum").join("2025-02-15");
    fs::create_dir_all(&batch).expect("create batch");

    write_page(
        &batch,
        "routing",
        "# Routing\n\nRouters dispatch requests.",
        Some(
            r#"{
                "title": "Routing Guide",
                "url": "https://docs.rs/axum/routing",
                "timestamp": "2025-02-15T08:30:00Z",
                "section": "basics"
            }"#,
        ),
    );

    let repo = DocumentRepository::new(temp.path());
    let docs = repo.latest_batch("axum").expect("load batch");

    assert_eq!(docs.len(), 1);
    let doc = &docs[0];
    assert_eq!(doc.title, "Routing Guide");
    assert_eq!(doc.url, "https://docs.rs/axum/routing");
    assert_eq!(
        doc.metadata.get("framework").and_then(Value::as_str),
        Some("axum")
    );
    assert_eq!(
        doc.metadata.get("crawled_at").and_then(Value::as_str),
        Some("2025-02-15T08:30:00Z")
    );
    assert_eq!(
        doc.metadata.get("section").and_then(Value::as_str),
        Some("basics")
    );
}

#[test]
fn missing_sidecar_falls_back_to_humanized_filename() {
    let temp = TempDir::new().expect("tempdir");
    let batch = temp.path().join("axum").join("2025-02-15");
    fs::create_dir_all(&batch).expect("create batch");

    write_page(&batch, "getting_started_guide", "content", None);

    let repo = DocumentRepository::new(temp.path());
    let docs = repo.latest_batch("axum").expect("load batch");

    assert_eq!(docs[0].title, "Getting Started Guide");
    assert_eq!(docs[0].url, "");
    assert!(
        docs[0]
            .metadata
            .get("crawled_at")
            .and_then(Value::as_str)
            .is_some()
    );
}

#[test]
fn corrupt_sidecar_skips_document() {
    let temp = TempDir::new().expect("tempdir");
    let batch = temp.path().join("axum").join("2025-02-15");
    fs::create_dir_all(&batch).expect("create batch");

    write_page(&batch, "bad", "content", Some("{not json"));
    write_page(&batch, "good", "content", None);

    let repo = DocumentRepository::new(temp.path());
    let docs = repo.latest_batch("axum").expect("load batch");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].title, "Good");
}

#[test]
fn unknown_framework_yields_empty_batch() {
    let temp = TempDir::new().expect("tempdir");
    let repo = DocumentRepository::new(temp.path());

    assert_eq!(repo.latest_batch("nope").expect("load batch"), Vec::new());
}

#[test]
fn framework_without_batches_yields_empty_batch() {
    let temp = TempDir::new().expect("tempdir");
    fs::create_dir_all(temp.path().join("axum")).expect("create framework dir");

    let repo = DocumentRepository::new(temp.path());
    assert_eq!(repo.latest_batch("axum").expect("load batch"), Vec::new());
}

#[test]
fn frameworks_lists_directories_sorted() {
    let temp = TempDir::new().expect("tempdir");
    fs::create_dir_all(temp.path().join("pydantic")).expect("create dir");
    fs::create_dir_all(temp.path().join("axum")).expect("create dir");
    fs::write(temp.path().join("stray.txt"), "ignored").expect("write file");

    let repo = DocumentRepository::new(temp.path());
    let frameworks = repo.frameworks().expect("list frameworks");

    assert_eq!(frameworks, vec!["axum".to_string(), "pydantic".to_string()]);
}

#[test]
fn frameworks_empty_when_docs_dir_missing() {
    let repo = DocumentRepository::new("/nonexistent/docs-rag-test");
    assert_eq!(repo.frameworks().expect("list"), Vec::<String>::new());
}

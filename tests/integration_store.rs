#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! Integration tests for the LanceDB-backed chunk store, exercised through
//! the same `VectorIndex` contract the engine and indexer use.

use std::sync::Arc;

use docs_rag::{RagError, Result};
use docs_rag::chunking::{Chunk, ChunkingConfig};
use docs_rag::documents::RawDocument;
use docs_rag::indexer::Indexer;
use docs_rag::llm::EmbeddingClient;
use docs_rag::store::{LanceVectorStore, StoredChunk, VectorIndex};
use serde_json::json;
use tempfile::TempDir;

const DIM: usize = 8;

fn chunk(framework: &str, title: &str, url: &str, content: &str, number: u32) -> Chunk {
    let mut metadata = serde_json::Map::new();
    metadata.insert("framework".to_string(), json!(framework));
    metadata.insert("crawled_at".to_string(), json!("2025-01-01T00:00:00Z"));

    let summary: String = content.chars().take(200).collect();
    Chunk {
        url: url.to_string(),
        chunk_number: number,
        title: title.to_string(),
        content: content.to_string(),
        summary: format!("{summary}..."),
        metadata,
    }
}

fn stored(framework: &str, title: &str, content: &str, basis: usize) -> StoredChunk {
    let mut embedding = vec![0.0; DIM];
    embedding[basis % DIM] = 1.0;
    StoredChunk {
        chunk: chunk(
            framework,
            title,
            &format!("https://docs.example.com/{}", title.to_lowercase()),
            content,
            0,
        ),
        embedding,
    }
}

fn axis(basis: usize) -> Vec<f32> {
    let mut vector = vec![0.0; DIM];
    vector[basis % DIM] = 1.0;
    vector
}

async fn open_store() -> (LanceVectorStore, TempDir) {
    let temp = TempDir::new().expect("tempdir");
    let store = LanceVectorStore::open(&temp.path().join("vectors"))
        .await
        .expect("open store");
    (store, temp)
}

#[tokio::test]
async fn search_filters_by_framework_and_ranks_by_similarity() {
    let (store, _temp) = open_store().await;

    store
        .upsert(&[
            stored("axum", "Routing", "Routers dispatch requests.", 0),
            stored("axum", "Extractors", "Extractors parse requests.", 1),
            stored("pydantic", "Validation", "Validators check fields.", 0),
        ])
        .await
        .expect("upsert");

    let results = store.search(&axis(0), 10, "axum").await.expect("search");

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.framework == "axum"));
    // The chunk embedded on the query axis ranks first.
    assert_eq!(results[0].title, "Routing");
    assert!(results[0].similarity >= results[1].similarity);
}

#[tokio::test]
async fn search_is_case_insensitive_on_framework() {
    let (store, _temp) = open_store().await;

    store
        .upsert(&[stored("Axum", "Routing", "Routers dispatch requests.", 0)])
        .await
        .expect("upsert");

    let results = store.search(&axis(0), 10, "AXUM").await.expect("search");
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn unseeded_framework_returns_no_results() {
    let (store, _temp) = open_store().await;

    store
        .upsert(&[stored("axum", "Routing", "content", 0)])
        .await
        .expect("upsert");

    let results = store
        .search(&axis(0), 10, "unknown-framework")
        .await
        .expect("search");
    assert!(results.is_empty());
}

#[tokio::test]
async fn unwritable_db_path_is_an_io_error() {
    let temp = TempDir::new().expect("tempdir");
    // A file where a directory is needed makes create_dir_all fail.
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "not a directory").expect("write blocker");

    let err = LanceVectorStore::open(&blocker.join("nested").join("vectors"))
        .await
        .expect_err("open should fail");
    assert!(matches!(err, RagError::Io(_)));
}

#[tokio::test]
async fn delete_framework_only_touches_that_framework() {
    let (store, _temp) = open_store().await;

    store
        .upsert(&[
            stored("axum", "Routing", "content", 0),
            stored("pydantic", "Validation", "content", 1),
        ])
        .await
        .expect("upsert");

    store.delete_framework("axum").await.expect("delete");

    assert_eq!(store.count_framework("axum").await.expect("count"), 0);
    assert_eq!(store.count_framework("pydantic").await.expect("count"), 1);

    // Deleting again is a no-op, not an error.
    store.delete_framework("axum").await.expect("redelete");
}

#[tokio::test]
async fn retrieved_chunks_carry_provenance_fields() {
    let (store, _temp) = open_store().await;

    store
        .upsert(&[stored(
            "axum",
            "Routing",
            "Routers dispatch requests to handlers.",
            0,
        )])
        .await
        .expect("upsert");

    let results = store.search(&axis(0), 1, "axum").await.expect("search");

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.title, "Routing");
    assert_eq!(result.url, "https://docs.example.com/routing");
    assert_eq!(result.content, "Routers dispatch requests to handlers.");
    assert!(result.summary.ends_with("..."));
    assert_eq!(result.chunk_number, 0);
}

/// Deterministic low-dimension embeddings for exercising the real store
/// through the indexer.
struct AxisEmbeddings;

impl EmbeddingClient for AxisEmbeddings {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(axis(text.len()))
    }
}

fn document(framework: &str, url: &str, title: &str, content: &str) -> RawDocument {
    let mut metadata = serde_json::Map::new();
    metadata.insert("framework".to_string(), json!(framework));
    metadata.insert("crawled_at".to_string(), json!("2025-01-01T00:00:00Z"));
    RawDocument {
        content: content.to_string(),
        url: url.to_string(),
        title: title.to_string(),
        metadata,
    }
}

#[tokio::test]
async fn reindex_supersedes_previous_chunks_in_real_store() {
    let temp = TempDir::new().expect("tempdir");
    let store = Arc::new(
        LanceVectorStore::open(&temp.path().join("vectors"))
            .await
            .expect("open store"),
    );
    let indexer = Indexer::from_parts(
        Arc::new(AxisEmbeddings),
        Arc::clone(&store) as Arc<dyn VectorIndex>,
        ChunkingConfig::default(),
    );

    let first = vec![document(
        "axum",
        "https://docs.rs/axum/old",
        "Old Page",
        "Old content about routing.",
    )];
    indexer.reindex("axum", &first).await.expect("first reindex");

    let second = vec![document(
        "axum",
        "https://docs.rs/axum/new",
        "New Page",
        "Fresh content about extractors and handlers.",
    )];
    indexer
        .reindex("axum", &second)
        .await
        .expect("second reindex");

    let results = store.search(&axis(0), 10, "axum").await.expect("search");
    assert_eq!(results.len(), 1);
    assert!(results[0].content.contains("Fresh content"));
    assert!(results.iter().all(|r| !r.content.contains("Old content")));
}

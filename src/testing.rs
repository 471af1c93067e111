//! Shared test doubles for the external capabilities.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::documents::RawDocument;
use crate::llm::{CompletionClient, EmbeddingClient};
use crate::store::{RetrievedChunk, StoredChunk, VectorIndex};
use crate::{RagError, Result};

/// Deterministic embeddings derived from text bytes; similar texts do not
/// need similar vectors for these tests, only stable ones.
#[derive(Debug, Default)]
pub struct StubEmbeddings;

impl EmbeddingClient for StubEmbeddings {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let sum: u32 = text.bytes().map(u32::from).sum();
        Ok(vec![sum as f32, text.len() as f32, 1.0])
    }
}

/// Always fails, simulating an embedding-provider outage.
#[derive(Debug)]
pub struct FailingEmbeddings;

impl EmbeddingClient for FailingEmbeddings {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::Embedding("embedding provider unavailable".to_string()))
    }
}

/// Returns a fixed completion.
#[derive(Debug)]
pub struct StubCompletion(pub &'static str);

impl CompletionClient for StubCompletion {
    fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Always fails, simulating a chat-completion outage.
#[derive(Debug)]
pub struct FailingCompletion;

impl CompletionClient for FailingCompletion {
    fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Err(RagError::Generation("model request timed out".to_string()))
    }
}

/// In-memory [`VectorIndex`] that ranks by insertion order. Good enough for
/// orchestration tests, which only care about filtering and ordering
/// contracts, not similarity quality.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    chunks: Mutex<Vec<StoredChunk>>,
}

impl MemoryIndex {
    pub fn count(&self, framework: &str) -> usize {
        self.all(framework).len()
    }

    pub fn all(&self, framework: &str) -> Vec<StoredChunk> {
        self.chunks
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|stored| chunk_framework(stored) == framework.to_lowercase())
            .cloned()
            .collect()
    }
}

fn chunk_framework(stored: &StoredChunk) -> String {
    stored
        .chunk
        .metadata
        .get("framework")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_lowercase()
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, chunks: &[StoredChunk]) -> Result<()> {
        self.chunks
            .lock()
            .expect("lock poisoned")
            .extend_from_slice(chunks);
        Ok(())
    }

    async fn delete_framework(&self, framework: &str) -> Result<()> {
        let framework = framework.to_lowercase();
        self.chunks
            .lock()
            .expect("lock poisoned")
            .retain(|stored| chunk_framework(stored) != framework);
        Ok(())
    }

    async fn search(
        &self,
        _vector: &[f32],
        top_k: usize,
        framework: &str,
    ) -> Result<Vec<RetrievedChunk>> {
        let results = self
            .all(framework)
            .into_iter()
            .take(top_k)
            .map(|stored| RetrievedChunk {
                url: stored.chunk.url.clone(),
                title: stored.chunk.title.clone(),
                content: stored.chunk.content.clone(),
                summary: stored.chunk.summary.clone(),
                chunk_number: stored.chunk.chunk_number,
                framework: chunk_framework(&stored),
                similarity: 1.0,
            })
            .collect();
        Ok(results)
    }

    async fn count_framework(&self, framework: &str) -> Result<u64> {
        Ok(self.count(framework) as u64)
    }
}

/// A failing store, simulating vector-database unavailability.
#[derive(Debug)]
pub struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn upsert(&self, _chunks: &[StoredChunk]) -> Result<()> {
        Err(RagError::Retrieval("vector store unavailable".to_string()))
    }

    async fn delete_framework(&self, _framework: &str) -> Result<()> {
        Err(RagError::Retrieval("vector store unavailable".to_string()))
    }

    async fn search(
        &self,
        _vector: &[f32],
        _top_k: usize,
        _framework: &str,
    ) -> Result<Vec<RetrievedChunk>> {
        Err(RagError::Retrieval("vector store unavailable".to_string()))
    }

    async fn count_framework(&self, _framework: &str) -> Result<u64> {
        Err(RagError::Retrieval("vector store unavailable".to_string()))
    }
}

/// Build a one-page document for a framework.
pub fn document(framework: &str, url: &str, title: &str, content: &str) -> RawDocument {
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

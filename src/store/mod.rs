// Vector storage module
// Defines the storage contract the indexer and engine operate against,
// plus the LanceDB-backed implementation.

pub mod lance;

pub use lance::LanceVectorStore;

use async_trait::async_trait;

use crate::Result;
use crate::chunking::Chunk;

/// A chunk paired with its embedding, ready for persistence. Created
/// transiently during indexing and never mutated after insert; a reindex of
/// the owning framework deletes and replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A stored chunk's fields as returned by similarity search, in descending
/// similarity order.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub url: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub chunk_number: u32,
    pub framework: String,
    /// Similarity score derived from the store's distance metric, higher is
    /// more similar
    pub similarity: f32,
}

/// Persistence and similarity-search contract for embedded chunks.
///
/// Implementations partition chunks by framework; deletes and searches are
/// always framework-scoped. Result ordering from [`search`](Self::search) is
/// the store's similarity ranking, highest first.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert a batch of embedded chunks.
    async fn upsert(&self, chunks: &[StoredChunk]) -> Result<()>;

    /// Delete every chunk belonging to a framework. A no-op when none exist.
    async fn delete_framework(&self, framework: &str) -> Result<()>;

    /// Top-k similarity search, filtered to a single framework.
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        framework: &str,
    ) -> Result<Vec<RetrievedChunk>>;

    /// Number of chunks stored for a framework.
    async fn count_framework(&self, framework: &str) -> Result<u64>;
}

// Indexer module
// Drives chunking, embedding, and storage to (re)populate the vector store
// for one documentation framework.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chunking::{Chunk, ChunkingConfig, chunk_document};
use crate::config::Config;
use crate::documents::RawDocument;
use crate::llm::{EmbeddingClient, OpenAiClient};
use crate::store::{LanceVectorStore, StoredChunk, VectorIndex};
use crate::{RagError, Result};

/// Chunks per embed-and-upsert batch. Bounds request payload size and
/// memory; has no effect on final stored state.
const BATCH_SIZE: usize = 50;

/// Rebuilds the stored chunks for a framework from a batch of raw documents.
pub struct Indexer {
    embeddings: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorIndex>,
    chunking: ChunkingConfig,
}

impl Indexer {
    /// Build an indexer with concrete clients from configuration.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        let embeddings = OpenAiClient::new(config)?;
        let store = LanceVectorStore::open(&config.vector_db_path()).await?;

        Ok(Self::from_parts(
            Arc::new(embeddings),
            Arc::new(store),
            config.chunking.clone(),
        ))
    }

    #[inline]
    pub fn from_parts(
        embeddings: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorIndex>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            embeddings,
            store,
            chunking,
        }
    }

    /// Replace all stored chunks for `framework` with chunks derived from
    /// `documents`, returning the number of chunks written.
    ///
    /// Existing chunks are deleted before the first insert, so two successive
    /// reindex calls never leave stale content behind. A failure embedding or
    /// storing a batch aborts the remaining batches; chunks from earlier
    /// batches stay stored (partial-index state is accepted, not rolled
    /// back). Queries racing a reindex may observe empty or partial results.
    #[inline]
    pub async fn reindex(&self, framework: &str, documents: &[RawDocument]) -> Result<usize> {
        info!(framework = framework, documents = documents.len(), "reindexing");

        let mut chunks: Vec<Chunk> = Vec::new();
        for document in documents {
            if document.content.is_empty() {
                warn!(url = %document.url, "skipping empty document");
                continue;
            }
            chunks.extend(chunk_document(document, &self.chunking));
        }

        info!(chunks = chunks.len(), "generated chunks");

        self.store
            .delete_framework(framework)
            .await
            .map_err(|e| RagError::Indexing(format!("Failed to delete existing chunks: {e}")))?;

        let mut written = 0;
        for (batch_index, batch) in chunks.chunks(BATCH_SIZE).enumerate() {
            let stored = self.embed_batch(batch).map_err(|e| {
                RagError::Indexing(format!("Failed to embed batch {}: {e}", batch_index + 1))
            })?;

            self.store.upsert(&stored).await.map_err(|e| {
                RagError::Indexing(format!("Failed to store batch {}: {e}", batch_index + 1))
            })?;

            written += stored.len();
            debug!(
                batch = batch_index + 1,
                total = chunks.len().div_ceil(BATCH_SIZE),
                "stored batch"
            );
        }

        info!(framework = framework, chunks = written, "reindex complete");
        Ok(written)
    }

    fn embed_batch(&self, batch: &[Chunk]) -> Result<Vec<StoredChunk>> {
        batch
            .iter()
            .map(|chunk| {
                let embedding = self.embeddings.embed(&chunk.content)?;
                Ok(StoredChunk {
                    chunk: chunk.clone(),
                    embedding,
                })
            })
            .collect()
    }
}

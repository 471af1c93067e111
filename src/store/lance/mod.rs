
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::{RetrievedChunk, StoredChunk, VectorIndex};
use crate::{RagError, Result};

/// Dimension used for the placeholder table schema before the first upsert
/// reveals the real embedding size (1536 matches text-embedding-ada-002).
const DEFAULT_VECTOR_DIMENSION: usize = 1536;

const TABLE_NAME: &str = "chunks";

/// LanceDB-backed chunk store with framework-scoped similarity search.
pub struct LanceVectorStore {
    connection: Connection,
    vector_dimension: Mutex<Option<usize>>,
}

impl std::fmt::Debug for LanceVectorStore {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanceVectorStore")
            .field("connection", &self.connection.uri())
            .field("vector_dimension", &self.vector_dimension)
            .finish()
    }
}

impl LanceVectorStore {
    /// Connect to (or create) the vector database at the given directory and
    /// ensure the chunks table exists.
    #[inline]
    pub async fn open(db_path: &Path) -> Result<Self> {
        debug!("initializing LanceDB at {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to connect to LanceDB: {}", e)))?;

        let store = Self {
            connection,
            vector_dimension: Mutex::new(None),
        };

        let dimension = store.initialize_table().await?;
        store.set_cached_dimension(dimension);

        info!("vector store initialized");
        Ok(store)
    }

    /// Default on-disk location under the application base directory.
    #[inline]
    pub fn db_path(base_dir: &Path) -> PathBuf {
        base_dir.join("vectors")
    }

    /// Create the table if missing, otherwise detect its vector dimension.
    async fn initialize_table(&self) -> Result<usize> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&TABLE_NAME.to_string()) {
            let dimension = self.detect_vector_dimension().await?;
            debug!("chunks table exists with dimension {}", dimension);
            return Ok(dimension);
        }

        // The real dimension is unknown until the first batch of embeddings
        // arrives; the table is recreated then if it differs.
        self.create_table(DEFAULT_VECTOR_DIMENSION).await?;
        Ok(DEFAULT_VECTOR_DIMENSION)
    }

    async fn create_table(&self, vector_dimension: usize) -> Result<()> {
        let schema = chunk_schema(vector_dimension);
        self.connection
            .create_empty_table(TABLE_NAME, schema)
            .execute()
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to create chunks table: {}", e)))?;

        info!(
            "chunks table created with {} dimensions",
            vector_dimension
        );
        Ok(())
    }

    /// Read the vector column's dimension from the existing table schema.
    async fn detect_vector_dimension(&self) -> Result<usize> {
        let table = self.open_table().await?;

        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return usize::try_from(*size).map_err(|_| {
                        RagError::Retrieval(format!("Invalid vector dimension in schema: {}", size))
                    });
                }
            }
        }

        Err(RagError::Retrieval(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    /// Drop and recreate the table when the embedding dimension changes
    /// (e.g. after switching embedding models).
    async fn recreate_table(&self, vector_dimension: usize) -> Result<()> {
        info!(
            "recreating chunks table with dimension {}",
            vector_dimension
        );

        self.connection
            .drop_table(TABLE_NAME)
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to drop chunks table: {}", e)))?;

        self.create_table(vector_dimension).await
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to open chunks table: {}", e)))
    }

    fn cached_dimension(&self) -> Option<usize> {
        *self
            .vector_dimension
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_cached_dimension(&self, dimension: usize) {
        *self
            .vector_dimension
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(dimension);
    }

    /// Build one Arrow RecordBatch from a batch of embedded chunks.
    fn create_record_batch(
        &self,
        chunks: &[StoredChunk],
        vector_dimension: usize,
    ) -> Result<RecordBatch> {
        let len = chunks.len();

        let mut ids = Vec::with_capacity(len);
        let mut urls = Vec::with_capacity(len);
        let mut chunk_numbers = Vec::with_capacity(len);
        let mut titles = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut summaries = Vec::with_capacity(len);
        let mut frameworks = Vec::with_capacity(len);
        let mut crawled_ats = Vec::with_capacity(len);
        let mut metadata_blobs = Vec::with_capacity(len);
        let mut flat_vector = Vec::with_capacity(len * vector_dimension);

        for stored in chunks {
            if stored.embedding.len() != vector_dimension {
                return Err(RagError::Retrieval(format!(
                    "Embedding dimension mismatch in batch: expected {}, got {}",
                    vector_dimension,
                    stored.embedding.len()
                )));
            }

            let chunk = &stored.chunk;
            ids.push(Uuid::new_v4().to_string());
            urls.push(chunk.url.clone());
            chunk_numbers.push(chunk.chunk_number);
            titles.push(chunk.title.clone());
            contents.push(chunk.content.clone());
            summaries.push(chunk.summary.clone());
            frameworks.push(metadata_framework(&chunk.metadata));
            crawled_ats.push(metadata_str(&chunk.metadata, "crawled_at"));
            metadata_blobs.push(
                serde_json::to_string(&chunk.metadata).map_err(|e| {
                    RagError::Retrieval(format!("Failed to serialize chunk metadata: {}", e))
                })?,
            );
            flat_vector.extend_from_slice(&stored.embedding);
        }

        let values = Float32Array::from(flat_vector);
        let item_field = Arc::new(Field::new("item", DataType::Float32, false));
        let dim = i32::try_from(vector_dimension)
            .map_err(|_| RagError::Retrieval("Vector dimension too large".to_string()))?;
        let vector_array = FixedSizeListArray::try_new(item_field, dim, Arc::new(values), None)
            .map_err(|e| RagError::Retrieval(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(urls)),
            Arc::new(UInt32Array::from(chunk_numbers)),
            Arc::new(StringArray::from(titles)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(summaries)),
            Arc::new(StringArray::from(frameworks)),
            Arc::new(StringArray::from(crawled_ats)),
            Arc::new(StringArray::from(metadata_blobs)),
        ];

        RecordBatch::try_new(chunk_schema(vector_dimension), arrays)
            .map_err(|e| RagError::Retrieval(format!("Failed to create record batch: {}", e)))
    }

    /// Parse one result batch, preserving the store's rank order.
    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<RetrievedChunk>> {
        let urls = string_column(batch, "url")?;
        let titles = string_column(batch, "title")?;
        let contents = string_column(batch, "content")?;
        let summaries = string_column(batch, "summary")?;
        let frameworks = string_column(batch, "framework")?;

        let chunk_numbers = batch
            .column_by_name("chunk_number")
            .and_then(|col| col.as_any().downcast_ref::<UInt32Array>())
            .ok_or_else(|| RagError::Retrieval("Missing chunk_number column".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut results = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            results.push(RetrievedChunk {
                url: urls.value(row).to_string(),
                title: titles.value(row).to_string(),
                content: contents.value(row).to_string(),
                summary: summaries.value(row).to_string(),
                chunk_number: chunk_numbers.value(row),
                framework: frameworks.value(row).to_string(),
                similarity: 1.0 - distance,
            });
        }

        Ok(results)
    }
}

#[async_trait]
impl VectorIndex for LanceVectorStore {
    #[inline]
    async fn upsert(&self, chunks: &[StoredChunk]) -> Result<()> {
        if chunks.is_empty() {
            debug!("no chunks to store");
            return Ok(());
        }

        let vector_dimension = chunks[0].embedding.len();
        if self.cached_dimension() != Some(vector_dimension) {
            let existing = self.detect_vector_dimension().await?;
            if existing != vector_dimension {
                self.recreate_table(vector_dimension).await?;
            }
            self.set_cached_dimension(vector_dimension);
        }

        let record_batch = self.create_record_batch(chunks, vector_dimension)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        let table = self.open_table().await?;
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to insert chunks: {}", e)))?;

        debug!("stored batch of {} chunks", chunks.len());
        Ok(())
    }

    #[inline]
    async fn delete_framework(&self, framework: &str) -> Result<()> {
        let table = self.open_table().await?;
        let predicate = framework_predicate(framework);

        table.delete(&predicate).await.map_err(|e| {
            RagError::Retrieval(format!("Failed to delete framework chunks: {}", e))
        })?;

        info!(framework = framework, "deleted stored chunks");
        Ok(())
    }

    #[inline]
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        framework: &str,
    ) -> Result<Vec<RetrievedChunk>> {
        debug!(framework = framework, top_k = top_k, "similarity search");

        let table = self.open_table().await?;
        let mut stream = table
            .vector_search(vector)
            .map_err(|e| RagError::Retrieval(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .only_if(framework_predicate(framework))
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to execute search: {}", e)))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to read result stream: {}", e)))?
        {
            results.extend(Self::parse_search_batch(&batch)?);
        }

        debug!("search returned {} chunks", results.len());
        Ok(results)
    }

    #[inline]
    async fn count_framework(&self, framework: &str) -> Result<u64> {
        let table = self.open_table().await?;

        let count = table
            .count_rows(Some(framework_predicate(framework)))
            .await
            .map_err(|e| RagError::Retrieval(format!("Failed to count chunks: {}", e)))?;

        Ok(count as u64)
    }
}

fn chunk_schema(vector_dimension: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                vector_dimension as i32,
            ),
            false,
        ),
        Field::new("url", DataType::Utf8, false),
        Field::new("chunk_number", DataType::UInt32, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("summary", DataType::Utf8, false),
        Field::new("framework", DataType::Utf8, false),
        Field::new("crawled_at", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
    ]))
}

/// Framework identifiers are free-form user input, so values are lowercased
/// and quote-escaped before landing in a filter predicate.
fn framework_predicate(framework: &str) -> String {
    let escaped = framework.to_lowercase().replace('\'', "''");
    format!("framework = '{}'", escaped)
}

/// Framework column value for a chunk, normalized to lowercase.
fn metadata_framework(metadata: &serde_json::Map<String, Value>) -> String {
    metadata
        .get("framework")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase()
}

fn metadata_str(metadata: &serde_json::Map<String, Value>, key: &str) -> String {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| RagError::Retrieval(format!("Missing {} column", name)))
}

// Query engine module
// Top-level retrieval-augmented query pipeline: embed the question, search
// the vector store, assemble context, generate an answer, format citations.


pub mod context;
pub mod prompts;

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::llm::{CompletionClient, EmbeddingClient, OpenAiClient};
use crate::store::{LanceVectorStore, RetrievedChunk, VectorIndex};
use crate::Result;

pub use context::{assemble_context, format_sources};
pub use prompts::{PersonaTable, Prompt};

/// Default number of chunks retrieved per query.
pub const DEFAULT_TOP_K: usize = 8;

/// Canned answer when the store holds nothing relevant. An empty retrieval
/// is a valid outcome, not a failure.
const NO_DOCUMENTS_ANSWER: &str = "No relevant documents were found. \
    Please try rephrasing your question or ask about a different topic.";

/// Outcome of one query. Exactly one of `answer` or `error` is
/// authoritative: when `error` is set, `answer` and `sources` are empty;
/// otherwise `answer` holds generated text and `sources` holds zero or more
/// citation lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: String,
    pub error: Option<String>,
}

impl QueryResult {
    fn success(answer: String, sources: String) -> Self {
        Self {
            answer,
            sources,
            error: None,
        }
    }

    fn failure(message: String) -> Self {
        Self {
            answer: String::new(),
            sources: String::new(),
            error: Some(message),
        }
    }
}

/// Retrieval-augmented query engine over a framework-partitioned chunk
/// store.
///
/// Holds no mutable state between queries; each query's chunks, context, and
/// prompts are local to that call, so one engine can serve concurrent
/// callers. The three external calls per query (embed, search, complete) run
/// strictly in sequence and are never retried.
pub struct RagEngine {
    embeddings: Arc<dyn EmbeddingClient>,
    chat: Arc<dyn CompletionClient>,
    store: Arc<dyn VectorIndex>,
    personas: PersonaTable,
    top_k: usize,
}

impl RagEngine {
    /// Build an engine with concrete clients from configuration. Fails fast
    /// when credentials are missing or the store cannot be opened.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        let client = OpenAiClient::new(config)?;
        let store = LanceVectorStore::open(&config.vector_db_path()).await?;

        Ok(Self::from_parts(
            Arc::new(client.clone()),
            Arc::new(client),
            Arc::new(store),
            PersonaTable::with_overrides(&config.personas),
        ))
    }

    #[inline]
    pub fn from_parts(
        embeddings: Arc<dyn EmbeddingClient>,
        chat: Arc<dyn CompletionClient>,
        store: Arc<dyn VectorIndex>,
        personas: PersonaTable,
    ) -> Self {
        Self {
            embeddings,
            chat,
            store,
            personas,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Embed the query and run a framework-filtered similarity search.
    ///
    /// The framework identifier is lowercased before filtering. An empty
    /// result is success; errors mean the embedding call or the store
    /// search failed.
    #[inline]
    pub async fn retrieve(&self, query: &str, framework: &str) -> Result<Vec<RetrievedChunk>> {
        let framework = framework.to_lowercase();
        info!(framework = %framework, "searching documents");

        let vector = self.embeddings.embed(query)?;
        let chunks = self.store.search(&vector, self.top_k, &framework).await?;

        info!("found {} documents", chunks.len());
        Ok(chunks)
    }

    /// Execute the complete pipeline for one question.
    ///
    /// Never returns an error: every upstream failure is caught here and
    /// converted into a [`QueryResult`] with its message attached verbatim.
    /// The caller may re-issue the query; nothing is retried internally.
    #[inline]
    pub async fn query(&self, question: &str, framework: &str) -> QueryResult {
        match self.answer(question, framework).await {
            Ok(result) => result,
            Err(e) => {
                warn!("query failed: {}", e);
                QueryResult::failure(e.to_string())
            }
        }
    }

    async fn answer(&self, question: &str, framework: &str) -> Result<QueryResult> {
        let chunks = self.retrieve(question, framework).await?;

        if chunks.is_empty() {
            warn!("no relevant documents found");
            return Ok(QueryResult::success(
                NO_DOCUMENTS_ANSWER.to_string(),
                String::new(),
            ));
        }

        let context = assemble_context(&chunks);
        let prompt = self.personas.build_prompt(question, &context, framework);

        info!("generating response");
        let answer = self.chat.complete(&prompt.system, &prompt.user)?;
        let sources = format_sources(&chunks);

        info!("query completed");
        Ok(QueryResult::success(answer, sources))
    }
}

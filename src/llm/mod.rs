
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::{RagError, Result};

/// Fixed sampling temperature for answer generation. Slightly creative but
/// still grounded in the retrieved context; reproducibility is not a goal.
const TEMPERATURE: f32 = 0.7;

/// Converts text into a fixed-length embedding vector.
pub trait EmbeddingClient: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Produces a chat completion from a system prompt and a user prompt.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible embeddings + chat-completions API.
///
/// Requests are synchronous with a global timeout and are never retried: a
/// failed call surfaces immediately and the caller decides whether to
/// resubmit.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_base: String,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .require_api_key()
            .map_err(|e| RagError::Config(e.to_string()))?
            .to_string();

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.openai.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            api_base: config.openai.api_base.trim_end_matches('/').to_string(),
            api_key,
            embedding_model: config.openai.embedding_model.clone(),
            chat_model: config.openai.chat_model.clone(),
            agent,
        })
    }

    /// POST a JSON body and return the response text, or the underlying
    /// failure message for the caller to wrap in its own error kind.
    fn post_json(&self, path: &str, body: &str) -> std::result::Result<String, String> {
        let url = format!("{}/{}", self.api_base, path);
        debug!(url = %url, "sending request");

        self.agent
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send(body)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| match e {
                ureq::Error::StatusCode(status) => format!("HTTP {} from {}", status, url),
                other => format!("Request to {} failed: {}", url, other),
            })
    }
}

impl EmbeddingClient for OpenAiClient {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("generating embedding for text of length {}", text.len());

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| RagError::Embedding(format!("Failed to serialize request: {}", e)))?;

        let response_text = self
            .post_json("embeddings", &body)
            .map_err(RagError::Embedding)?;

        let response: EmbeddingResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Embedding(format!("Failed to parse response: {}", e)))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagError::Embedding("Response contained no embedding".to_string()))?;

        debug!("generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

impl CompletionClient for OpenAiClient {
    #[inline]
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        debug!(model = %self.chat_model, "generating completion");

        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: TEMPERATURE,
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| RagError::Generation(format!("Failed to serialize request: {}", e)))?;

        let response_text = self
            .post_json("chat/completions", &body)
            .map_err(RagError::Generation)?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Generation(format!("Failed to parse response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RagError::Generation("Response contained no choices".to_string()))
    }
}

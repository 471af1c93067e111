
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::documents::RawDocument;

/// How many characters of a chunk's content are copied into its summary.
const SUMMARY_LENGTH: usize = 200;

/// A contiguous, possibly-overlapping slice of one document's content,
/// the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// URL of the source document
    pub url: String,
    /// 0-based position of this chunk within its document
    pub chunk_number: u32,
    /// Title inherited from the source document
    pub title: String,
    /// Trimmed chunk text
    pub content: String,
    /// First 200 characters of content plus an ellipsis marker
    pub summary: String,
    /// Copy of the source document's metadata (includes `framework`)
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Configuration for document chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Soft upper bound on chunk size, in characters
    pub chunk_size: usize,
    /// Number of trailing words carried over into the next chunk
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap_words: 200,
        }
    }
}

/// Split a document into an ordered sequence of overlapping chunks.
///
/// Paragraphs (blank-line separated) are accumulated until adding the next
/// one would push the accumulator past `chunk_size` characters; the
/// accumulator is then emitted and the next chunk is seeded with the last
/// `overlap_words` whitespace-separated words of the emitted text. The size
/// bound is a soft target: a single paragraph longer than `chunk_size` is
/// never split mid-paragraph.
///
/// An empty (or whitespace-only) document yields no chunks.
#[inline]
pub fn chunk_document(document: &RawDocument, config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut accumulator = String::new();
    // Size bound is in characters, not bytes; tracked alongside the
    // accumulator to avoid rescanning it per paragraph.
    let mut accumulator_chars: usize = 0;
    let mut chunk_number: u32 = 0;

    for paragraph in document.content.split("\n\n") {
        let paragraph_chars = paragraph.chars().count();
        if accumulator_chars + paragraph_chars <= config.chunk_size {
            accumulator.push_str(paragraph);
            accumulator.push_str("\n\n");
            accumulator_chars += paragraph_chars + 2;
        } else {
            if let Some(chunk) = make_chunk(document, &accumulator, chunk_number) {
                chunks.push(chunk);
                chunk_number += 1;
            }

            // Seed the next chunk with whole-word overlap from the text just
            // emitted. Fewer words than `overlap_words` means all of them.
            let words: Vec<&str> = accumulator.split_whitespace().collect();
            let start = words.len().saturating_sub(config.overlap_words);
            let overlap = words.get(start..).unwrap_or_default().join(" ");

            accumulator_chars = overlap.chars().count() + paragraph_chars + 4;
            accumulator = overlap;
            accumulator.push_str("\n\n");
            accumulator.push_str(paragraph);
            accumulator.push_str("\n\n");
        }
    }

    if let Some(chunk) = make_chunk(document, &accumulator, chunk_number) {
        chunks.push(chunk);
    }

    debug!(
        url = %document.url,
        chunks = chunks.len(),
        "chunked document"
    );

    chunks
}

/// Build a chunk from the accumulator, or `None` if it holds no text.
fn make_chunk(document: &RawDocument, accumulator: &str, chunk_number: u32) -> Option<Chunk> {
    let content = accumulator.trim();
    if content.is_empty() {
        return None;
    }

    Some(Chunk {
        url: document.url.clone(),
        chunk_number,
        title: document.title.clone(),
        content: content.to_string(),
        summary: summarize(content),
        metadata: document.metadata.clone(),
    })
}

/// Literal truncation to the first 200 characters, independent of word
/// boundaries. Content shorter than 200 characters still gets the marker.
fn summarize(content: &str) -> String {
    let mut summary: String = content.chars().take(SUMMARY_LENGTH).collect();
    summary.push_str("...");
    summary
}

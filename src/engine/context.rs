//! Rendering of retrieved chunks into prompt context and citation lines.

use itertools::Itertools;

use crate::store::RetrievedChunk;

/// Width of the separator line between context blocks.
const SEPARATOR_WIDTH: usize = 50;

/// Format retrieved chunks into a single prompt-ready context block.
///
/// One block per chunk (title line, URL line, content, `=` separator),
/// joined by blank lines. Input order is the store's similarity ranking and
/// is preserved; nothing is reordered or deduplicated.
#[inline]
pub fn assemble_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "Section: {}\nURL: {}\nContent:\n{}\n{}",
                chunk.title,
                chunk.url,
                chunk.content,
                "=".repeat(SEPARATOR_WIDTH)
            )
        })
        .join("\n\n")
}

/// Format citation lines for the retrieved chunks, one Markdown link per
/// chunk in input order. Empty input yields an empty string.
#[inline]
pub fn format_sources(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("- [{}]({})", chunk.title, chunk.url))
        .join("\n")
}

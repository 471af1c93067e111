#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

/// Arbitrary crawler-supplied metadata attached to a document and carried
/// through to every chunk derived from it.
pub type Metadata = Map<String, Value>;

/// One crawled documentation page, as produced by the upstream crawler.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Full markdown text of the page
    pub content: String,
    /// Canonical URL of the page
    pub url: String,
    /// Page title
    pub title: String,
    /// Metadata map, always containing `framework` and `crawled_at`
    pub metadata: Metadata,
}

/// Reads crawled documents off disk, one directory tree per framework.
///
/// Layout: `<docs_dir>/<framework>/<date>/*.md`, each markdown file with an
/// optional `<stem>_meta.json` sidecar written by the crawler. The repository
/// always serves the most recent date directory; date-directory management
/// itself belongs to the crawler.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    docs_dir: PathBuf,
}

impl DocumentRepository {
    #[inline]
    pub fn new<P: Into<PathBuf>>(docs_dir: P) -> Self {
        Self {
            docs_dir: docs_dir.into(),
        }
    }

    /// List the frameworks that have at least one crawled batch on disk.
    #[inline]
    pub fn frameworks(&self) -> Result<Vec<String>> {
        if !self.docs_dir.exists() {
            return Ok(Vec::new());
        }

        let mut frameworks = Vec::new();
        for entry in fs::read_dir(&self.docs_dir)
            .with_context(|| format!("Failed to read docs directory: {}", self.docs_dir.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                frameworks.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        frameworks.sort();
        Ok(frameworks)
    }

    /// Load the latest crawled batch of documents for a framework.
    ///
    /// Selects the lexicographically greatest date directory under the
    /// framework's tree (crawl dates are ISO formatted, so this is the most
    /// recent crawl). A framework with no crawled batches yields an empty
    /// batch, not an error. Files that cannot be read or whose sidecar fails
    /// to parse are logged and skipped rather than failing the whole batch.
    #[inline]
    pub fn latest_batch(&self, framework: &str) -> Result<Vec<RawDocument>> {
        let framework_dir = self.docs_dir.join(framework);

        let Some(latest_dir) = latest_date_dir(&framework_dir)? else {
            warn!(framework = framework, "no crawled batches found");
            return Ok(Vec::new());
        };

        info!(
            framework = framework,
            batch = %latest_dir.display(),
            "loading document batch"
        );

        let mut documents = Vec::new();
        let mut entries: Vec<PathBuf> = fs::read_dir(&latest_dir)
            .with_context(|| format!("Failed to read batch directory: {}", latest_dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        entries.sort();

        for path in entries {
            match read_document(&path, framework) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    warn!(file = %path.display(), "skipping unreadable document: {e:#}");
                }
            }
        }

        debug!(
            framework = framework,
            count = documents.len(),
            "loaded documents"
        );
        Ok(documents)
    }
}

/// Pick the most recent date directory for a framework, if any exist.
fn latest_date_dir(framework_dir: &Path) -> Result<Option<PathBuf>> {
    if !framework_dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    for entry in fs::read_dir(framework_dir).with_context(|| {
        format!(
            "Failed to read framework directory: {}",
            framework_dir.display()
        )
    })? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        if latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}

/// Read one markdown file plus its optional `_meta.json` sidecar.
fn read_document(path: &Path, framework: &str) -> Result<RawDocument> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut sidecar = Metadata::new();
    let meta_path = path.with_file_name(format!("{stem}_meta.json"));
    if meta_path.exists() {
        let raw = fs::read_to_string(&meta_path)
            .with_context(|| format!("Failed to read sidecar: {}", meta_path.display()))?;
        sidecar = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse sidecar: {}", meta_path.display()))?;
    }

    let title = sidecar
        .get("title")
        .and_then(Value::as_str)
        .map_or_else(|| humanize_stem(&stem), ToString::to_string);

    let url = sidecar
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let crawled_at = sidecar
        .get("timestamp")
        .and_then(Value::as_str)
        .map_or_else(|| Utc::now().to_rfc3339(), ToString::to_string);

    let mut metadata = sidecar;
    metadata.insert("framework".to_string(), json!(framework));
    metadata.insert("file_path".to_string(), json!(path.display().to_string()));
    metadata.insert("crawled_at".to_string(), json!(crawled_at));

    Ok(RawDocument {
        content,
        url,
        title,
        metadata,
    })
}

/// Fall back to a title derived from the filename: underscores become spaces
/// and each word is capitalized.
fn humanize_stem(stem: &str) -> String {
    stem.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}


use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::chunking::ChunkingConfig;

/// Environment variable holding the API key for the embedding and
/// chat-completion provider. Never stored in the TOML file.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable overriding the configured chat model.
pub const CHAT_MODEL_VAR: &str = "LLM_MODEL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Framework identifier -> system-prompt persona. Merged over the
    /// built-in persona table; lets deployments add frameworks without a
    /// rebuild.
    #[serde(default)]
    pub personas: BTreeMap<String, String>,
    /// Directory holding crawled documents (`<framework>/<date>/*.md`).
    /// Defaults to `<base_dir>/docs`.
    #[serde(default)]
    pub docs_dir: Option<PathBuf>,
    #[serde(skip)]
    pub base_dir: PathBuf,
    /// Provider credential, sourced from the environment at load time.
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_base: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub timeout_seconds: u64,
}

impl Default for OpenAiConfig {
    #[inline]
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-4".to_string(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Missing required environment variable: {0}")]
    MissingApiKey(&'static str),
    #[error("Invalid API base URL: {0}")]
    InvalidApiBase(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid chunk size: {0} (must be between 100 and 1000000 characters)")]
    InvalidChunkSize(usize),
    #[error("Invalid overlap: {0} (must be at most 10000 words)")]
    InvalidOverlapWords(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from `<config_dir>/config.toml`, falling back to
    /// defaults when the file does not exist. The provider API key is read
    /// from the environment and validated here, once, so a misconfigured
    /// deployment fails at startup rather than mid-query.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            Config::default()
        };

        config.base_dir = config_dir.as_ref().to_path_buf();
        config.api_key = env::var(API_KEY_VAR).ok().filter(|key| !key.is_empty());
        if let Ok(model) = env::var(CHAT_MODEL_VAR) {
            if !model.is_empty() {
                config.openai.chat_model = model;
            }
        }

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    /// Load from the platform config directory.
    #[inline]
    pub fn load_default() -> Result<Self> {
        let config_dir = super::get_config_dir()?;
        Self::load(config_dir)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.api_key.is_none() {
            return Err(ConfigError::MissingApiKey(API_KEY_VAR));
        }

        self.openai.validate()?;

        if !(100..=1_000_000).contains(&self.chunking.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(self.chunking.chunk_size));
        }
        if self.chunking.overlap_words > 10_000 {
            return Err(ConfigError::InvalidOverlapWords(
                self.chunking.overlap_words,
            ));
        }

        Ok(())
    }

    /// The API key, or a `Config` error when it was absent at load time.
    #[inline]
    pub fn require_api_key(&self) -> std::result::Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey(API_KEY_VAR))
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Directory for the LanceDB vector database.
    #[inline]
    pub fn vector_db_path(&self) -> PathBuf {
        self.base_dir.join("vectors")
    }

    /// Directory holding crawled document batches.
    #[inline]
    pub fn docs_dir(&self) -> PathBuf {
        self.docs_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("docs"))
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            openai: OpenAiConfig::default(),
            chunking: ChunkingConfig::default(),
            personas: BTreeMap::new(),
            docs_dir: None,
            base_dir: PathBuf::new(),
            api_key: None,
        }
    }
}

impl OpenAiConfig {
    #[inline]
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        Url::parse(&self.api_base)
            .map_err(|_| ConfigError::InvalidApiBase(self.api_base.clone()))?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }
        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }
        if self.timeout_seconds == 0 || self.timeout_seconds > 600 {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }
}

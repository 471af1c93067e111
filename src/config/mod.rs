// Configuration management module
// Handles the TOML settings file and startup validation.

pub mod settings;


pub use settings::{Config, ConfigError, OpenAiConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("docs-rag"))
        .ok_or(ConfigError::DirectoryError)
}

//! TOML configuration file loading
//!
//! Supports `~/.config/voice-recall/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct RecallConfigFile {
    /// Storage locations
    #[serde(default)]
    pub storage: StorageFileConfig,

    /// Memory window and retrieval limits
    #[serde(default)]
    pub memory: MemoryFileConfig,

    /// Language model collaborator
    #[serde(default)]
    pub llm: LlmFileConfig,
}

/// Storage locations
#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    /// Data directory (database lives here unless `db_path` is set)
    pub data_dir: Option<String>,

    /// Explicit database file path
    pub db_path: Option<String>,
}

/// Memory configuration
#[derive(Debug, Default, Deserialize)]
pub struct MemoryFileConfig {
    /// Number of recent turns included in every prompt
    pub max_history_length: Option<usize>,

    /// Number of older, relevance-ranked turns included in every prompt
    pub relevant_limit: Option<usize>,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// `OpenAI`-compatible base URL (e.g. `https://api.openai.com/v1`)
    pub api_url: Option<String>,

    /// Model identifier (e.g. "gpt-4o-mini")
    pub model: Option<String>,

    /// API key
    pub api_key: Option<String>,

    /// System prompt sent with every completion
    pub system_prompt: Option<String>,
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the contents are not valid TOML for this schema
pub fn parse_config(content: &str) -> Result<RecallConfigFile, toml::de::Error> {
    toml::from_str(content)
}

/// Load the TOML config file from the standard path
///
/// Returns `RecallConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> RecallConfigFile {
    let Some(path) = config_file_path() else {
        return RecallConfigFile::default();
    };

    if !path.exists() {
        return RecallConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                RecallConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            RecallConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voice-recall/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voice-recall").join("config.toml"))
}

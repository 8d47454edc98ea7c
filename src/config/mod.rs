//! Configuration management
//!
//! Precedence for every setting: environment variable, then the TOML file,
//! then the built-in default.

pub mod file;

use std::path::PathBuf;

use crate::{Error, Result};

use file::RecallConfigFile;

/// Default number of recent turns per prompt
pub const DEFAULT_MAX_HISTORY_LENGTH: usize = 10;

/// Default number of relevance-ranked older turns per prompt
pub const DEFAULT_RELEVANT_LIMIT: usize = 3;

const DEFAULT_LLM_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SYSTEM_PROMPT: &str = "Eres un asistente de voz amable. Responde de forma breve y \
natural, teniendo en cuenta lo que sabes del usuario y la conversación anterior.";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory
    pub data_dir: PathBuf,

    /// Path to the memory database
    pub db_path: PathBuf,

    /// Memory configuration
    pub memory: MemoryConfig,

    /// Language model configuration
    pub llm: LlmConfig,
}

/// Memory window and retrieval limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Maximum number of recent turns in a context bundle
    pub max_history_length: usize,

    /// Maximum number of relevance-ranked older turns in a context bundle
    pub relevant_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_history_length: DEFAULT_MAX_HISTORY_LENGTH,
            relevant_limit: DEFAULT_RELEVANT_LIMIT,
        }
    }
}

impl MemoryConfig {
    /// Check the limits are usable
    ///
    /// # Errors
    ///
    /// Returns a config error if the history window is zero
    pub fn validate(&self) -> Result<()> {
        if self.max_history_length == 0 {
            return Err(Error::Config(
                "max_history_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Language model collaborator configuration
#[derive(Clone)]
pub struct LlmConfig {
    /// `OpenAI`-compatible base URL
    pub api_url: String,

    /// Model identifier
    pub model: String,

    /// API key (from `OPENAI_API_KEY` or the config file)
    pub api_key: Option<String>,

    /// System prompt sent with every completion
    pub system_prompt: String,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a numeric override does not parse or the memory
    /// limits are invalid
    pub fn resolve(fc: RecallConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Data directory (~/.local/share/voice-recall on Linux)
        let data_dir = env("RECALL_DATA_DIR")
            .or(fc.storage.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        let db_path = env("RECALL_DB_PATH")
            .or(fc.storage.db_path)
            .map_or_else(|| data_dir.join("memory.db"), PathBuf::from);

        let memory = MemoryConfig {
            max_history_length: parse_env(&env, "RECALL_MAX_HISTORY")?
                .or(fc.memory.max_history_length)
                .unwrap_or(DEFAULT_MAX_HISTORY_LENGTH),
            relevant_limit: parse_env(&env, "RECALL_RELEVANT_LIMIT")?
                .or(fc.memory.relevant_limit)
                .unwrap_or(DEFAULT_RELEVANT_LIMIT),
        };
        memory.validate()?;

        let llm = LlmConfig {
            api_url: env("RECALL_LLM_URL")
                .or(fc.llm.api_url)
                .unwrap_or_else(|| DEFAULT_LLM_URL.to_string()),
            model: env("RECALL_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            api_key: env("OPENAI_API_KEY").or(fc.llm.api_key),
            system_prompt: fc
                .llm
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        };

        Ok(Self {
            data_dir,
            db_path,
            memory,
            llm,
        })
    }
}

fn parse_env(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<usize>> {
    env(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
        })
        .transpose()
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/voice-recall"),
        |d| d.data_dir().join("voice-recall"),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(RecallConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.memory, MemoryConfig::default());
        assert_eq!(config.memory.max_history_length, 10);
        assert_eq!(config.db_path, config.data_dir.join("memory.db"));
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let fc = file::parse_config(
            r#"
            [storage]
            data_dir = "/srv/recall"

            [memory]
            max_history_length = 6
            relevant_limit = 2
            "#,
        )
        .unwrap();

        let config = Config::resolve(
            fc,
            env_from(&[("RECALL_MAX_HISTORY", "4"), ("OPENAI_API_KEY", "sk-test")]),
        )
        .unwrap();

        assert_eq!(config.memory.max_history_length, 4);
        assert_eq!(config.memory.relevant_limit, 2);
        assert_eq!(config.db_path, PathBuf::from("/srv/recall/memory.db"));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_invalid_env_number() {
        let err = Config::resolve(
            RecallConfigFile::default(),
            env_from(&[("RECALL_RELEVANT_LIMIT", "three")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_history_rejected() {
        let err = Config::resolve(
            RecallConfigFile::default(),
            env_from(&[("RECALL_MAX_HISTORY", "0")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::resolve(
            RecallConfigFile::default(),
            env_from(&[("OPENAI_API_KEY", "sk-secret")]),
        )
        .unwrap();

        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}

//! Configuration management for the Lectern course assistant.
//!
//! This module handles loading and merging configuration from multiple
//! sources:
//! - Environment variables (`LECTERN_*`)
//! - Command-line flags
//! - Config files (.lectern/config.yaml)
//!
//! The configuration is workspace-centric, with all state stored in
//! `.lectern/` (the SQLite index, the config file).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Main configuration for document processing, retrieval, and generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Path to the workspace root (contains .lectern/)
    #[serde(skip)]
    pub workspace: PathBuf,

    /// Maximum chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters (must be < chunk_size)
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Maximum number of search results returned per query
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Maximum conversation turns kept per session
    /// (a turn is one message; a user/assistant exchange is two turns)
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,

    /// LLM provider (e.g., "ollama")
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Provider endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Generation model identifier
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    /// Embedding provider ("trigram" for offline, "ollama" for neural)
    #[serde(default = "default_embedding_provider")]
    pub embedding_provider: String,

    /// Embedding model identifier
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Sampling temperature (0.0 for deterministic answers)
    #[serde(default)]
    pub temperature: f32,

    /// Maximum output tokens per generation call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Log level override
    #[serde(default)]
    pub log_level: Option<String>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_max_results() -> usize {
    5
}

fn default_max_history_turns() -> usize {
    4
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_generation_model() -> String {
    "llama3.2".to_string()
}

fn default_embedding_provider() -> String {
    "trigram".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_dim() -> usize {
    384
}

fn default_max_tokens() -> u32 {
    800
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_results: default_max_results(),
            max_history_turns: default_max_history_turns(),
            provider: default_provider(),
            endpoint: default_endpoint(),
            generation_model: default_generation_model(),
            embedding_provider: default_embedding_provider(),
            embedding_model: default_embedding_model(),
            embedding_dim: default_embedding_dim(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            log_level: None,
            no_color: false,
        }
    }
}

impl RagConfig {
    /// Load configuration from environment variables, the workspace config
    /// file, and defaults.
    ///
    /// Environment variables:
    /// - `LECTERN_WORKSPACE`: Override workspace path
    /// - `LECTERN_PROVIDER`: LLM provider
    /// - `LECTERN_MODEL`: Generation model identifier
    /// - `LECTERN_ENDPOINT`: Provider endpoint URL
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("LECTERN_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        // Merge YAML config file if present
        let config_path = config.workspace.join(".lectern/config.yaml");
        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(|e| {
                AppError::Config(format!("Failed to read config file {:?}: {}", config_path, e))
            })?;

            let workspace = config.workspace.clone();
            config = serde_yaml::from_str(&contents).map_err(|e| {
                AppError::Config(format!("Failed to parse config file {:?}: {}", config_path, e))
            })?;
            config.workspace = workspace;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("LECTERN_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("LECTERN_MODEL") {
            config.generation_model = model;
        }

        if let Ok(endpoint) = std::env::var("LECTERN_ENDPOINT") {
            config.endpoint = endpoint;
        }

        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and config files.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.generation_model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose && self.log_level.is_none() {
            self.log_level = Some("debug".to_string());
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate invariants that the rest of the system relies on.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be positive".to_string()));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.embedding_dim == 0 {
            return Err(AppError::Config(
                "embedding_dim must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the path to the .lectern directory.
    pub fn lectern_dir(&self) -> PathBuf {
        self.workspace.join(".lectern")
    }

    /// Get the path to the SQLite index database.
    pub fn index_path(&self) -> PathBuf {
        self.lectern_dir().join("index.db")
    }

    /// Ensure the .lectern directory exists.
    pub fn ensure_lectern_dir(&self) -> AppResult<()> {
        let dir = self.lectern_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .lectern directory: {}", e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.max_results, 5);
        assert_eq!(config.max_history_turns, 4);
        assert_eq!(config.temperature, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let mut config = RagConfig::default();
        config.chunk_overlap = config.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_overrides() {
        let config = RagConfig::default().with_overrides(
            None,
            Some("ollama".to_string()),
            Some("qwen2.5".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(config.provider, "ollama");
        assert_eq!(config.generation_model, "qwen2.5");
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_index_path_under_lectern_dir() {
        let config = RagConfig::default();
        assert!(config.index_path().ends_with(".lectern/index.db"));
    }

    #[test]
    fn test_yaml_defaults_fill_missing_fields() {
        let config: RagConfig = serde_yaml::from_str("chunk_size: 400\n").unwrap();
        assert_eq!(config.chunk_size, 400);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.generation_model, "llama3.2");
    }
}

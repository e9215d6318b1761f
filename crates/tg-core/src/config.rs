//! textgraph configuration management
//!
//! Handles configuration from environment variables and TOML files
//! with defaults that run fully offline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Tagger collaborator
    pub tagger: TaggerConfig,

    /// Token embedding collaborator
    pub embedding: EmbeddingConfig,

    /// Relation scoring
    pub scoring: ScoringConfig,

    /// Graph assembly
    pub graph: GraphConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Tagger
        if let Ok(provider) = std::env::var("TG_TAGGER_PROVIDER") {
            config.tagger.provider = provider.parse()?;
        }
        if let Ok(url) = std::env::var("TG_TAGGER_URL") {
            config.tagger.url = url;
        }

        // Embedder
        if let Ok(provider) = std::env::var("TG_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider.parse()?;
        }
        if let Ok(url) = std::env::var("TG_EMBEDDING_URL") {
            config.embedding.url = url;
        }
        if let Ok(dim) = std::env::var("TG_EMBEDDING_DIMENSION") {
            config.embedding.dimension = parse_value("TG_EMBEDDING_DIMENSION", dim)?;
        }

        // Scoring
        if let Ok(timeout) = std::env::var("TG_PAIR_TIMEOUT_MS") {
            config.scoring.pair_timeout_ms = parse_value("TG_PAIR_TIMEOUT_MS", timeout)?;
        }

        // Graph
        if let Ok(seed) = std::env::var("TG_COLOR_SEED") {
            config.graph.color_seed = Some(parse_value("TG_COLOR_SEED", seed)?);
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = std::env::var("LOG_JSON") {
            config.logging.json_format = parse_value("LOG_JSON", json)?;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        Ok(self.merge(Self::from_env()?))
    }

    /// Take every value of `env_config` that differs from the defaults
    fn merge(mut self, env_config: AppConfig) -> Self {
        if env_config.tagger.provider != TaggerConfig::default().provider {
            self.tagger.provider = env_config.tagger.provider;
        }
        if env_config.tagger.url != TaggerConfig::default().url {
            self.tagger.url = env_config.tagger.url;
        }
        if env_config.embedding.provider != EmbeddingConfig::default().provider {
            self.embedding.provider = env_config.embedding.provider;
        }
        if env_config.embedding.url != EmbeddingConfig::default().url {
            self.embedding.url = env_config.embedding.url;
        }
        if env_config.embedding.dimension != EmbeddingConfig::default().dimension {
            self.embedding.dimension = env_config.embedding.dimension;
        }
        if env_config.scoring.pair_timeout_ms != ScoringConfig::default().pair_timeout_ms {
            self.scoring.pair_timeout_ms = env_config.scoring.pair_timeout_ms;
        }
        if env_config.graph.color_seed.is_some() {
            self.graph.color_seed = env_config.graph.color_seed;
        }
        if env_config.logging.level != LoggingConfig::default().level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format != LoggingConfig::default().json_format {
            self.logging.json_format = env_config.logging.json_format;
        }

        self
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Tagger collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    /// Which tagger implementation to use
    pub provider: TaggerProvider,

    /// Base URL of the tagging service (HTTP provider only)
    pub url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            provider: TaggerProvider::RuleBased,
            url: "http://localhost:8090".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Supported tagger providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaggerProvider {
    RuleBased,
    Http,
}

impl std::str::FromStr for TaggerProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rule_based" | "rule-based" | "rules" => Ok(Self::RuleBased),
            "http" => Ok(Self::Http),
            _ => Err(ConfigError::InvalidValue {
                key: "TG_TAGGER_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Token embedding collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which embedder implementation to use
    pub provider: EmbeddingProvider,

    /// Base URL of the embedding service (HTTP provider only)
    pub url: String,

    /// Vector dimension for the hashing embedder
    pub dimension: usize,

    /// Neighbouring tokens mixed into each hashed vector
    pub context_window: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hashing,
            url: "http://localhost:8091".to_string(),
            dimension: 256,
            context_window: 2,
        }
    }
}

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Hashing,
    Http,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hashing" => Ok(Self::Hashing),
            "http" => Ok(Self::Http),
            _ => Err(ConfigError::InvalidValue {
                key: "TG_EMBEDDING_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Relation scoring configuration.
///
/// The acceptance threshold is fixed; only the per-pair time budget is tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Time budget for a single embedder call, in milliseconds
    pub pair_timeout_ms: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            pair_timeout_ms: 30_000,
        }
    }
}

/// Graph assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GraphConfig {
    /// Seed for node colors; `None` draws from entropy
    pub color_seed: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

//! textgraph core - Domain models, errors and shared configuration
//!
//! This crate defines the types that flow between the pipeline stages:
//! - Tagger output (tokens with part-of-speech tags, typed mentions)
//! - Consolidated entities and gazetteer entries
//! - Scored relations between entity pairs
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, EmbeddingProvider, GraphConfig, LoggingConfig,
    ScoringConfig, TaggerConfig, TaggerProvider,
};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for textgraph operations
#[derive(Error, Debug)]
pub enum TextGraphError {
    #[error("Failed to read input {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Gazetteer error: {0}")]
    Gazetteer(String),

    #[error("Tagger error: {0}")]
    Tagger(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Edge {source_text} -> {target_text} references missing node: {missing}")]
    MissingEndpoint {
        source_text: String,
        target_text: String,
        missing: String,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TextGraphError>;

// ============================================================================
// Tagger Output
// ============================================================================

/// A single token with its part-of-speech tag (Penn Treebank style).
///
/// Offsets are byte offsets into the tagged text. Services that speak
/// character offsets are converted at the client with [`CharOffsets`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub tag: String,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, tag: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            tag: tag.into(),
            start,
            end,
        }
    }

    /// Common noun, singular or plural
    pub fn is_common_noun(&self) -> bool {
        matches!(self.tag.as_str(), "NN" | "NNS")
    }
}

/// A tagged span as reported by the tagger, in text order.
///
/// `label` is the raw tagger label and may carry a BIO prefix (`B-PERSON`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub text: String,
    pub label: String,
    /// Byte offsets, as for [`Token`]
    pub start: usize,
    pub end: usize,
}

impl Mention {
    pub fn new(text: impl Into<String>, label: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            start,
            end,
        }
    }

    /// Canonical type with any BIO prefix removed
    pub fn entity_type(&self) -> &str {
        canonical_type(&self.label)
    }
}

/// Everything the pipeline consumes from one tagger call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedText {
    pub tokens: Vec<Token>,
    pub mentions: Vec<Mention>,
}

/// Strip a BIO-style prefix from a tagger label.
///
/// `"B-PERSON"` becomes `"PERSON"`; labels without a `-` are returned as-is.
pub fn canonical_type(label: &str) -> &str {
    match label.split_once('-') {
        Some((_, suffix)) => suffix,
        None => label,
    }
}

// ============================================================================
// Entities and Relations
// ============================================================================

/// A consolidated named thing. Two entities are the same node when their
/// `text` values are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub entity_type: String,
}

impl Entity {
    pub fn new(text: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entity_type: entity_type.into(),
        }
    }
}

/// A curated `(text, type)` pair that overrides or supplements tagger output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteerEntry {
    pub text: String,
    pub entity_type: String,
}

impl GazetteerEntry {
    pub fn new(text: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entity_type: entity_type.into(),
        }
    }
}

/// A scored, directed relation between two entity texts.
///
/// `strength` is a cosine similarity rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub strength: f32,
    pub target: String,
}

impl Relation {
    pub fn new(source: impl Into<String>, strength: f32, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            strength,
            target: target.into(),
        }
    }

    /// Edge label used by the graph and its renderers
    pub fn label(&self) -> String {
        format!("{:.2}", self.strength)
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{:.2}]-> {}", self.source, self.strength, self.target)
    }
}

// ============================================================================
// Input helpers
// ============================================================================

/// Character index to byte offset lookup for one text
#[derive(Debug, Clone)]
pub struct CharOffsets {
    bytes: Vec<usize>,
}

impl CharOffsets {
    pub fn new(text: &str) -> Self {
        let mut bytes: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        bytes.push(text.len());
        Self { bytes }
    }

    /// Byte offset of the character at `index`. The index one past the last
    /// character maps to the text length.
    pub fn to_byte(&self, index: usize) -> Option<usize> {
        self.bytes.get(index).copied()
    }

    /// Convert a `[start, end)` character span
    pub fn span(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        match (self.to_byte(start), self.to_byte(end)) {
            (Some(start), Some(end)) if start <= end => Some((start, end)),
            _ => None,
        }
    }
}

/// Read a whole input file, mapping I/O failures to [`TextGraphError::Input`]
pub fn read_input(path: impl Into<PathBuf>) -> Result<String> {
    let path = path.into();
    std::fs::read_to_string(&path).map_err(|source| TextGraphError::Input { path, source })
}

// ============================================================================
// Tests
// ============================================================================

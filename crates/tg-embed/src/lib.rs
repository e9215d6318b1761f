//! textgraph embed - Contextual token embedding collaborators
//!
//! The relation scorer treats the embedding model as a black box that maps
//! a (marker-annotated) text to one vector per token, each aligned to the
//! byte range it covers. Services reporting character offsets are rebased
//! by their client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tg_core::{EmbeddingConfig, EmbeddingProvider, Result};

/// One contextual vector for one token of the embedded text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenVector {
    /// Byte offset of the token start
    pub start: usize,
    /// Byte offset one past the token end
    pub end: usize,
    pub vector: Vec<f32>,
}

impl TokenVector {
    /// Whether the token covers any byte of `[start, end)`
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// Trait for contextual token embedders
#[async_trait]
pub trait TokenEmbedder: Send + Sync {
    /// Embed a text, returning vectors in token order
    async fn embed_tokens(&self, text: &str) -> Result<Vec<TokenVector>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;
}

pub mod hashing;
pub mod http;

pub use hashing::HashingEmbedder;
pub use http::HttpTokenEmbedder;

/// Create a token embedder from config
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn TokenEmbedder>> {
    match config.provider {
        EmbeddingProvider::Hashing => Ok(Box::new(HashingEmbedder::from_config(config))),
        EmbeddingProvider::Http => Ok(Box::new(HttpTokenEmbedder::from_config(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_overlap() {
        let token = TokenVector {
            start: 4,
            end: 9,
            vector: vec![1.0],
        };
        assert!(token.overlaps(0, 5));
        assert!(token.overlaps(8, 20));
        assert!(token.overlaps(5, 6));
        assert!(!token.overlaps(0, 4));
        assert!(!token.overlaps(9, 12));
    }

    #[test]
    fn test_factory_default_is_hashing() {
        let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.dimension(), 256);
    }
}

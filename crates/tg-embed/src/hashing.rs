//! Deterministic offline embedder
//!
//! Each token is hashed into a bag of character trigrams, then blended with
//! its neighbours so that the same surface form gets a different vector in a
//! different context. No model weights, no network: useful for running the
//! pipeline end to end without an embedding service, and for tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use regex::Regex;
use tg_core::{EmbeddingConfig, Result, TextGraphError};

use crate::{TokenEmbedder, TokenVector};

/// Hashed-trigram contextual embedder
pub struct HashingEmbedder {
    dimension: usize,
    context_window: usize,
    token_pattern: Regex,
}

impl HashingEmbedder {
    pub fn new(dimension: usize, context_window: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            context_window,
            // Entity markers are kept as single tokens
            token_pattern: Regex::new(r"</?e[12]>|\w+|[^\w\s]")
                .expect("token pattern is a valid regex"),
        }
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.dimension, config.context_window)
    }

    fn bucket(&self, feature: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        (hasher.finish() % self.dimension as u64) as usize
    }

    /// Context-free vector for one token
    fn token_vector(&self, token: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = token.to_lowercase();

        vector[self.bucket(&lowered)] += 1.0;

        let padded: Vec<char> = format!("#{lowered}#").chars().collect();
        for window in padded.windows(3) {
            let trigram: String = window.iter().collect();
            vector[self.bucket(&trigram)] += 1.0;
        }

        normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::from_config(&EmbeddingConfig::default())
    }
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

#[async_trait]
impl TokenEmbedder for HashingEmbedder {
    async fn embed_tokens(&self, text: &str) -> Result<Vec<TokenVector>> {
        let spans: Vec<(usize, usize)> = self
            .token_pattern
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();

        if spans.is_empty() {
            return Ok(Vec::new());
        }

        let base: Vec<Vec<f32>> = spans
            .iter()
            .map(|&(start, end)| self.token_vector(&text[start..end]))
            .collect();

        let mut tokens = Vec::with_capacity(spans.len());
        for (i, &(start, end)) in spans.iter().enumerate() {
            let mut vector = base[i].clone();

            let lo = i.saturating_sub(self.context_window);
            let hi = (i + self.context_window).min(spans.len() - 1);
            for (j, neighbour) in base.iter().enumerate().take(hi + 1).skip(lo) {
                if j == i {
                    continue;
                }
                let weight = 0.5 / i.abs_diff(j) as f32;
                for (acc, value) in vector.iter_mut().zip(neighbour) {
                    *acc += weight * value;
                }
            }

            normalize(&mut vector);
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(TextGraphError::Embedding(format!(
                    "non-finite vector for token at {start}..{end}"
                )));
            }

            tokens.push(TokenVector { start, end, vector });
        }

        Ok(tokens)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_markers_are_single_tokens() {
        let embedder = HashingEmbedder::new(64, 1);
        let text = "<e1>Obama</e1> met <e2>Chicago</e2>";
        let tokens = embedder.embed_tokens(text).await.unwrap();

        let surfaces: Vec<&str> = tokens.iter().map(|t| &text[t.start..t.end]).collect();
        assert_eq!(
            surfaces,
            vec!["<e1>", "Obama", "</e1>", "met", "<e2>", "Chicago", "</e2>"]
        );
        assert!(tokens.iter().all(|t| t.vector.len() == 64));
    }

    #[tokio::test]
    async fn test_deterministic() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed_tokens("Barack Obama met Michelle").await.unwrap();
        let b = embedder.embed_tokens("Barack Obama met Michelle").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_context_changes_vector() {
        let embedder = HashingEmbedder::new(128, 2);
        let first = embedder.embed_tokens("Obama visited Chicago").await.unwrap();
        let second = embedder.embed_tokens("Obama signed treaties").await.unwrap();

        let sim = cosine(&first[0].vector, &second[0].vector);
        assert!(sim < 0.999, "context should perturb the vector, got {sim}");
        assert!(sim > 0.3, "same surface form should stay close, got {sim}");
    }

    #[tokio::test]
    async fn test_vectors_are_unit_length() {
        let embedder = HashingEmbedder::new(32, 2);
        let tokens = embedder.embed_tokens("a b c").await.unwrap();
        for token in tokens {
            let norm = cosine(&token.vector, &token.vector).sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_empty_text() {
        let embedder = HashingEmbedder::default();
        assert!(embedder.embed_tokens("").await.unwrap().is_empty());
        assert!(embedder.embed_tokens("   ").await.unwrap().is_empty());
    }
}

//! HTTP token embedding client
//!
//! Talks to a token-level embedding service (for example a small server
//! wrapping a transformer encoder) that returns one vector per token together
//! with the character offsets the token covers. Offsets are rebased onto
//! byte offsets of the request text before they leave this module.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tg_core::{CharOffsets, EmbeddingConfig, Result, TextGraphError};

use crate::{TokenEmbedder, TokenVector};

/// Token embedding service client
pub struct HttpTokenEmbedder {
    client: Client,
    base_url: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    tokens: Vec<TokenVector>,
}

impl EmbedResponse {
    fn into_byte_offsets(self, text: &str) -> Result<Vec<TokenVector>> {
        let offsets = CharOffsets::new(text);
        self.tokens
            .into_iter()
            .map(|token| {
                let (start, end) = offsets.span(token.start, token.end).ok_or_else(|| {
                    TextGraphError::Embedding(format!(
                        "token span {}..{} outside of request text",
                        token.start, token.end
                    ))
                })?;
                Ok(TokenVector {
                    start,
                    end,
                    vector: token.vector,
                })
            })
            .collect()
    }
}

impl HttpTokenEmbedder {
    /// Create a new client for the service at `base_url`
    pub fn new(base_url: impl Into<String>, dimension: usize) -> Result<Self> {
        Self::with_client(Client::new(), base_url, dimension)
    }

    fn with_client(client: Client, base_url: impl Into<String>, dimension: usize) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.is_empty() {
            return Err(TextGraphError::Embedding(
                "embedding service URL required".to_string(),
            ));
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            dimension,
        })
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| TextGraphError::Embedding(format!("Failed to build HTTP client: {e}")))?;

        Self::with_client(client, config.url.clone(), config.dimension)
    }

    fn endpoint(&self) -> String {
        format!("{}/embed", self.base_url)
    }
}

#[async_trait]
impl TokenEmbedder for HttpTokenEmbedder {
    async fn embed_tokens(&self, text: &str) -> Result<Vec<TokenVector>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(self.endpoint())
            .json(&EmbedRequest { text })
            .send()
            .await
            .map_err(|e| TextGraphError::Embedding(format!("Embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TextGraphError::Embedding(format!(
                "Embedding service error: {error_text}"
            )));
        }

        let result: EmbedResponse = response.json().await.map_err(|e| {
            TextGraphError::Embedding(format!("Failed to parse embedding response: {e}"))
        })?;

        tracing::trace!(tokens = result.tokens.len(), "embedding service response");
        result.into_byte_offsets(text)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let embedder = HttpTokenEmbedder::new("http://localhost:8091/", 768).unwrap();
        assert_eq!(embedder.endpoint(), "http://localhost:8091/embed");
        assert_eq!(embedder.dimension(), 768);
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(HttpTokenEmbedder::new("", 768).is_err());
    }

    #[test]
    fn test_response_shape() {
        let body = r#"{"tokens":[{"start":0,"end":6,"vector":[0.5,0.25]}]}"#;
        let parsed: EmbedResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.tokens.len(), 1);
        assert_eq!(parsed.tokens[0].end, 6);
        assert_eq!(parsed.tokens[0].vector, vec![0.5, 0.25]);
    }

    #[test]
    fn test_char_offsets_rebased_to_bytes() {
        let text = "José <e1>Obama</e1>";
        let body = r#"{"tokens":[
            {"start":0,"end":4,"vector":[1.0]},
            {"start":9,"end":14,"vector":[0.5]}
        ]}"#;
        let parsed: EmbedResponse = serde_json::from_str(body).unwrap();
        let tokens = parsed.into_byte_offsets(text).unwrap();

        assert_eq!(&text[tokens[0].start..tokens[0].end], "José");
        assert_eq!(&text[tokens[1].start..tokens[1].end], "Obama");
    }

    #[test]
    fn test_out_of_range_span_is_error() {
        let body = r#"{"tokens":[{"start":0,"end":99,"vector":[1.0]}]}"#;
        let parsed: EmbedResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            parsed.into_byte_offsets("Obama"),
            Err(TextGraphError::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_text_skips_request() {
        let embedder = HttpTokenEmbedder::new("http://127.0.0.1:9", 4).unwrap();
        let tokens = embedder.embed_tokens("").await.unwrap();
        assert!(tokens.is_empty());
    }
}

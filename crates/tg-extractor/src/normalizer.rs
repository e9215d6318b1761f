//! Text normalization: punctuation stripping and POS-driven truecasing

use tg_core::{Result, Token};

use crate::Tagger;

/// Remove every ASCII punctuation character.
///
/// Characters are deleted, not replaced by whitespace, so words separated
/// only by punctuation fuse together (`"state-of-the-art"` becomes
/// `"stateoftheart"`).
pub fn strip_punctuation(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_punctuation()).collect()
}

/// Capitalize common nouns and rejoin all tokens with single spaces
pub fn truecase_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| {
            if token.is_common_noun() {
                capitalize_first(&token.text)
            } else {
                token.text.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Strips punctuation, then truecases using the tagger's token stream
pub struct TextNormalizer<'a> {
    tagger: &'a dyn Tagger,
}

impl<'a> TextNormalizer<'a> {
    pub fn new(tagger: &'a dyn Tagger) -> Self {
        Self { tagger }
    }

    pub async fn normalize(&self, raw_text: &str) -> Result<String> {
        let stripped = strip_punctuation(raw_text);
        if stripped.trim().is_empty() {
            return Ok(String::new());
        }

        let tagged = self.tagger.tag(&stripped).await?;
        let normalized = truecase_tokens(&tagged.tokens);

        tracing::debug!(
            raw_len = raw_text.len(),
            normalized_len = normalized.len(),
            tokens = tagged.tokens.len(),
            "normalized text"
        );
        Ok(normalized)
    }
}

//! textgraph extractor - Entity and relation extraction pipeline
//!
//! Turns free text into consolidated entities and scored relations:
//! punctuation stripping and truecasing, mention consolidation with a
//! gazetteer overlay, and pairwise contextual-similarity scoring.

use async_trait::async_trait;
use tg_core::{Result, TaggedText};

/// Trait for part-of-speech and named-entity taggers.
///
/// Implementations are created once and shared by reference; they must not
/// be rebuilt per call.
#[async_trait]
pub trait Tagger: Send + Sync {
    /// Tokenize and tag `text`, returning tokens and mentions in text order
    async fn tag(&self, text: &str) -> Result<TaggedText>;
}

pub mod consolidate;
pub mod gazetteer;
pub mod normalizer;
pub mod pipeline;
pub mod relation;
pub mod tagger;

pub use consolidate::{apply_gazetteer, consolidate, EntityConsolidator};
pub use gazetteer::Gazetteer;
pub use normalizer::{strip_punctuation, truecase_tokens, TextNormalizer};
pub use pipeline::{Pipeline, PipelineOutput};
pub use relation::{RelationScorer, ScoringReport, RELATION_THRESHOLD};
pub use tagger::{create_tagger, HttpTagger, RuleBasedTagger};

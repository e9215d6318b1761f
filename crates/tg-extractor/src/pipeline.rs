//! End-to-end extraction pipeline
//!
//! raw text -> normalization -> tagging -> consolidation -> relation scoring
//! -> graph assembly. Stages run one after another; each consumes the
//! previous stage's output whole.

use std::time::Duration;

use tg_core::{AppConfig, Entity, Relation, Result, ScoringConfig};
use tg_embed::{create_embedder, TokenEmbedder};
use tg_graph::{GraphAssembler, KnowledgeGraph};

use crate::{
    consolidate, create_tagger, Gazetteer, RelationScorer, ScoringReport, Tagger, TextNormalizer,
};

/// Everything produced by one pipeline run
#[derive(Debug)]
pub struct PipelineOutput {
    /// Punctuation-free, truecased text the relations were scored over
    pub normalized_text: String,
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    pub scoring_report: ScoringReport,
    pub graph: KnowledgeGraph,
}

/// Owns the injected collaborators for the lifetime of the process
pub struct Pipeline {
    tagger: Box<dyn Tagger>,
    embedder: Box<dyn TokenEmbedder>,
    pair_timeout: Duration,
    assembler: GraphAssembler,
}

impl Pipeline {
    pub fn new(tagger: Box<dyn Tagger>, embedder: Box<dyn TokenEmbedder>) -> Self {
        Self {
            tagger,
            embedder,
            pair_timeout: Duration::from_millis(ScoringConfig::default().pair_timeout_ms),
            assembler: GraphAssembler::default(),
        }
    }

    /// Build collaborators from config
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let tagger = create_tagger(&config.tagger)?;
        let embedder = create_embedder(&config.embedding)?;

        Ok(Self::new(tagger, embedder)
            .with_pair_timeout(Duration::from_millis(config.scoring.pair_timeout_ms))
            .with_assembler(GraphAssembler::from_config(&config.graph)))
    }

    pub fn with_pair_timeout(mut self, timeout: Duration) -> Self {
        self.pair_timeout = timeout;
        self
    }

    pub fn with_assembler(mut self, assembler: GraphAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Normalize, tag and consolidate. Returns the normalized text with the
    /// entities found in it.
    pub async fn extract_entities(
        &self,
        raw_text: &str,
        gazetteer: Option<&Gazetteer>,
    ) -> Result<(String, Vec<Entity>)> {
        let normalized = TextNormalizer::new(self.tagger.as_ref())
            .normalize(raw_text)
            .await?;

        let tagged = self.tagger.tag(&normalized).await?;
        tracing::info!(
            tokens = tagged.tokens.len(),
            mentions = tagged.mentions.len(),
            "tagged normalized text"
        );

        let entities = consolidate(&tagged.mentions, &normalized, gazetteer, raw_text);
        tracing::info!(entities = entities.len(), "consolidated entities");

        Ok((normalized, entities))
    }

    pub async fn run(&self, raw_text: &str, gazetteer: Option<&Gazetteer>) -> Result<PipelineOutput> {
        let (normalized_text, entities) = self.extract_entities(raw_text, gazetteer).await?;

        let scorer = RelationScorer::new(self.embedder.as_ref(), self.pair_timeout);
        let (relations, scoring_report) = scorer.score_relations(&entities, &normalized_text).await;
        tracing::info!(
            pairs = scoring_report.pairs,
            accepted = scoring_report.accepted,
            skipped = scoring_report.skipped_missing
                + scoring_report.skipped_overlap
                + scoring_report.skipped_degenerate,
            failed = scoring_report.failed + scoring_report.timed_out,
            "scored relations"
        );

        let graph = self.assembler.assemble(&entities, &relations)?;

        Ok(PipelineOutput {
            normalized_text,
            entities,
            relations,
            scoring_report,
            graph,
        })
    }
}

//! Relation scoring
//!
//! Scores every unordered entity pair `(i, j)` with `i < j` by the cosine
//! similarity of their contextual representations. For each pair the text is
//! re-marked with `<e1>..</e1>` / `<e2>..</e2>` around the first occurrence of
//! each entity (moving on to later occurrences when the first ones overlap)
//! and embedded from scratch, so a pass costs O(n²) embedder
//! calls for n entities. Pairs are independent; a pair that cannot be located,
//! embedded or pooled is skipped without affecting the rest of the pass.

use std::ops::Range;
use std::time::Duration;

use ndarray::{Array1, Array2, Axis};
use serde::Serialize;
use tg_core::{Entity, Relation, ScoringConfig, TextGraphError};
use tg_embed::{TokenEmbedder, TokenVector};

/// Acceptance threshold. Strengths are compared after rounding to two
/// decimals; a pair must score strictly above this value.
pub const RELATION_THRESHOLD: f32 = 0.90;

const THRESHOLD_HUNDREDTHS: i64 = 90;

const E1_OPEN: &str = "<e1>";
const E1_CLOSE: &str = "</e1>";
const E2_OPEN: &str = "<e2>";
const E2_CLOSE: &str = "</e2>";

/// Per-pass counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoringReport {
    /// Unordered pairs considered
    pub pairs: usize,
    /// Pairs that produced a strength
    pub scored: usize,
    /// Pairs kept as relations
    pub accepted: usize,
    /// Pairs where an entity text does not occur in the text
    pub skipped_missing: usize,
    /// Pairs whose first occurrences overlap
    pub skipped_overlap: usize,
    /// Pairs with no tokens or a degenerate vector for an entity span
    pub skipped_degenerate: usize,
    /// Pairs whose embedder call failed
    pub failed: usize,
    /// Pairs whose embedder call exceeded the time budget
    pub timed_out: usize,
}

/// Text with both entity spans wrapped in markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedPair {
    pub text: String,
    /// Span of the first entity's text inside `text`, markers excluded
    pub e1: Range<usize>,
    /// Span of the second entity's text inside `text`, markers excluded
    pub e2: Range<usize>,
}

enum PairOutcome {
    Scored(i64),
    Missing,
    Overlap,
    Degenerate,
    Failed(TextGraphError),
    TimedOut,
}

/// First-occurrence byte span of `needle` in `text`
pub fn locate(text: &str, needle: &str) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    text.find(needle).map(|start| start..start + needle.len())
}

fn overlapping(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Earliest non-overlapping occurrences of `e1` and `e2`, preferring the
/// first occurrence of `e1`. `None` when every combination overlaps.
pub fn locate_pair(text: &str, e1: &str, e2: &str) -> Option<(Range<usize>, Range<usize>)> {
    let spans = |needle: &str| -> Vec<Range<usize>> {
        text.match_indices(needle)
            .map(|(start, m)| start..start + m.len())
            .collect()
    };
    let (first, second) = (spans(e1), spans(e2));

    first
        .iter()
        .flat_map(|a| second.iter().map(move |b| (a.clone(), b.clone())))
        .find(|(a, b)| !overlapping(a, b))
}

/// Insert entity markers around two non-overlapping spans.
///
/// `e1` always receives the `<e1>` markers, whichever span comes first in the
/// text. Returns `None` when the spans overlap.
pub fn mark_pair(text: &str, e1: Range<usize>, e2: Range<usize>) -> Option<MarkedPair> {
    if overlapping(&e1, &e2) {
        return None;
    }

    let e1_first = e1.start < e2.start;
    let (first, second) = if e1_first { (&e1, &e2) } else { (&e2, &e1) };
    let ((first_open, first_close), (second_open, second_close)) = if e1_first {
        ((E1_OPEN, E1_CLOSE), (E2_OPEN, E2_CLOSE))
    } else {
        ((E2_OPEN, E2_CLOSE), (E1_OPEN, E1_CLOSE))
    };

    let mut marked = String::with_capacity(text.len() + 18);
    marked.push_str(&text[..first.start]);
    marked.push_str(first_open);
    let first_span = marked.len()..marked.len() + first.len();
    marked.push_str(&text[first.clone()]);
    marked.push_str(first_close);
    marked.push_str(&text[first.end..second.start]);
    marked.push_str(second_open);
    let second_span = marked.len()..marked.len() + second.len();
    marked.push_str(&text[second.clone()]);
    marked.push_str(second_close);
    marked.push_str(&text[second.end..]);

    let (e1, e2) = if e1_first {
        (first_span, second_span)
    } else {
        (second_span, first_span)
    };

    Some(MarkedPair {
        text: marked,
        e1,
        e2,
    })
}

/// Mean of every token vector overlapping `span`
pub fn mean_pool(tokens: &[TokenVector], span: &Range<usize>) -> Option<Array1<f32>> {
    let selected: Vec<&TokenVector> = tokens
        .iter()
        .filter(|t| t.overlaps(span.start, span.end))
        .collect();

    let dim = selected.first()?.vector.len();
    if dim == 0 || selected.iter().any(|t| t.vector.len() != dim) {
        return None;
    }

    let flat: Vec<f32> = selected
        .iter()
        .flat_map(|t| t.vector.iter().copied())
        .collect();
    let matrix = Array2::from_shape_vec((selected.len(), dim), flat).ok()?;
    matrix.mean_axis(Axis(0))
}

/// Cosine similarity; `None` for zero-norm or mismatched vectors
pub fn cosine_similarity(a: &Array1<f32>, b: &Array1<f32>) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let norm_a = a.dot(a).sqrt();
    let norm_b = b.dot(b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 || !norm_a.is_finite() || !norm_b.is_finite() {
        return None;
    }
    Some(a.dot(b) / (norm_a * norm_b))
}

fn to_hundredths(similarity: f32) -> i64 {
    (f64::from(similarity) * 100.0).round() as i64
}

/// Pairwise relation scorer over an injected embedder
pub struct RelationScorer<'a> {
    embedder: &'a dyn TokenEmbedder,
    /// Budget per embedder call. It only fires at an await point, so it
    /// bounds I/O-bound embedders (HTTP) but not ones that compute to
    /// completion in a single poll, such as [`tg_embed::HashingEmbedder`].
    pair_timeout: Duration,
}

impl<'a> RelationScorer<'a> {
    pub fn new(embedder: &'a dyn TokenEmbedder, pair_timeout: Duration) -> Self {
        Self {
            embedder,
            pair_timeout,
        }
    }

    pub fn from_config(embedder: &'a dyn TokenEmbedder, config: &ScoringConfig) -> Self {
        Self::new(embedder, Duration::from_millis(config.pair_timeout_ms))
    }

    /// Score all pairs, returning accepted relations in pair enumeration order
    pub async fn score_relations(
        &self,
        entities: &[Entity],
        text: &str,
    ) -> (Vec<Relation>, ScoringReport) {
        let mut relations = Vec::new();
        let mut report = ScoringReport::default();

        for i in 0..entities.len() {
            for j in (i + 1)..entities.len() {
                let (source, target) = (&entities[i], &entities[j]);
                report.pairs += 1;

                match self.score_pair(source, target, text).await {
                    PairOutcome::Scored(hundredths) => {
                        report.scored += 1;
                        if hundredths > THRESHOLD_HUNDREDTHS {
                            report.accepted += 1;
                            relations.push(Relation::new(
                                &source.text,
                                hundredths as f32 / 100.0,
                                &target.text,
                            ));
                        }
                    }
                    PairOutcome::Missing => {
                        tracing::debug!(source = %source.text, target = %target.text, "entity not found in text, skipping pair");
                        report.skipped_missing += 1;
                    }
                    PairOutcome::Overlap => {
                        tracing::debug!(source = %source.text, target = %target.text, "entity spans overlap, skipping pair");
                        report.skipped_overlap += 1;
                    }
                    PairOutcome::Degenerate => {
                        tracing::debug!(source = %source.text, target = %target.text, "no usable vectors for pair");
                        report.skipped_degenerate += 1;
                    }
                    PairOutcome::Failed(err) => {
                        tracing::warn!(source = %source.text, target = %target.text, error = %err, "embedder failed for pair");
                        report.failed += 1;
                    }
                    PairOutcome::TimedOut => {
                        tracing::warn!(
                            source = %source.text,
                            target = %target.text,
                            timeout_ms = self.pair_timeout.as_millis() as u64,
                            "embedder timed out for pair"
                        );
                        report.timed_out += 1;
                    }
                }
            }
        }

        (relations, report)
    }

    async fn score_pair(&self, source: &Entity, target: &Entity, text: &str) -> PairOutcome {
        if locate(text, &source.text).is_none() || locate(text, &target.text).is_none() {
            return PairOutcome::Missing;
        }
        let Some(marked) = locate_pair(text, &source.text, &target.text)
            .and_then(|(e1, e2)| mark_pair(text, e1, e2))
        else {
            return PairOutcome::Overlap;
        };

        let tokens =
            match tokio::time::timeout(self.pair_timeout, self.embedder.embed_tokens(&marked.text))
                .await
            {
                Ok(Ok(tokens)) => tokens,
                Ok(Err(err)) => return PairOutcome::Failed(err),
                Err(_) => return PairOutcome::TimedOut,
            };

        let (Some(v1), Some(v2)) = (
            mean_pool(&tokens, &marked.e1),
            mean_pool(&tokens, &marked.e2),
        ) else {
            return PairOutcome::Degenerate;
        };

        match cosine_similarity(&v1, &v2) {
            Some(similarity) => PairOutcome::Scored(to_hundredths(similarity)),
            None => PairOutcome::Degenerate,
        }
    }
}

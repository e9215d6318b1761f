//! Tagger collaborators
//!
//! Provides two tagging strategies:
//! - HTTP: delegates to an external tagging service (e.g. a spaCy server)
//! - Rule-based: regex tokenization, lexicons and capitalization heuristics,
//!   for offline runs and tests

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tg_core::{
    CharOffsets, Mention, Result, TaggedText, TaggerConfig, TaggerProvider, TextGraphError, Token,
};

use crate::Tagger;

// ============================================================================
// Rule-based tagger
// ============================================================================

const CORPORATE_SUFFIXES: &[&str] = &[
    "Inc", "Corp", "Corporation", "Ltd", "LLC", "Company", "Co", "Group", "Bank", "University",
    "Institute", "Foundation", "Association", "Agency", "Department", "Ministry", "Council",
];

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Albert", "Alice", "Angela", "Barack", "Bill", "Charles", "David", "Donald",
    "Elizabeth", "Emma", "Emmanuel", "George", "Grace", "Hillary", "James", "Jane", "Joe",
    "John", "Joseph", "Kamala", "Linus", "Margaret", "Maria", "Marie", "Mary", "Michael",
    "Michelle", "Nelson", "Olaf", "Robert", "Sarah", "Steve", "Thomas", "Tim", "Vladimir",
    "William", "Winston",
];

const PLACES: &[&str] = &[
    "Africa", "America", "Asia", "Beijing", "Berlin", "Boston", "Brazil", "California",
    "Canada", "Chicago", "China", "England", "Europe", "France", "Germany", "Hawaii", "India",
    "Italy", "Japan", "Kenya", "London", "Los Angeles", "Madrid", "Mexico", "Moscow",
    "New York", "Paris", "Russia", "Seoul", "Spain", "Sydney", "Texas", "Tokyo", "Washington",
];

const MONTHS: &[&str] = &[
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const CLOSED_CLASS: &[(&str, &str)] = &[
    ("a", "DT"), ("an", "DT"), ("the", "DT"), ("this", "DT"), ("that", "DT"), ("these", "DT"),
    ("those", "DT"), ("every", "DT"), ("some", "DT"), ("in", "IN"), ("on", "IN"), ("at", "IN"),
    ("of", "IN"), ("for", "IN"), ("with", "IN"), ("from", "IN"), ("by", "IN"), ("about", "IN"),
    ("after", "IN"), ("before", "IN"), ("into", "IN"), ("during", "IN"), ("to", "TO"),
    ("and", "CC"), ("or", "CC"), ("but", "CC"), ("nor", "CC"), ("he", "PRP"), ("she", "PRP"),
    ("it", "PRP"), ("they", "PRP"), ("we", "PRP"), ("i", "PRP"), ("you", "PRP"), ("him", "PRP"),
    ("them", "PRP"), ("his", "PRP$"), ("her", "PRP$"), ("its", "PRP$"), ("their", "PRP$"),
    ("our", "PRP$"), ("my", "PRP$"), ("is", "VBZ"), ("was", "VBD"), ("are", "VBP"),
    ("were", "VBD"), ("be", "VB"), ("been", "VBN"), ("has", "VBZ"), ("have", "VBP"),
    ("had", "VBD"), ("met", "VBD"), ("said", "VBD"), ("will", "MD"), ("would", "MD"),
    ("can", "MD"), ("could", "MD"), ("not", "RB"), ("then", "RB"), ("also", "RB"),
    ("very", "RB"), ("who", "WP"), ("which", "WDT"), ("when", "WRB"), ("where", "WRB"),
];

/// Rule-based tagger using lexicons and capitalization patterns
pub struct RuleBasedTagger {
    token_pattern: Regex,
    /// Pattern rules (regex -> label)
    patterns: Vec<(Regex, String)>,
    /// Lookup index (lowercase term -> case-insensitive matcher, label)
    dictionary: HashMap<String, (Regex, String)>,
    closed_class: HashMap<&'static str, &'static str>,
    first_names: HashSet<&'static str>,
}

impl RuleBasedTagger {
    /// Create a new rule-based tagger with the default lexicons
    pub fn new() -> Self {
        let mut tagger = Self {
            token_pattern: Regex::new(r"\w+|[^\w\s]").expect("token pattern is a valid regex"),
            patterns: Vec::new(),
            dictionary: HashMap::new(),
            closed_class: CLOSED_CLASS.iter().copied().collect(),
            first_names: FIRST_NAMES.iter().copied().collect(),
        };

        tagger.init_patterns();
        tagger.init_dictionary();
        tagger
    }

    fn init_patterns(&mut self) {
        let months = MONTHS.join("|");
        self.add_pattern(&format!(r"\b(?:{months})\s+\d{{1,2}}\s+\d{{4}}\b"), "DATE");
        self.add_pattern(&format!(r"\b(?:{months})\s+\d{{4}}\b"), "DATE");
        self.add_pattern(r"\b(?:1[5-9]\d{2}|20\d{2})\b", "DATE");
        self.add_pattern(r"\b\d+(?:\.\d+)?\s*(?:percent|%)", "PERCENT");
    }

    fn init_dictionary(&mut self) {
        for place in PLACES {
            self.add_term(place, "GPE");
        }
    }

    fn add_pattern(&mut self, pattern: &str, label: &str) {
        if let Ok(regex) = Regex::new(pattern) {
            self.patterns.push((regex, label.to_string()));
        }
    }

    /// Add a dictionary term; dictionary hits take precedence over heuristics
    pub fn add_term(&mut self, term: &str, label: &str) {
        let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
        let left = if is_word(term.chars().next()) { r"\b" } else { "" };
        let right = if is_word(term.chars().next_back()) { r"\b" } else { "" };
        let pattern = format!("(?i){left}{}{right}", regex::escape(term));
        if let Ok(regex) = Regex::new(&pattern) {
            self.dictionary
                .insert(term.to_lowercase(), (regex, label.to_string()));
        }
    }

    /// Builder form of [`Self::add_term`]
    pub fn with_term(mut self, term: &str, label: &str) -> Self {
        self.add_term(term, label);
        self
    }

    fn tokenize(&self, text: &str) -> Vec<Token> {
        let spans: Vec<(usize, usize)> = self
            .token_pattern
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();

        let mut tokens = Vec::with_capacity(spans.len());
        for (i, &(start, end)) in spans.iter().enumerate() {
            let word = &text[start..end];
            let sentence_start = i == 0
                || matches!(
                    tokens.last().map(|t: &Token| t.text.as_str()),
                    Some(".") | Some("!") | Some("?")
                );
            let tag = self.pos_tag(word, sentence_start);
            tokens.push(Token::new(word, tag, start, end));
        }
        tokens
    }

    /// Heuristic Penn Treebank tag for a single word
    fn pos_tag(&self, word: &str, sentence_start: bool) -> &'static str {
        let lower = word.to_lowercase();

        if let Some(tag) = self.closed_class.get(lower.as_str()) {
            return *tag;
        }
        if word.chars().all(|c| c.is_ascii_digit()) {
            return "CD";
        }
        if !word.chars().any(char::is_alphanumeric) {
            return ".";
        }

        let capitalized = word.chars().next().is_some_and(char::is_uppercase);
        if capitalized && (!sentence_start || self.is_known_name(word)) {
            return "NNP";
        }

        if lower.ends_with("ing") && lower.len() > 5 {
            "VBG"
        } else if lower.ends_with("ed") && lower.len() > 4 {
            "VBD"
        } else if lower.ends_with("ly") && lower.len() > 4 {
            "RB"
        } else if lower.ends_with('s') && !lower.ends_with("ss") && lower.len() > 3 {
            "NNS"
        } else {
            "NN"
        }
    }

    fn is_known_name(&self, word: &str) -> bool {
        self.first_names.contains(word)
            || self.dictionary.contains_key(&word.to_lowercase())
            || MONTHS.contains(&word)
    }

    fn extract_by_patterns(&self, text: &str) -> Vec<Mention> {
        let mut mentions = Vec::new();
        for (regex, label) in &self.patterns {
            for mat in regex.find_iter(text) {
                mentions.push(Mention::new(mat.as_str(), label, mat.start(), mat.end()));
            }
        }
        mentions
    }

    /// Matches run against the original text so offsets never shift
    fn extract_by_dictionary(&self, text: &str) -> Vec<Mention> {
        let mut mentions = Vec::new();
        for (regex, label) in self.dictionary.values() {
            for mat in regex.find_iter(text) {
                mentions.push(Mention::new(mat.as_str(), label, mat.start(), mat.end()));
            }
        }
        mentions
    }

    /// Mentions for runs of proper nouns not covered by patterns or dictionary
    fn extract_proper_noun_runs(&self, text: &str, tokens: &[Token]) -> Vec<Mention> {
        let mut mentions = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            if tokens[i].tag != "NNP" {
                i += 1;
                continue;
            }

            let mut j = i;
            while j + 1 < tokens.len() && tokens[j + 1].tag == "NNP" {
                j += 1;
            }
            let run = &tokens[i..=j];
            let last = &run[run.len() - 1];

            if CORPORATE_SUFFIXES.contains(&last.text.as_str()) {
                let (start, end) = (run[0].start, last.end);
                mentions.push(Mention::new(&text[start..end], "ORG", start, end));
            } else if run.len() > 1 || self.first_names.contains(run[0].text.as_str()) {
                // Person names are reported one word at a time
                for token in run {
                    mentions.push(Mention::new(&token.text, "PERSON", token.start, token.end));
                }
            } else {
                mentions.push(Mention::new(&run[0].text, "MISC", run[0].start, run[0].end));
            }

            i = j + 1;
        }

        mentions
    }

    /// Remove overlapping mentions; earlier sources win, then longer spans
    fn deduplicate(&self, mut mentions: Vec<(usize, Mention)>) -> Vec<Mention> {
        mentions.sort_by(|(pa, a), (pb, b)| {
            pa.cmp(pb)
                .then(a.start.cmp(&b.start))
                .then((b.end - b.start).cmp(&(a.end - a.start)))
        });

        let mut result: Vec<Mention> = Vec::new();
        let mut covered: HashSet<usize> = HashSet::new();

        for (_, mention) in mentions {
            let overlaps = (mention.start..mention.end).any(|i| covered.contains(&i));
            if !overlaps {
                covered.extend(mention.start..mention.end);
                result.push(mention);
            }
        }

        result.sort_by_key(|m| m.start);
        result
    }
}

impl Default for RuleBasedTagger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tagger for RuleBasedTagger {
    async fn tag(&self, text: &str) -> Result<TaggedText> {
        let tokens = self.tokenize(text);

        let mut candidates: Vec<(usize, Mention)> = Vec::new();
        candidates.extend(self.extract_by_patterns(text).into_iter().map(|m| (0, m)));
        candidates.extend(self.extract_by_dictionary(text).into_iter().map(|m| (1, m)));
        candidates.extend(
            self.extract_proper_noun_runs(text, &tokens)
                .into_iter()
                .map(|m| (2, m)),
        );

        let mentions = self.deduplicate(candidates);
        tracing::trace!(
            tokens = tokens.len(),
            mentions = mentions.len(),
            "rule-based tagging"
        );

        Ok(TaggedText { tokens, mentions })
    }
}

// ============================================================================
// HTTP tagger
// ============================================================================

/// Client for an external tagging service
pub struct HttpTagger {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct TagRequest<'a> {
    text: &'a str,
}

/// Service response; offsets are character offsets into the request text
#[derive(Debug, Deserialize)]
struct TagResponse {
    tokens: Vec<Token>,
    #[serde(default)]
    entities: Vec<Mention>,
}

impl TagResponse {
    /// Rebase character offsets onto byte offsets of `text`
    fn into_tagged_text(self, text: &str) -> Result<TaggedText> {
        let offsets = CharOffsets::new(text);
        let span = |start: usize, end: usize| {
            offsets.span(start, end).ok_or_else(|| {
                TextGraphError::Tagger(format!(
                    "span {start}..{end} outside of {} characters",
                    text.chars().count()
                ))
            })
        };

        let tokens = self
            .tokens
            .into_iter()
            .map(|token| -> Result<Token> {
                let (start, end) = span(token.start, token.end)?;
                Ok(Token { start, end, ..token })
            })
            .collect::<Result<Vec<_>>>()?;
        let mentions = self
            .entities
            .into_iter()
            .map(|mention| -> Result<Mention> {
                let (start, end) = span(mention.start, mention.end)?;
                Ok(Mention {
                    start,
                    end,
                    ..mention
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TaggedText { tokens, mentions })
    }
}

impl HttpTagger {
    /// Create a new client for the service at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.is_empty() {
            return Err(TextGraphError::Tagger(
                "tagging service URL required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TextGraphError::Tagger(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from config
    pub fn from_config(config: &TaggerConfig) -> Result<Self> {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_secs))
    }

    fn endpoint(&self) -> String {
        format!("{}/tag", self.base_url)
    }
}

#[async_trait]
impl Tagger for HttpTagger {
    async fn tag(&self, text: &str) -> Result<TaggedText> {
        if text.is_empty() {
            return Ok(TaggedText::default());
        }

        let response = self
            .client
            .post(self.endpoint())
            .json(&TagRequest { text })
            .send()
            .await
            .map_err(|e| TextGraphError::Tagger(format!("Tagging request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TextGraphError::Tagger(format!(
                "Tagging service error: {error_text}"
            )));
        }

        let result: TagResponse = response
            .json()
            .await
            .map_err(|e| TextGraphError::Tagger(format!("Failed to parse tagging response: {e}")))?;

        result.into_tagged_text(text)
    }
}

/// Create a tagger from config
pub fn create_tagger(config: &TaggerConfig) -> Result<Box<dyn Tagger>> {
    match config.provider {
        TaggerProvider::RuleBased => Ok(Box::new(RuleBasedTagger::new())),
        TaggerProvider::Http => Ok(Box::new(HttpTagger::from_config(config)?)),
    }
}

// ============================================================================
// Tests
// ============================================================================

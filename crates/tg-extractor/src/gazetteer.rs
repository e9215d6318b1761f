//! Gazetteer file parsing
//!
//! A gazetteer is a tab-separated file of `text \t type \t <ignored>` lines.
//! Lines are trimmed before splitting; anything that does not yield exactly
//! three fields is skipped.

use std::path::Path;

use tg_core::{read_input, GazetteerEntry, Result};

/// Curated list of known entity texts and their authoritative types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gazetteer {
    entries: Vec<GazetteerEntry>,
    skipped_lines: usize,
}

impl Gazetteer {
    /// Build directly from entries
    pub fn from_entries(entries: Vec<GazetteerEntry>) -> Self {
        Self {
            entries,
            skipped_lines: 0,
        }
    }

    /// Parse gazetteer content
    pub fn parse(content: &str) -> Self {
        let mut entries = Vec::new();
        let mut skipped_lines = 0;

        for (line_no, line) in content.lines().enumerate() {
            let fields: Vec<&str> = line.trim().split('\t').collect();
            if let [text, entity_type, _] = fields.as_slice() {
                entries.push(GazetteerEntry::new(*text, *entity_type));
            } else {
                skipped_lines += 1;
                tracing::debug!(
                    line = line_no + 1,
                    fields = fields.len(),
                    "skipping malformed gazetteer line"
                );
            }
        }

        Self {
            entries,
            skipped_lines,
        }
    }

    /// Read and parse a gazetteer file. A missing or unreadable file is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let gazetteer = Self::parse(&read_input(path)?);

        if gazetteer.skipped_lines > 0 {
            tracing::warn!(
                path = %path.display(),
                skipped = gazetteer.skipped_lines,
                "gazetteer contained malformed lines"
            );
        }
        tracing::info!(
            path = %path.display(),
            entries = gazetteer.entries.len(),
            "loaded gazetteer"
        );

        Ok(gazetteer)
    }

    pub fn entries(&self) -> &[GazetteerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lines dropped while parsing
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

//! Entity consolidation
//!
//! Merges fragmented tagger mentions into canonical entities in a single
//! left-to-right pass. A PERSON mention that directly follows another PERSON
//! mention (only whitespace between them) is treated as a further piece of
//! the same multi-word name ("Barack" + "Obama"); any other type is complete
//! as reported. A gazetteer can then override types or inject missing
//! entities.

use tg_core::{Entity, Mention};

use crate::Gazetteer;

const PERSON: &str = "PERSON";

/// State of the consolidation pass
#[derive(Debug, Clone, PartialEq, Eq)]
enum RunState {
    Idle,
    /// Pending person name and the byte offset where its last fragment ends
    AccumulatingPerson { text: String, end: usize },
}

/// Order-dependent mention merger over the text the mentions were tagged in
#[derive(Debug)]
pub struct EntityConsolidator<'a> {
    source: &'a str,
    state: RunState,
    entities: Vec<Entity>,
}

impl<'a> EntityConsolidator<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            state: RunState::Idle,
            entities: Vec::new(),
        }
    }

    /// Whether a mention starting at `start` continues a run ending at `prev_end`.
    ///
    /// Offsets that do not describe a valid gap in the source text (unknown,
    /// overlapping or out of range) count as continuing.
    fn continues_run(&self, prev_end: usize, start: usize) -> bool {
        match self.source.get(prev_end..start) {
            Some(gap) => gap.chars().all(char::is_whitespace),
            None => true,
        }
    }

    /// Feed the next mention in text order
    pub fn push(&mut self, mention: &Mention) {
        let entity_type = mention.entity_type();

        if entity_type != PERSON {
            self.flush();
            self.entities.push(Entity::new(&mention.text, entity_type));
            return;
        }

        let extends = match &self.state {
            RunState::AccumulatingPerson { end, .. } => self.continues_run(*end, mention.start),
            RunState::Idle => false,
        };

        if extends {
            if let RunState::AccumulatingPerson { text, end } = &mut self.state {
                text.push(' ');
                text.push_str(&mention.text);
                *end = mention.end;
            }
        } else {
            self.flush();
            self.state = RunState::AccumulatingPerson {
                text: mention.text.clone(),
                end: mention.end,
            };
        }
    }

    fn flush(&mut self) {
        if let RunState::AccumulatingPerson { text, .. } =
            std::mem::replace(&mut self.state, RunState::Idle)
        {
            if !text.is_empty() {
                self.entities.push(Entity::new(text, PERSON));
            }
        }
    }

    /// End of stream: flush any pending person run and return the entities
    pub fn finish(mut self) -> Vec<Entity> {
        self.flush();
        self.entities
    }
}

/// Overlay gazetteer entries onto consolidated entities.
///
/// An entry whose text matches an entity case-insensitively overwrites the
/// first such entity's type, keeping the entity's own casing. An entry with
/// no match is appended when its text occurs (case-insensitively) in
/// `original_text`; otherwise it is dropped. Appended entries are visible to
/// later entries.
pub fn apply_gazetteer(entities: &mut Vec<Entity>, gazetteer: &Gazetteer, original_text: &str) {
    let text_lower = original_text.to_lowercase();
    let mut overridden = 0usize;
    let mut injected = 0usize;

    for entry in gazetteer.entries() {
        let entry_lower = entry.text.to_lowercase();

        if let Some(entity) = entities
            .iter_mut()
            .find(|e| e.text.to_lowercase() == entry_lower)
        {
            entity.entity_type = entry.entity_type.clone();
            overridden += 1;
        } else if text_lower.contains(&entry_lower) {
            entities.push(Entity::new(&entry.text, &entry.entity_type));
            injected += 1;
        } else {
            tracing::trace!(text = %entry.text, "gazetteer entry not present in text");
        }
    }

    tracing::debug!(overridden, injected, "applied gazetteer");
}

/// Consolidate a mention stream tagged over `tagged_text`, then apply the
/// optional gazetteer against the unnormalized `original_text`
pub fn consolidate(
    mentions: &[Mention],
    tagged_text: &str,
    gazetteer: Option<&Gazetteer>,
    original_text: &str,
) -> Vec<Entity> {
    let mut consolidator = EntityConsolidator::new(tagged_text);
    for mention in mentions {
        consolidator.push(mention);
    }
    let mut entities = consolidator.finish();

    if let Some(gazetteer) = gazetteer {
        apply_gazetteer(&mut entities, gazetteer, original_text);
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tg_core::GazetteerEntry;

    /// Mentions with real offsets, located left to right in `text`
    fn tagged(text: &str, spans: &[(&str, &str)]) -> Vec<Mention> {
        let mut cursor = 0;
        spans
            .iter()
            .map(|(word, label)| {
                let start = cursor + text[cursor..].find(word).unwrap();
                cursor = start + word.len();
                Mention::new(*word, *label, start, cursor)
            })
            .collect()
    }

    fn texts(entities: &[Entity]) -> Vec<(&str, &str)> {
        entities
            .iter()
            .map(|e| (e.text.as_str(), e.entity_type.as_str()))
            .collect()
    }

    #[test]
    fn test_obama_scenario() {
        let text = "Barack Obama met Michelle Obama in Chicago";
        let mentions = tagged(
            text,
            &[
                ("Barack", "PERSON"),
                ("Obama", "PERSON"),
                ("Michelle", "PERSON"),
                ("Obama", "PERSON"),
                ("Chicago", "GPE"),
            ],
        );
        let entities = consolidate(&mentions, text, None, text);

        assert_eq!(
            texts(&entities),
            vec![
                ("Barack Obama", "PERSON"),
                ("Michelle Obama", "PERSON"),
                ("Chicago", "GPE"),
            ]
        );
    }

    #[test]
    fn test_person_runs_split_by_other_types() {
        let text = "Barack Obama Chicago Michelle Obama";
        let mentions = tagged(
            text,
            &[
                ("Barack", "PERSON"),
                ("Obama", "PERSON"),
                ("Chicago", "GPE"),
                ("Michelle", "PERSON"),
                ("Obama", "PERSON"),
            ],
        );
        let entities = consolidate(&mentions, text, None, text);
        assert_eq!(
            texts(&entities),
            vec![
                ("Barack Obama", "PERSON"),
                ("Chicago", "GPE"),
                ("Michelle Obama", "PERSON"),
            ]
        );
    }

    #[test]
    fn test_multiple_spaces_still_adjacent() {
        let text = "Grace   Hopper";
        let mentions = tagged(text, &[("Grace", "PERSON"), ("Hopper", "PERSON")]);
        let entities = consolidate(&mentions, text, None, text);
        assert_eq!(texts(&entities), vec![("Grace Hopper", "PERSON")]);
    }

    #[test]
    fn test_unknown_offsets_merge_consecutive_persons() {
        // Offsets that do not describe a gap fall back to merging the whole run
        let mentions = vec![
            Mention::new("Barack", "PERSON", 0, 0),
            Mention::new("Obama", "PERSON", 0, 0),
            Mention::new("Chicago", "GPE", 0, 0),
        ];
        let entities = consolidate(&mentions, "", None, "");
        assert_eq!(
            texts(&entities),
            vec![("Barack Obama", "PERSON"), ("Chicago", "GPE")]
        );
    }

    #[test]
    fn test_non_person_types_are_never_merged() {
        let text = "Google Alphabet 2019";
        let mentions = tagged(
            text,
            &[("Google", "ORG"), ("Alphabet", "ORG"), ("2019", "DATE")],
        );
        let entities = consolidate(&mentions, text, None, text);
        assert_eq!(
            texts(&entities),
            vec![("Google", "ORG"), ("Alphabet", "ORG"), ("2019", "DATE")]
        );
    }

    #[test]
    fn test_bio_prefix_is_stripped() {
        let text = "Ada Lovelace London";
        let mentions = tagged(
            text,
            &[("Ada", "B-PERSON"), ("Lovelace", "I-PERSON"), ("London", "B-GPE")],
        );
        let entities = consolidate(&mentions, text, None, text);
        assert_eq!(
            texts(&entities),
            vec![("Ada Lovelace", "PERSON"), ("London", "GPE")]
        );
    }

    #[test]
    fn test_empty_stream() {
        assert!(consolidate(&[], "", None, "anything").is_empty());
    }

    #[test]
    fn test_gazetteer_override_keeps_casing() {
        let text = "I like apple";
        let mentions = tagged(text, &[("apple", "ORG")]);
        let gazetteer = Gazetteer::from_entries(vec![GazetteerEntry::new("Apple", "PRODUCT")]);

        let entities = consolidate(&mentions, text, Some(&gazetteer), text);
        assert_eq!(texts(&entities), vec![("apple", "PRODUCT")]);
    }

    #[test]
    fn test_gazetteer_override_first_match_only() {
        let text = "Paris Texas paris";
        let mentions = tagged(
            text,
            &[("Paris", "PERSON"), ("Texas", "GPE"), ("paris", "GPE")],
        );
        let gazetteer = Gazetteer::from_entries(vec![GazetteerEntry::new("PARIS", "CITY")]);

        let entities = consolidate(&mentions, text, Some(&gazetteer), text);
        assert_eq!(
            texts(&entities),
            vec![("Paris", "CITY"), ("Texas", "GPE"), ("paris", "GPE")]
        );
    }

    #[test]
    fn test_gazetteer_injects_entity_present_in_text() {
        let original = "Chicago sits on the shore of lake michigan.";
        let mentions = tagged(original, &[("Chicago", "GPE")]);
        let gazetteer = Gazetteer::from_entries(vec![
            GazetteerEntry::new("Lake Michigan", "LOC"),
            GazetteerEntry::new("Atlantis", "LOC"),
        ]);

        let entities = consolidate(&mentions, original, Some(&gazetteer), original);
        assert_eq!(
            texts(&entities),
            vec![("Chicago", "GPE"), ("Lake Michigan", "LOC")]
        );
    }

    #[test]
    fn test_injected_entry_visible_to_later_entries() {
        let gazetteer = Gazetteer::from_entries(vec![
            GazetteerEntry::new("Acme", "ORG"),
            GazetteerEntry::new("acme", "COMPANY"),
        ]);
        let entities = consolidate(&[], "", Some(&gazetteer), "Acme builds rockets");
        assert_eq!(texts(&entities), vec![("Acme", "COMPANY")]);
    }

    proptest! {
        #[test]
        fn prop_person_only_stream_yields_one_entity(
            names in prop::collection::vec("[A-Z][a-z]{1,8}", 1..12)
        ) {
            let text = names.join(" ");
            let spans: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "PERSON")).collect();
            let mentions = tagged(&text, &spans);
            let entities = consolidate(&mentions, &text, None, &text);

            prop_assert_eq!(entities.len(), 1);
            prop_assert_eq!(&entities[0].text, &text);
            prop_assert_eq!(entities[0].entity_type.as_str(), "PERSON");
        }

        #[test]
        fn prop_non_person_mentions_pass_through(
            labels in prop::collection::vec(prop::sample::select(vec!["ORG", "GPE", "DATE", "PERSON"]), 0..20)
        ) {
            let words: Vec<String> = (0..labels.len()).map(|i| format!("m{i}")).collect();
            let text = words.join(" ");
            let spans: Vec<(&str, &str)> = words
                .iter()
                .zip(&labels)
                .map(|(w, l)| (w.as_str(), *l))
                .collect();
            let mentions = tagged(&text, &spans);
            let entities = consolidate(&mentions, &text, None, &text);

            let non_person_in = labels.iter().filter(|l| **l != "PERSON").count();
            let non_person_out = entities.iter().filter(|e| e.entity_type != "PERSON").count();
            prop_assert_eq!(non_person_in, non_person_out);

            // Adjacent person mentions always end up in a single entity
            for pair in entities.windows(2) {
                prop_assert!(!(pair[0].entity_type == "PERSON" && pair[1].entity_type == "PERSON"));
            }
        }
    }
}

//! Graph assembly from entities and relations

use tg_core::{canonical_type, Entity, GraphConfig, Relation, Result};

use crate::{ColorAssigner, KnowledgeGraph, NodeData};

/// Builds a [`KnowledgeGraph`], coloring nodes by canonical entity type
#[derive(Debug, Clone, Default)]
pub struct GraphAssembler {
    color_seed: Option<u64>,
}

impl GraphAssembler {
    pub fn new(color_seed: Option<u64>) -> Self {
        Self { color_seed }
    }

    pub fn from_config(config: &GraphConfig) -> Self {
        Self::new(config.color_seed)
    }

    /// Add every entity as a node, then every relation as an edge.
    ///
    /// A relation whose endpoint is not an entity is rejected with
    /// [`tg_core::TextGraphError::MissingEndpoint`].
    pub fn assemble(&self, entities: &[Entity], relations: &[Relation]) -> Result<KnowledgeGraph> {
        let mut colors = ColorAssigner::new(self.color_seed);
        let palette = colors.palette(entities.iter().map(|e| canonical_type(&e.entity_type)));

        let mut graph = KnowledgeGraph::new();
        for entity in entities {
            let entity_type = canonical_type(&entity.entity_type);
            let color = palette.get(entity_type).cloned().unwrap_or_default();
            graph.upsert_node(NodeData {
                id: entity.text.clone(),
                label: entity.entity_type.clone(),
                entity_type: entity_type.to_string(),
                color,
            });
        }

        for relation in relations {
            graph.add_relation(relation)?;
        }

        // Anything the palette missed gets its own color
        for idx in graph.node_indices() {
            let node = graph.node_mut(idx);
            if node.color.is_empty() {
                node.color = colors.next_color();
            }
        }

        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            types = palette.len(),
            "assembled knowledge graph"
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use tg_core::TextGraphError;

    fn entities() -> Vec<Entity> {
        vec![
            Entity::new("Barack Obama", "PERSON"),
            Entity::new("Michelle Obama", "PERSON"),
            Entity::new("Chicago", "GPE"),
            Entity::new("Acme", "B-ORG"),
        ]
    }

    #[test]
    fn test_nodes_carry_type_and_color() {
        let graph = GraphAssembler::new(Some(7))
            .assemble(&entities(), &[])
            .unwrap();

        assert_eq!(graph.node_count(), 4);
        let acme = graph.node("Acme").unwrap();
        assert_eq!(acme.label, "B-ORG");
        assert_eq!(acme.entity_type, "ORG");

        let barack = graph.node("Barack Obama").unwrap();
        let michelle = graph.node("Michelle Obama").unwrap();
        let chicago = graph.node("Chicago").unwrap();
        assert_eq!(barack.color, michelle.color);
        assert_ne!(barack.color, chicago.color);
        assert_ne!(chicago.color, acme.color);
        assert!(graph.nodes().all(|n| n.color.len() == 7));
    }

    #[test]
    fn test_edges_from_relations() {
        let relations = vec![
            Relation::new("Barack Obama", 0.95, "Michelle Obama"),
            Relation::new("Barack Obama", 0.92, "Chicago"),
        ];
        let graph = GraphAssembler::default()
            .assemble(&entities(), &relations)
            .unwrap();

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge("Barack Obama", "Chicago").unwrap().label, "0.92");
        assert_eq!(graph.neighbors("Barack Obama"), vec!["Chicago", "Michelle Obama"]);
    }

    #[test]
    fn test_missing_endpoint_rejected() {
        let relations = vec![Relation::new("Barack Obama", 0.95, "Springfield")];
        let err = GraphAssembler::default()
            .assemble(&entities(), &relations)
            .unwrap_err();
        assert!(matches!(err, TextGraphError::MissingEndpoint { .. }));
    }

    #[test]
    fn test_duplicate_entity_text_is_one_node() {
        let entities = vec![Entity::new("Paris", "PERSON"), Entity::new("Paris", "GPE")];
        let graph = GraphAssembler::new(Some(1)).assemble(&entities, &[]).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node("Paris").unwrap().entity_type, "GPE");
    }

    #[test]
    fn test_same_seed_same_colors() {
        let a = GraphAssembler::new(Some(3)).assemble(&entities(), &[]).unwrap();
        let b = GraphAssembler::new(Some(3)).assemble(&entities(), &[]).unwrap();
        let colors = |g: &KnowledgeGraph| -> HashMap<String, String> {
            g.nodes().map(|n| (n.id.clone(), n.color.clone())).collect()
        };
        assert_eq!(colors(&a), colors(&b));
    }

    fn fixture() -> impl Strategy<Value = (Vec<Entity>, Vec<Relation>)> {
        let entity = ("[a-e]{1,2}", prop::sample::select(vec!["PERSON", "GPE", "B-ORG", "DATE"]))
            .prop_map(|(text, ty)| Entity::new(text, ty));
        prop::collection::vec(entity, 1..12).prop_flat_map(|entities| {
            let n = entities.len();
            let relation = (0..n, 0..n, 91u32..=100);
            (Just(entities), prop::collection::vec(relation, 0..20))
        })
        .prop_map(|(entities, picks)| {
            let relations: Vec<Relation> = picks
                .into_iter()
                .map(|(s, t, h)| {
                    Relation::new(&entities[s].text, h as f32 / 100.0, &entities[t].text)
                })
                .collect();
            (entities, relations)
        })
    }

    proptest! {
        #[test]
        fn prop_every_edge_endpoint_is_a_node((entities, relations) in fixture()) {
            let graph = GraphAssembler::new(Some(11)).assemble(&entities, &relations).unwrap();

            for (source, target, _) in graph.edges() {
                prop_assert!(graph.contains_node(source));
                prop_assert!(graph.contains_node(target));
            }
            prop_assert!(graph.edge_count() <= relations.len());
            for node in graph.nodes() {
                prop_assert!(!node.color.is_empty());
            }
        }

        #[test]
        fn prop_each_type_has_one_color((entities, _relations) in fixture()) {
            let graph = GraphAssembler::new(None).assemble(&entities, &[]).unwrap();

            let mut by_type: HashMap<&str, &str> = HashMap::new();
            for node in graph.nodes() {
                let color = by_type.entry(node.entity_type.as_str()).or_insert(node.color.as_str());
                prop_assert_eq!(*color, node.color.as_str());
            }
        }
    }
}

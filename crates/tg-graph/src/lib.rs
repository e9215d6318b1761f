//! textgraph graph - Knowledge graph assembly
//!
//! Builds a directed graph from consolidated entities (nodes keyed by text)
//! and scored relations (at most one edge per ordered pair), backed by
//! `petgraph`, and exports it for rendering.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tg_core::{Relation, Result, TextGraphError};

pub mod assemble;
pub mod color;
pub mod export;

pub use assemble::GraphAssembler;
pub use color::ColorAssigner;

/// Node attributes read by graph consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    /// Entity text; unique across the graph
    pub id: String,
    /// Type as stored on the entity, possibly with a prefix
    pub label: String,
    /// Canonical type
    pub entity_type: String,
    /// `#rrggbb`
    pub color: String,
}

/// Edge attributes read by graph consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Rendered relation strength
    pub label: String,
    /// Full `(source, relation, target)` triple
    pub connection: (String, String, String),
    pub strength: f32,
}

impl From<&Relation> for EdgeData {
    fn from(relation: &Relation) -> Self {
        let label = relation.label();
        Self {
            connection: (
                relation.source.clone(),
                label.clone(),
                relation.target.clone(),
            ),
            label,
            strength: relation.strength,
        }
    }
}

/// Directed entity/relation graph with a text index over its nodes
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<NodeData, EdgeData>,
    index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or overwrite the attributes of the node with the same id
    pub fn upsert_node(&mut self, node: NodeData) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            self.graph[idx] = node;
            return idx;
        }

        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Add or overwrite the edge for `relation.source -> relation.target`.
    ///
    /// Both endpoints must already be nodes.
    pub fn add_relation(&mut self, relation: &Relation) -> Result<EdgeIndex> {
        let missing = |text: &str| TextGraphError::MissingEndpoint {
            source_text: relation.source.clone(),
            target_text: relation.target.clone(),
            missing: text.to_string(),
        };

        let source = *self
            .index
            .get(&relation.source)
            .ok_or_else(|| missing(&relation.source))?;
        let target = *self
            .index
            .get(&relation.target)
            .ok_or_else(|| missing(&relation.target))?;

        Ok(self
            .graph
            .update_edge(source, target, EdgeData::from(relation)))
    }

    pub fn node(&self, id: &str) -> Option<&NodeData> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub(crate) fn node_mut(&mut self, idx: NodeIndex) -> &mut NodeData {
        &mut self.graph[idx]
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn edge(&self, source: &str, target: &str) -> Option<&EdgeData> {
        let source = *self.index.get(source)?;
        let target = *self.index.get(target)?;
        self.graph
            .find_edge(source, target)
            .map(|idx| &self.graph[idx])
    }

    /// Targets of outgoing edges from `id`
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut targets: Vec<&str> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].id.as_str())
            .collect();
        targets.sort_unstable();
        targets
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub(crate) fn node_indices(&self) -> Vec<NodeIndex> {
        self.graph.node_indices().collect()
    }

    /// Edges as `(source, target, data)`
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &EdgeData)> {
        self.graph.edge_references().map(move |edge| {
            (
                self.graph[edge.source()].id.as_str(),
                self.graph[edge.target()].id.as_str(),
                edge.weight(),
            )
        })
    }

    /// Underlying petgraph structure, for algorithms not wrapped here
    pub fn inner(&self) -> &DiGraph<NodeData, EdgeData> {
        &self.graph
    }
}

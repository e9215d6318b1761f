//! Graph export for renderers
//!
//! Two formats: a JSON node/edge list and a Graphviz `digraph`. Both expose
//! the attributes renderers read: `color` and `label` per node, `label` and
//! `connection` per edge.

use serde::Serialize;
use tg_core::Result;

use crate::{KnowledgeGraph, NodeData};

#[derive(Debug, Serialize)]
struct JsonGraph<'a> {
    nodes: Vec<&'a NodeData>,
    edges: Vec<JsonEdge<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonEdge<'a> {
    source: &'a str,
    target: &'a str,
    label: &'a str,
    connection: [&'a str; 3],
}

/// Serialize the graph as `{"nodes": [...], "edges": [...]}`
pub fn to_json(graph: &KnowledgeGraph) -> Result<String> {
    let export = JsonGraph {
        nodes: graph.nodes().collect(),
        edges: graph
            .edges()
            .map(|(source, target, edge)| JsonEdge {
                source,
                target,
                label: &edge.label,
                connection: [
                    edge.connection.0.as_str(),
                    edge.connection.1.as_str(),
                    edge.connection.2.as_str(),
                ],
            })
            .collect(),
    };

    serde_json::to_string_pretty(&export).map_err(|e| anyhow::anyhow!(e).into())
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render the graph in Graphviz DOT syntax
pub fn to_dot(graph: &KnowledgeGraph) -> String {
    let mut out = String::from("digraph knowledge_graph {\n");
    out.push_str("    node [style=filled, shape=ellipse];\n");

    for node in graph.nodes() {
        out.push_str(&format!(
            "    \"{}\" [fillcolor=\"{}\", tooltip=\"{}\"];\n",
            escape(&node.id),
            node.color,
            escape(&node.label)
        ));
    }

    for (source, target, edge) in graph.edges() {
        out.push_str(&format!(
            "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
            escape(source),
            escape(target),
            escape(&edge.label)
        ));
    }

    out.push_str("}\n");
    out
}

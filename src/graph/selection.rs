//! Bounded, rank-based views of the canonical graph for rendering.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::{Edge, Graph, Node, NodeId};

pub const DEFAULT_K_NODES: usize = 100;
pub const DEFAULT_K_EDGES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionBounds {
    pub k_nodes: usize,
    pub k_edges: usize,
}

impl Default for SelectionBounds {
    fn default() -> Self {
        Self {
            k_nodes: DEFAULT_K_NODES,
            k_edges: DEFAULT_K_EDGES,
        }
    }
}

/// Selects the top nodes by occurrence and the top internal edges by confidence.
///
/// The view is a new graph; the canonical graph is only read.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopNSelector {
    bounds: SelectionBounds,
}

impl TopNSelector {
    pub fn new(bounds: SelectionBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> SelectionBounds {
        self.bounds
    }

    pub fn select(&self, graph: &Graph) -> Graph {
        let mut nodes: Vec<&Node> = graph.nodes().iter().collect();
        nodes.sort_by(|a, b| rank_nodes(a, b));
        nodes.truncate(self.bounds.k_nodes);

        let kept: HashSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();

        let mut edges: Vec<&Edge> = graph
            .edges()
            .iter()
            .filter(|e| kept.contains(&e.source) && kept.contains(&e.target))
            .collect();
        edges.sort_by(|a, b| rank_edges(a, b));
        edges.truncate(self.bounds.k_edges);

        log::debug!(
            "Selected view: {}/{} nodes, {}/{} edges",
            nodes.len(),
            graph.nodes().len(),
            edges.len(),
            graph.edges().len()
        );

        Graph::from_parts(
            nodes.into_iter().cloned().collect(),
            edges.into_iter().cloned().collect(),
        )
    }
}

/// Occurrence count descending, then identity key ascending
fn rank_nodes(a: &Node, b: &Node) -> Ordering {
    b.occurrence_count
        .cmp(&a.occurrence_count)
        .then_with(|| a.id.cmp(&b.id))
}

/// Confidence descending, then `(source, target, predicate)` ascending
fn rank_edges(a: &Edge, b: &Edge) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.key().cmp(&b.key()))
}

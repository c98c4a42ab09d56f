//! BFS traversal over the outgoing edges of a built graph.

use std::collections::{HashSet, VecDeque};

use super::{Edge, Graph, NodeId};

/// Traverse the graph breadth-first from `start`.
/// Returns all edges discovered within max_depth hops, each target reached once.
pub fn traverse_graph<'a>(
    graph: &'a Graph,
    start: &NodeId,
    predicates: Option<&[&str]>,
    max_depth: usize,
) -> Vec<&'a Edge> {
    let mut visited: HashSet<&NodeId> = HashSet::new();
    let mut queue = VecDeque::new();
    let mut result = Vec::new();

    let start = match graph.node(start) {
        Some(node) => &node.id,
        None => return result,
    };

    queue.push_back((start, 0));
    visited.insert(start);

    while let Some((node, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }

        let edges = graph
            .outgoing(node)
            .filter(|e| predicates.map_or(true, |p| p.contains(&e.predicate.as_str())));

        for edge in edges {
            if visited.insert(&edge.target) {
                queue.push_back((&edge.target, depth + 1));
                result.push(edge);
            }
        }
    }

    result
}

//! Relationship graph: identity resolution, relation extraction, aggregation
//! and bounded views.
//!
//! Mentions are normalized into identity keys, two extractors propose raw
//! relation candidates per sentence, and the assembler folds everything into
//! an immutable [`Graph`]. Nodes and edges are kept sorted by key so that two
//! builds over the same input compare (and serialize) identically.

mod assembler;
mod cooccurrence;
mod extraction;
mod normalizer;
mod selection;
mod traversal;

pub use assembler::{AssemblyStats, GraphAssembler, PartialGraph};
pub use cooccurrence::{CooccurrenceFallback, PairPredicates, COOCCURRENCE_CONFIDENCE};
pub use extraction::{RelationPatternMatcher, VerbPatterns, PATTERN_CONFIDENCE};
pub use normalizer::{canonical_text, CategoryMap, EntityNormalizer, Normalized, UnmappedPolicy};
pub use selection::{SelectionBounds, TopNSelector, DEFAULT_K_EDGES, DEFAULT_K_NODES};
pub use traversal::traverse_graph;

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::RelgraphError;
use crate::nlp::SentenceId;

/// Closed set of domain categories a mention can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Character,
    Location,
    Organization,
    Event,
    Artifact,
    Facility,
    Group,
    /// Only produced under [`UnmappedPolicy::Unclassified`]
    Unclassified,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Character => "character",
            Category::Location => "location",
            Category::Organization => "organization",
            Category::Event => "event",
            Category::Artifact => "artifact",
            Category::Facility => "facility",
            Category::Group => "group",
            Category::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RelgraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "character" => Ok(Category::Character),
            "location" => Ok(Category::Location),
            "organization" => Ok(Category::Organization),
            "event" => Ok(Category::Event),
            "artifact" => Ok(Category::Artifact),
            "facility" => Ok(Category::Facility),
            "group" => Ok(Category::Group),
            "unclassified" => Ok(Category::Unclassified),
            other => Err(RelgraphError::Config(format!("unknown category: {}", other))),
        }
    }
}

/// Identity key of a node: `(normalized text, category)`.
///
/// Ordered by text, then category. Comparison is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub text: String,
    pub category: Category,
}

impl NodeId {
    pub fn new(text: impl Into<String>, category: Category) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.text)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One normalized entity occurrence in one sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    /// Normalized text (first token for characters)
    pub text: String,
    /// Trimmed surface text as tagged
    pub surface: String,
    pub category: Category,
    pub sentence: SentenceId,
}

impl Mention {
    pub fn id(&self) -> NodeId {
        NodeId::new(self.text.clone(), self.category)
    }

    /// Whether a token's surface text refers to this mention
    pub fn matches(&self, token_text: &str) -> bool {
        self.text == token_text || self.surface == token_text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub category: Category,
    pub occurrence_count: u64,
}

/// Which extractor proposed a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Pattern,
    Cooccurrence,
}

/// Raw, possibly duplicated relation proposed by an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationCandidate {
    pub subject: NodeId,
    pub predicate: String,
    pub object: NodeId,
    pub confidence: f64,
    pub sentence: SentenceId,
    pub source: CandidateSource,
}

impl RelationCandidate {
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source: self.subject.clone(),
            target: self.object.clone(),
            predicate: self.predicate.clone(),
        }
    }
}

/// Aggregation key of an edge: `(source, target, predicate)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source: NodeId,
    pub target: NodeId,
    pub predicate: String,
}

/// Aggregated relation between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub predicate: String,
    /// Mean confidence of all contributing candidates
    pub confidence: f64,
    /// Number of contributing candidates
    pub support_count: u64,
}

impl Edge {
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source: self.source.clone(),
            target: self.target.clone(),
            predicate: self.predicate.clone(),
        }
    }
}

/// Immutable directed graph. Nodes sorted by id, edges by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Graph {
    pub(crate) fn from_parts(mut nodes: Vec<Node>, mut edges: Vec<Edge>) -> Self {
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        edges.sort_by(|a, b| {
            (&a.source, &a.target, &a.predicate).cmp(&(&b.source, &b.target, &b.predicate))
        });
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes
            .binary_search_by(|n| n.id.cmp(id))
            .ok()
            .map(|i| &self.nodes[i])
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn edge(&self, source: &NodeId, target: &NodeId, predicate: &str) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| &e.source == source && &e.target == target && e.predicate == predicate)
    }

    /// Outgoing edges of `source`, in key order
    pub fn outgoing<'a>(&'a self, source: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.source == source)
    }

    /// Render the graph for the visualization layer
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_ordering_is_text_then_category() {
        let a = NodeId::new("Konoha", Category::Location);
        let b = NodeId::new("Konoha", Category::Organization);
        let c = NodeId::new("Naruto", Category::Character);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_node_id_is_case_sensitive() {
        assert_ne!(
            NodeId::new("naruto", Category::Character),
            NodeId::new("Naruto", Category::Character)
        );
    }

    #[test]
    fn test_category_round_trips_through_str() {
        for name in ["character", "location", "organization", "event", "artifact", "facility", "group"] {
            let category: Category = name.parse().unwrap();
            assert_eq!(category.as_str(), name);
        }
        assert!("planet".parse::<Category>().is_err());
    }

    #[test]
    fn test_graph_serializes_ids_as_strings() {
        let naruto = NodeId::new("Naruto", Category::Character);
        let leaf = NodeId::new("Leaf Village", Category::Location);
        let graph = Graph::from_parts(
            vec![Node {
                id: naruto.clone(),
                label: "Naruto".to_string(),
                category: Category::Character,
                occurrence_count: 2,
            }],
            vec![Edge {
                source: naruto,
                target: leaf,
                predicate: "located_in".to_string(),
                confidence: 0.5,
                support_count: 1,
            }],
        );
        let value: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
        assert_eq!(value["nodes"][0]["id"], "character:Naruto");
        assert_eq!(value["nodes"][0]["occurrence_count"], 2);
        assert_eq!(value["edges"][0]["target"], "location:Leaf Village");
        assert_eq!(value["edges"][0]["support_count"], 1);
    }
}

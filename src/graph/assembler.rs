//! Two-phase graph assembly: node occurrence counting, then candidate
//! grouping into aggregated edges.
//!
//! Workers accumulate into their own [`PartialGraph`] and partials are merged
//! by summation, so the result does not depend on how sentences were split
//! across workers or in which order partials arrive.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::{Edge, EdgeKey, Graph, Mention, Node, NodeId, RelationCandidate};
use crate::error::RelgraphError;

/// Confidence contributions of one edge group, counted per distinct value.
///
/// Keyed by the value's bit pattern so the final sum is taken in a fixed
/// order no matter how contributions were merged.
#[derive(Debug, Clone, Default, PartialEq)]
struct ConfidenceTally {
    by_value: BTreeMap<u64, u64>,
}

impl ConfidenceTally {
    fn add(&mut self, confidence: f64, count: u64) {
        *self.by_value.entry(confidence.to_bits()).or_insert(0) += count;
    }

    fn merge(&mut self, other: ConfidenceTally) {
        for (bits, count) in other.by_value {
            *self.by_value.entry(bits).or_insert(0) += count;
        }
    }

    fn count(&self) -> u64 {
        self.by_value.values().sum()
    }

    /// Arithmetic mean; groups always hold at least one contribution
    fn mean(&self) -> f64 {
        let total: f64 = self
            .by_value
            .iter()
            .map(|(bits, count)| f64::from_bits(*bits) * *count as f64)
            .sum();
        total / self.count() as f64
    }
}

/// Merge-safe accumulation of node counts and candidate groups.
#[derive(Debug, Clone, Default)]
pub struct PartialGraph {
    occurrences: HashMap<NodeId, u64>,
    groups: HashMap<EdgeKey, ConfidenceTally>,
    candidates: u64,
}

impl PartialGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence per distinct identity key in the sentence.
    pub fn add_sentence(&mut self, mentions: &[Mention]) {
        let distinct: HashSet<NodeId> = mentions.iter().map(Mention::id).collect();
        for id in distinct {
            *self.occurrences.entry(id).or_insert(0) += 1;
        }
    }

    pub fn add_candidates<I>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = RelationCandidate>,
    {
        for candidate in candidates {
            self.candidates += 1;
            self.groups
                .entry(candidate.key())
                .or_default()
                .add(candidate.confidence, 1);
        }
    }

    pub fn merge(&mut self, other: PartialGraph) {
        for (id, count) in other.occurrences {
            *self.occurrences.entry(id).or_insert(0) += count;
        }
        for (key, tally) in other.groups {
            self.groups.entry(key).or_default().merge(tally);
        }
        self.candidates += other.candidates;
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty() && self.groups.is_empty()
    }
}

/// Counters describing one assembly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub nodes: usize,
    pub edges: usize,
    pub candidates: u64,
    /// Candidates dropped because an endpoint was not a known node
    pub skipped_candidates: u64,
}

/// Owns the in-progress collections for exactly one build.
#[derive(Debug, Default)]
pub struct GraphAssembler {
    partial: PartialGraph,
}

impl GraphAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sentence(&mut self, mentions: &[Mention]) {
        self.partial.add_sentence(mentions);
    }

    pub fn add_candidates<I>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = RelationCandidate>,
    {
        self.partial.add_candidates(candidates);
    }

    /// Fold a worker's partial into this build
    pub fn absorb(&mut self, partial: PartialGraph) {
        self.partial.merge(partial);
    }

    /// Freeze the build into an immutable graph.
    ///
    /// Candidate groups referencing an unknown node are dropped and counted;
    /// they never fail the build.
    pub fn finish(self) -> (Graph, AssemblyStats) {
        let PartialGraph {
            occurrences,
            groups,
            candidates,
        } = self.partial;

        let mut stats = AssemblyStats {
            candidates,
            ..AssemblyStats::default()
        };

        let mut edges = Vec::with_capacity(groups.len());
        for (key, tally) in groups {
            if !occurrences.contains_key(&key.source) || !occurrences.contains_key(&key.target) {
                let skipped = RelgraphError::MissingEndpoint {
                    subject: key.source.to_string(),
                    object: key.target.to_string(),
                };
                log::warn!("Skipping {} candidate(s) '{}': {}", tally.count(), key.predicate, skipped);
                stats.skipped_candidates += tally.count();
                continue;
            }
            edges.push(Edge {
                confidence: tally.mean(),
                support_count: tally.count(),
                source: key.source,
                target: key.target,
                predicate: key.predicate,
            });
        }

        let nodes: Vec<Node> = occurrences
            .into_iter()
            .map(|(id, occurrence_count)| Node {
                label: id.text.clone(),
                category: id.category,
                id,
                occurrence_count,
            })
            .collect();

        stats.nodes = nodes.len();
        stats.edges = edges.len();
        log::debug!(
            "Assembled graph: {} nodes, {} edges from {} candidates ({} skipped)",
            stats.nodes,
            stats.edges,
            stats.candidates,
            stats.skipped_candidates
        );

        (Graph::from_parts(nodes, edges), stats)
    }
}

//! Low-confidence fallback relations from same-sentence co-occurrence.

use std::collections::HashMap;

use super::{CandidateSource, Category, Mention, RelationCandidate};

/// Confidence assigned to every co-occurrence relation
pub const COOCCURRENCE_CONFIDENCE: f64 = 0.5;

/// Category pair -> predicate table. Lookups match either orientation.
#[derive(Debug, Clone)]
pub struct PairPredicates {
    pairs: HashMap<(Category, Category), String>,
    default_predicate: String,
    confidence: f64,
}

impl PairPredicates {
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = ((Category, Category), S)>,
        S: Into<String>,
    {
        Self {
            pairs: pairs.into_iter().map(|(k, p)| (k, p.into())).collect(),
            default_predicate: "related_to".to_string(),
            confidence: COOCCURRENCE_CONFIDENCE,
        }
    }

    pub fn with_default_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.default_predicate = predicate.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Predicate for a pair, and whether the table declares it in the
    /// opposite orientation (`b -> a`).
    pub fn lookup(&self, a: Category, b: Category) -> (&str, bool) {
        if let Some(predicate) = self.pairs.get(&(a, b)) {
            (predicate.as_str(), false)
        } else if let Some(predicate) = self.pairs.get(&(b, a)) {
            (predicate.as_str(), true)
        } else {
            (self.default_predicate.as_str(), false)
        }
    }
}

impl Default for PairPredicates {
    fn default() -> Self {
        Self::new([
            ((Category::Character, Category::Character), "interacts_with"),
            ((Category::Character, Category::Location), "located_in"),
            ((Category::Character, Category::Organization), "member_of"),
            ((Category::Character, Category::Artifact), "uses"),
        ])
    }
}

pub struct CooccurrenceFallback {
    table: PairPredicates,
}

impl CooccurrenceFallback {
    pub fn new(table: PairPredicates) -> Self {
        Self { table }
    }

    /// One candidate per unordered pair of mentions in the sentence.
    ///
    /// The earlier mention is the source unless the table declares the pair
    /// the other way round, in which case the edge follows the table. Two
    /// mentions of the same entity pair up like any other and yield a
    /// self-loop candidate.
    pub fn extract(&self, mentions: &[Mention]) -> Vec<RelationCandidate> {
        let mut relations = Vec::new();

        if mentions.len() < 2 {
            return relations;
        }

        for (i, first) in mentions.iter().enumerate() {
            for second in &mentions[i + 1..] {
                let (a, b) = (first.id(), second.id());
                let (predicate, reversed) = self.table.lookup(a.category, b.category);
                let (subject, object) = if reversed { (b, a) } else { (a, b) };

                relations.push(RelationCandidate {
                    subject,
                    predicate: predicate.to_string(),
                    object,
                    confidence: self.table.confidence,
                    sentence: first.sentence.clone(),
                    source: CandidateSource::Cooccurrence,
                });
            }
        }

        relations
    }
}

impl Default for CooccurrenceFallback {
    fn default() -> Self {
        Self::new(PairPredicates::default())
    }
}

//! Relation extraction from dependency structure (subject-verb-object).

use std::collections::HashSet;

use super::{CandidateSource, Mention, RelationCandidate};
use crate::nlp::AnnotatedSentence;

/// Confidence assigned to every syntactic relation
pub const PATTERN_CONFIDENCE: f64 = 0.9;

/// Verb vocabulary and dependency labels the matcher looks for.
#[derive(Debug, Clone)]
pub struct VerbPatterns {
    pub verb_pos: HashSet<String>,
    pub action_verbs: HashSet<String>,
    pub subject_deps: HashSet<String>,
    pub object_deps: HashSet<String>,
    pub confidence: f64,
}

fn set_of(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for VerbPatterns {
    fn default() -> Self {
        Self {
            verb_pos: set_of(&["VERB"]),
            action_verbs: set_of(&[
                "attack", "befriend", "betray", "challenge", "chase", "defeat", "fight", "follow",
                "help", "join", "kill", "lead", "leave", "love", "marry", "meet", "protect",
                "rescue", "save", "seal", "summon", "teach", "train", "use", "visit",
            ]),
            subject_deps: set_of(&["nsubj", "nsubjpass"]),
            object_deps: set_of(&["dobj", "obj", "attr"]),
            confidence: PATTERN_CONFIDENCE,
        }
    }
}

pub struct RelationPatternMatcher {
    patterns: VerbPatterns,
}

impl RelationPatternMatcher {
    pub fn new(patterns: VerbPatterns) -> Self {
        Self { patterns }
    }

    /// Extract `subject --lemma--> object` relations from one sentence.
    ///
    /// Every qualifying (subject, object) child pair under an action verb
    /// yields its own candidate; duplicates are left for aggregation.
    pub fn extract(&self, sentence: &AnnotatedSentence, mentions: &[Mention]) -> Vec<RelationCandidate> {
        let mut relations = Vec::new();

        if mentions.len() < 2 {
            return relations;
        }

        let sentence_id = sentence.id();

        for (head, token) in sentence.tokens.iter().enumerate() {
            if !self.patterns.verb_pos.contains(&token.pos)
                || !self.patterns.action_verbs.contains(&token.lemma)
            {
                continue;
            }

            let mut subjects = Vec::new();
            let mut objects = Vec::new();
            for child in sentence.children(head) {
                if self.patterns.subject_deps.contains(&child.dep) {
                    subjects.extend(find_mention(mentions, &child.text));
                } else if self.patterns.object_deps.contains(&child.dep) {
                    objects.extend(find_mention(mentions, &child.text));
                }
            }

            for subject in &subjects {
                for object in &objects {
                    relations.push(RelationCandidate {
                        subject: subject.id(),
                        predicate: token.lemma.clone(),
                        object: object.id(),
                        confidence: self.patterns.confidence,
                        sentence: sentence_id.clone(),
                        source: CandidateSource::Pattern,
                    });
                }
            }
        }

        relations
    }
}

impl Default for RelationPatternMatcher {
    fn default() -> Self {
        Self::new(VerbPatterns::default())
    }
}

/// First mention (in list order) whose text matches the token exactly
fn find_mention<'a>(mentions: &'a [Mention], text: &str) -> Option<&'a Mention> {
    mentions.iter().find(|m| m.matches(text))
}

//! Mention normalization: raw tagger labels to categories, surface text to
//! identity keys.

use serde::Deserialize;
use std::collections::HashMap;

use super::{Category, Mention};
use crate::nlp::{AnnotatedSentence, RawMention, SentenceId};

/// What to do with a mention whose raw label has no category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedPolicy {
    /// Silently exclude the mention
    #[default]
    Drop,
    /// Keep it under [`Category::Unclassified`]
    Unclassified,
}

/// Raw tagger label -> domain category lookup table
#[derive(Debug, Clone)]
pub struct CategoryMap {
    labels: HashMap<String, Category>,
    policy: UnmappedPolicy,
}

impl CategoryMap {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = (S, Category)>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(|(l, c)| (l.into(), c)).collect(),
            policy: UnmappedPolicy::Drop,
        }
    }

    pub fn with_policy(mut self, policy: UnmappedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn lookup(&self, label: &str) -> Option<Category> {
        match self.labels.get(label) {
            Some(category) => Some(*category),
            None => match self.policy {
                UnmappedPolicy::Drop => None,
                UnmappedPolicy::Unclassified => Some(Category::Unclassified),
            },
        }
    }
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self::new([
            ("PERSON", Category::Character),
            ("GPE", Category::Location),
            ("LOC", Category::Location),
            ("ORG", Category::Organization),
            ("EVENT", Category::Event),
            ("WORK_OF_ART", Category::Artifact),
            ("PRODUCT", Category::Artifact),
            ("FAC", Category::Facility),
            ("NORP", Category::Group),
        ])
    }
}

/// Canonical text for a mention of `category`.
///
/// Characters collapse to their first whitespace-delimited token, so
/// "Uzumaki Naruto" and "Uzumaki" share an identity. Two distinct characters
/// sharing a first token merge into one node. Everything else is trimmed.
/// Returns `None` when nothing is left.
pub fn canonical_text(category: Category, text: &str) -> Option<String> {
    let canonical = match category {
        Category::Character => text.split_whitespace().next()?,
        _ => text.trim(),
    };
    if canonical.is_empty() {
        None
    } else {
        Some(canonical.to_string())
    }
}

/// Normalized mentions of one sentence
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub mentions: Vec<Mention>,
    /// Mentions excluded because their label had no category
    pub unmapped: usize,
    /// Mentions excluded because nothing was left after canonicalization.
    /// Always zero for sentences that passed validation.
    pub empty: usize,
}

pub struct EntityNormalizer {
    categories: CategoryMap,
}

impl EntityNormalizer {
    pub fn new(categories: CategoryMap) -> Self {
        Self { categories }
    }

    /// Normalize one mention; `None` if its label is unmapped or its text empty.
    pub fn normalize(&self, raw: &RawMention, sentence: &SentenceId) -> Option<Mention> {
        let category = self.categories.lookup(&raw.label)?;
        let text = canonical_text(category, &raw.text)?;
        Some(Mention {
            text,
            surface: raw.text.trim().to_string(),
            category,
            sentence: sentence.clone(),
        })
    }

    pub fn normalize_sentence(&self, sentence: &AnnotatedSentence) -> Normalized {
        let id = sentence.id();
        let mut out = Normalized::default();

        for raw in &sentence.mentions {
            if self.categories.lookup(&raw.label).is_none() {
                log::debug!("{}: dropping unmapped mention {:?} ({})", id, raw.text, raw.label);
                out.unmapped += 1;
                continue;
            }
            match self.normalize(raw, &id) {
                Some(mention) => out.mentions.push(mention),
                None => {
                    log::debug!("{}: dropping empty mention ({})", id, raw.label);
                    out.empty += 1;
                }
            }
        }

        out
    }
}

impl Default for EntityNormalizer {
    fn default() -> Self {
        Self::new(CategoryMap::default())
    }
}

//! Annotation contract with the external NLP collaborator.
//!
//! The collaborator tokenizes, tags, parses and entity-tags one sentence at a
//! time. This module only defines the shapes it hands back and checks that
//! every required field is present before a sentence enters a build.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RelgraphError, Result};

/// Identifies one sentence across the whole corpus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SentenceId {
    pub episode: String,
    pub index: usize,
}

impl SentenceId {
    pub fn new(episode: impl Into<String>, index: usize) -> Self {
        Self {
            episode: episode.into(),
            index,
        }
    }
}

impl fmt::Display for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.episode, self.index)
    }
}

/// Plain sentence text, before annotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentence {
    pub id: SentenceId,
    pub text: String,
}

/// Entity mention as tagged by the collaborator (label not yet mapped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMention {
    pub text: String,
    #[serde(alias = "categoryLabel")]
    pub label: String,
    #[serde(alias = "sentenceIndex")]
    pub sentence_index: usize,
}

/// Index of a token within its own sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenRef(pub usize);

/// One dependency-parsed token.
///
/// The governor is required; a root token refers to itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    #[serde(alias = "partOfSpeech")]
    pub pos: String,
    pub lemma: String,
    #[serde(alias = "dependencyRelation")]
    pub dep: String,
    #[serde(alias = "governorRef")]
    pub governor: TokenRef,
}

/// Everything the collaborator returns for one sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedSentence {
    pub episode: String,
    pub index: usize,
    #[serde(default)]
    pub mentions: Vec<RawMention>,
    #[serde(default)]
    pub tokens: Vec<Token>,
}

impl AnnotatedSentence {
    pub fn id(&self) -> SentenceId {
        SentenceId::new(self.episode.clone(), self.index)
    }

    /// Syntactic children of the token at `head` (the head itself excluded)
    pub fn children(&self, head: usize) -> impl Iterator<Item = &Token> + '_ {
        self.tokens
            .iter()
            .enumerate()
            .filter(move |(i, t)| *i != head && t.governor == TokenRef(head))
            .map(|(_, t)| t)
    }

    /// Reject sentences with a mention or token missing a required field.
    pub fn validate(&self) -> Result<()> {
        let id = self.id();

        if self.episode.trim().is_empty() {
            return Err(RelgraphError::MalformedInput(format!(
                "sentence {} has no episode id",
                id
            )));
        }

        for (i, mention) in self.mentions.iter().enumerate() {
            if mention.text.trim().is_empty() {
                return Err(RelgraphError::MalformedInput(format!(
                    "{}: mention {} has empty text",
                    id, i
                )));
            }
            if mention.label.trim().is_empty() {
                return Err(RelgraphError::MalformedInput(format!(
                    "{}: mention {} ({}) has empty label",
                    id, i, mention.text
                )));
            }
            if mention.sentence_index != self.index {
                return Err(RelgraphError::MalformedInput(format!(
                    "{}: mention {} ({}) claims sentence index {}",
                    id, i, mention.text, mention.sentence_index
                )));
            }
        }

        for (i, token) in self.tokens.iter().enumerate() {
            let missing = if token.text.is_empty() {
                Some("text")
            } else if token.pos.is_empty() {
                Some("pos")
            } else if token.lemma.is_empty() {
                Some("lemma")
            } else if token.dep.is_empty() {
                Some("dep")
            } else {
                None
            };
            if let Some(field) = missing {
                return Err(RelgraphError::MalformedInput(format!(
                    "{}: token {} has empty {}",
                    id, i, field
                )));
            }
            let TokenRef(gov) = token.governor;
            if gov >= self.tokens.len() {
                return Err(RelgraphError::MalformedInput(format!(
                    "{}: token {} ({}) governed by out-of-range token {}",
                    id, i, token.text, gov
                )));
            }
        }

        Ok(())
    }
}

/// The external NLP collaborator.
///
/// Calls may be slow and are issued concurrently for independent sentences.
pub trait Annotator: Send + Sync {
    fn annotate(&self, sentence: &Sentence) -> Result<AnnotatedSentence>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn mention(text: &str, label: &str, index: usize) -> RawMention {
        RawMention {
            text: text.to_string(),
            label: label.to_string(),
            sentence_index: index,
        }
    }

    pub fn token(text: &str, pos: &str, lemma: &str, dep: &str, governor: usize) -> Token {
        Token {
            text: text.to_string(),
            pos: pos.to_string(),
            lemma: lemma.to_string(),
            dep: dep.to_string(),
            governor: TokenRef(governor),
        }
    }

    /// "Naruto teaches Konohamaru" with both names tagged PERSON
    pub fn naruto_teaches(episode: &str, index: usize) -> AnnotatedSentence {
        AnnotatedSentence {
            episode: episode.to_string(),
            index,
            mentions: vec![
                mention("Naruto", "PERSON", index),
                mention("Konohamaru", "PERSON", index),
            ],
            tokens: vec![
                token("Naruto", "PROPN", "Naruto", "nsubj", 1),
                token("teaches", "VERB", "teach", "ROOT", 1),
                token("Konohamaru", "PROPN", "Konohamaru", "dobj", 1),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_children_excludes_self_loop_root() {
        let sentence = naruto_teaches("ep1", 0);
        let children: Vec<_> = sentence.children(1).map(|t| t.text.as_str()).collect();
        assert_eq!(children, vec!["Naruto", "Konohamaru"]);
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(naruto_teaches("ep1", 3).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_label() {
        let mut sentence = naruto_teaches("ep1", 0);
        sentence.mentions[1].label = String::new();
        let err = sentence.validate().unwrap_err();
        assert!(matches!(err, RelgraphError::MalformedInput(_)));
        assert!(err.to_string().contains("empty label"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_governor() {
        let mut sentence = naruto_teaches("ep1", 0);
        sentence.tokens[0].governor = TokenRef(9);
        assert!(sentence.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_mismatched_sentence_index() {
        let mut sentence = naruto_teaches("ep1", 0);
        sentence.mentions[0].sentence_index = 4;
        assert!(sentence.validate().is_err());
    }

    #[test]
    fn test_token_accepts_collaborator_field_names() {
        let json = r#"{"text":"teaches","partOfSpeech":"VERB","lemma":"teach","dependencyRelation":"ROOT","governorRef":1}"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.pos, "VERB");
        assert_eq!(token.governor, TokenRef(1));
    }

    #[test]
    fn test_token_without_governor_is_rejected() {
        let json = r#"{"text":"teaches","pos":"VERB","lemma":"teach","dep":"ROOT"}"#;
        let err = serde_json::from_str::<Token>(json).unwrap_err();
        assert!(err.to_string().contains("governor"));
    }
}

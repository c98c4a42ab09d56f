//! Loading an annotated corpus produced by the NLP collaborator.
//!
//! Layout: `{"episodes": [{"id": "...", "sentences": [{"index", "mentions", "tokens"}]}]}`.
//! Each sentence is decoded on its own, so one malformed sentence is rejected
//! without failing the whole file.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{RelgraphError, Result};
use crate::nlp::{AnnotatedSentence, RawMention, Token};

#[derive(Debug, Deserialize)]
struct CorpusFile {
    episodes: Vec<EpisodeRecord>,
}

#[derive(Debug, Deserialize)]
struct EpisodeRecord {
    id: String,
    #[serde(default)]
    sentences: Vec<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct SentenceRecord {
    index: usize,
    #[serde(default)]
    mentions: Vec<RawMention>,
    #[serde(default)]
    tokens: Vec<Token>,
}

/// A sentence that could not be decoded
#[derive(Debug, Clone)]
pub struct RejectedSentence {
    pub episode: String,
    /// Position within the episode's sentence array
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedCorpus {
    pub sentences: Vec<AnnotatedSentence>,
    pub rejected: Vec<RejectedSentence>,
}

/// Parse an annotated corpus from JSON text
pub fn parse_corpus(content: &str) -> Result<LoadedCorpus> {
    let file: CorpusFile = serde_json::from_str(content)?;
    let mut corpus = LoadedCorpus::default();

    for episode in file.episodes {
        for (position, value) in episode.sentences.into_iter().enumerate() {
            match serde_json::from_value::<SentenceRecord>(value) {
                Ok(record) => corpus.sentences.push(AnnotatedSentence {
                    episode: episode.id.clone(),
                    index: record.index,
                    mentions: record.mentions,
                    tokens: record.tokens,
                }),
                Err(e) => {
                    let err = RelgraphError::MalformedInput(format!(
                        "{} sentence #{}: {}",
                        episode.id, position, e
                    ));
                    log::warn!("Rejected sentence: {}", err);
                    corpus.rejected.push(RejectedSentence {
                        episode: episode.id.clone(),
                        position,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    log::debug!(
        "Loaded corpus: {} sentences, {} rejected",
        corpus.sentences.len(),
        corpus.rejected.len()
    );

    Ok(corpus)
}

/// Read and parse an annotated corpus file
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<LoadedCorpus> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_corpus(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CORPUS: &str = r#"{
      "episodes": [
        {
          "id": "ep1",
          "sentences": [
            {
              "index": 0,
              "mentions": [
                {"text": "Naruto", "label": "PERSON", "sentence_index": 0},
                {"text": "Konohamaru", "label": "PERSON", "sentence_index": 0}
              ],
              "tokens": [
                {"text": "Naruto", "pos": "PROPN", "lemma": "Naruto", "dep": "nsubj", "governor": 1},
                {"text": "teaches", "pos": "VERB", "lemma": "teach", "dep": "ROOT", "governor": 1},
                {"text": "Konohamaru", "pos": "PROPN", "lemma": "Konohamaru", "dep": "dobj", "governor": 1}
              ]
            },
            {
              "index": 1,
              "mentions": [{"text": "Sasuke", "sentence_index": 1}]
            }
          ]
        },
        {"id": "ep2", "sentences": [{"index": 0}]}
      ]
    }"#;

    #[test]
    fn test_parse_corpus_rejects_only_bad_sentences() {
        let corpus = parse_corpus(CORPUS).unwrap();
        assert_eq!(corpus.sentences.len(), 2);
        assert_eq!(corpus.rejected.len(), 1);
        assert_eq!(corpus.rejected[0].episode, "ep1");
        assert_eq!(corpus.rejected[0].position, 1);
        assert!(corpus.rejected[0].reason.contains("label"));
        assert_eq!(corpus.sentences[1].episode, "ep2");
        assert!(corpus.sentences[1].mentions.is_empty());
    }

    #[test]
    fn test_parse_corpus_rejects_token_without_governor() {
        let json = r#"{"episodes": [{"id": "ep4", "sentences": [
          {"index": 0, "tokens": [{"text": "Gaara", "pos": "PROPN", "lemma": "Gaara", "dep": "ROOT"}]},
          {"index": 1, "tokens": [{"text": "Gaara", "pos": "PROPN", "lemma": "Gaara", "dep": "ROOT", "governor": 0}]}
        ]}]}"#;
        let corpus = parse_corpus(json).unwrap();
        assert_eq!(corpus.sentences.len(), 1);
        assert_eq!(corpus.sentences[0].index, 1);
        assert_eq!(corpus.rejected.len(), 1);
        assert_eq!(corpus.rejected[0].position, 0);
        assert!(corpus.rejected[0].reason.contains("governor"));
    }

    #[test]
    fn test_parse_corpus_invalid_json() {
        let err = parse_corpus("{\"episodes\": [").unwrap_err();
        assert!(matches!(err, RelgraphError::Json(_)));
    }

    #[test]
    fn test_load_corpus_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CORPUS.as_bytes()).unwrap();
        let corpus = load_corpus(file.path()).unwrap();
        assert_eq!(corpus.sentences[0].tokens.len(), 3);
    }

    #[test]
    fn test_load_corpus_missing_file() {
        let err = load_corpus("/nonexistent/corpus.json").unwrap_err();
        assert!(matches!(err, RelgraphError::Io(_)));
    }
}

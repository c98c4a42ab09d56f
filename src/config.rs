use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::RelgraphError;
use crate::graph::{
    Category, CategoryMap, PairPredicates, SelectionBounds, UnmappedPolicy, VerbPatterns,
    COOCCURRENCE_CONFIDENCE, DEFAULT_K_EDGES, DEFAULT_K_NODES, PATTERN_CONFIDENCE,
};

/// Main configuration structure
///
/// Every section is optional; an empty file yields the built-in tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub relgraph: RelgraphConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub patterns: PatternsConfig,
    #[serde(default)]
    pub cooccurrence: CooccurrenceConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelgraphConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RelgraphConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Raw tagger label -> category name
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default)]
    pub unmapped_policy: UnmappedPolicy,
    #[serde(default = "default_categories")]
    pub categories: BTreeMap<String, String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            unmapped_policy: UnmappedPolicy::default(),
            categories: default_categories(),
        }
    }
}

fn default_categories() -> BTreeMap<String, String> {
    [
        ("PERSON", "character"),
        ("GPE", "location"),
        ("LOC", "location"),
        ("ORG", "organization"),
        ("EVENT", "event"),
        ("WORK_OF_ART", "artifact"),
        ("PRODUCT", "artifact"),
        ("FAC", "facility"),
        ("NORP", "group"),
    ]
    .into_iter()
    .map(|(l, c)| (l.to_string(), c.to_string()))
    .collect()
}

/// Subject-verb-object matcher settings
#[derive(Debug, Clone, Deserialize)]
pub struct PatternsConfig {
    #[serde(default = "default_verb_pos")]
    pub verb_pos: Vec<String>,
    #[serde(default = "default_action_verbs")]
    pub action_verbs: Vec<String>,
    #[serde(default = "default_subject_deps")]
    pub subject_deps: Vec<String>,
    #[serde(default = "default_object_deps")]
    pub object_deps: Vec<String>,
    #[serde(default = "default_pattern_confidence")]
    pub confidence: f64,
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            verb_pos: default_verb_pos(),
            action_verbs: default_action_verbs(),
            subject_deps: default_subject_deps(),
            object_deps: default_object_deps(),
            confidence: default_pattern_confidence(),
        }
    }
}

fn sorted(set: std::collections::HashSet<String>) -> Vec<String> {
    let mut items: Vec<String> = set.into_iter().collect();
    items.sort();
    items
}

fn default_verb_pos() -> Vec<String> {
    sorted(VerbPatterns::default().verb_pos)
}

fn default_action_verbs() -> Vec<String> {
    sorted(VerbPatterns::default().action_verbs)
}

fn default_subject_deps() -> Vec<String> {
    sorted(VerbPatterns::default().subject_deps)
}

fn default_object_deps() -> Vec<String> {
    sorted(VerbPatterns::default().object_deps)
}

fn default_pattern_confidence() -> f64 {
    PATTERN_CONFIDENCE
}

/// One `[[cooccurrence.pairs]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct PairRule {
    pub from: String,
    pub to: String,
    pub predicate: String,
}

/// Co-occurrence fallback settings
#[derive(Debug, Clone, Deserialize)]
pub struct CooccurrenceConfig {
    #[serde(default = "default_cooccurrence_confidence")]
    pub confidence: f64,
    #[serde(default = "default_predicate")]
    pub default_predicate: String,
    #[serde(default = "default_pairs")]
    pub pairs: Vec<PairRule>,
}

impl Default for CooccurrenceConfig {
    fn default() -> Self {
        Self {
            confidence: default_cooccurrence_confidence(),
            default_predicate: default_predicate(),
            pairs: default_pairs(),
        }
    }
}

fn default_cooccurrence_confidence() -> f64 {
    COOCCURRENCE_CONFIDENCE
}

fn default_predicate() -> String {
    "related_to".to_string()
}

fn default_pairs() -> Vec<PairRule> {
    [
        ("character", "character", "interacts_with"),
        ("character", "location", "located_in"),
        ("character", "organization", "member_of"),
        ("character", "artifact", "uses"),
    ]
    .into_iter()
    .map(|(from, to, predicate)| PairRule {
        from: from.to_string(),
        to: to.to_string(),
        predicate: predicate.to_string(),
    })
    .collect()
}

/// Bounded view settings
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_k_nodes")]
    pub k_nodes: usize,
    #[serde(default = "default_k_edges")]
    pub k_edges: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            k_nodes: default_k_nodes(),
            k_edges: default_k_edges(),
        }
    }
}

fn default_k_nodes() -> usize {
    DEFAULT_K_NODES
}

fn default_k_edges() -> usize {
    DEFAULT_K_EDGES
}

/// Performance tuning configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformanceConfig {
    /// Per-sentence workers; 0 uses every available core
    #[serde(default)]
    pub max_workers: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RELGRAPH_CONFIG environment variable
    /// 2. ./relgraph.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("RELGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("relgraph.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parse configuration without validating it
    pub fn from_toml_str(s: &str) -> crate::error::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for (name, confidence) in [
            ("patterns.confidence", self.patterns.confidence),
            ("cooccurrence.confidence", self.cooccurrence.confidence),
        ] {
            if !(confidence > 0.0 && confidence <= 1.0) {
                anyhow::bail!("{} must be in (0.0, 1.0], got {}", name, confidence);
            }
        }

        if self.patterns.action_verbs.is_empty() {
            anyhow::bail!("patterns.action_verbs must not be empty");
        }

        if self.patterns.verb_pos.is_empty() {
            anyhow::bail!("patterns.verb_pos must not be empty");
        }

        if self.patterns.subject_deps.is_empty() || self.patterns.object_deps.is_empty() {
            anyhow::bail!("patterns.subject_deps and patterns.object_deps must not be empty");
        }

        if self.cooccurrence.default_predicate.trim().is_empty() {
            anyhow::bail!("cooccurrence.default_predicate must not be empty");
        }

        // Surface unknown category names now rather than at build time
        self.category_map()?;
        self.pair_predicates()?;

        Ok(())
    }

    pub fn category_map(&self) -> crate::error::Result<CategoryMap> {
        let mut labels = Vec::with_capacity(self.normalizer.categories.len());
        for (label, name) in &self.normalizer.categories {
            labels.push((label.clone(), name.parse::<Category>()?));
        }
        Ok(CategoryMap::new(labels).with_policy(self.normalizer.unmapped_policy))
    }

    pub fn verb_patterns(&self) -> VerbPatterns {
        let p = &self.patterns;
        VerbPatterns {
            verb_pos: p.verb_pos.iter().cloned().collect(),
            action_verbs: p.action_verbs.iter().cloned().collect(),
            subject_deps: p.subject_deps.iter().cloned().collect(),
            object_deps: p.object_deps.iter().cloned().collect(),
            confidence: p.confidence,
        }
    }

    pub fn pair_predicates(&self) -> crate::error::Result<PairPredicates> {
        let mut pairs = Vec::with_capacity(self.cooccurrence.pairs.len());
        for rule in &self.cooccurrence.pairs {
            let from: Category = rule.from.parse()?;
            let to: Category = rule.to.parse()?;
            if rule.predicate.trim().is_empty() {
                return Err(RelgraphError::Config(format!(
                    "empty predicate for pair {} -> {}",
                    rule.from, rule.to
                )));
            }
            pairs.push(((from, to), rule.predicate.clone()));
        }
        Ok(PairPredicates::new(pairs)
            .with_default_predicate(self.cooccurrence.default_predicate.clone())
            .with_confidence(self.cooccurrence.confidence))
    }

    pub fn selection_bounds(&self) -> SelectionBounds {
        SelectionBounds {
            k_nodes: self.selection.k_nodes,
            k_edges: self.selection.k_edges,
        }
    }

    /// Number of per-sentence workers to run
    pub fn worker_count(&self) -> usize {
        match self.performance.max_workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const TEST_CONFIG: &str = r#"
[relgraph]
log_level = "debug"

[normalizer]
unmapped_policy = "unclassified"

[normalizer.categories]
PERSON = "character"
VILLAGE = "location"

[patterns]
action_verbs = ["teach", "defeat"]

[cooccurrence]
confidence = 0.4
default_predicate = "co_occurs"

[[cooccurrence.pairs]]
from = "character"
to = "location"
predicate = "lives_in"

[selection]
k_nodes = 10
k_edges = 20

[performance]
max_workers = 3
"#;

    fn with_config_env(config_path: &std::path::Path, f: impl FnOnce()) {
        let original = std::env::var("RELGRAPH_CONFIG").ok();
        std::env::set_var("RELGRAPH_CONFIG", config_path.to_str().unwrap());
        f();
        std::env::remove_var("RELGRAPH_CONFIG");
        if let Some(val) = original {
            std::env::set_var("RELGRAPH_CONFIG", val);
        }
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("relgraph.toml");
        fs::write(&config_path, TEST_CONFIG).unwrap();
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.relgraph.log_level, "debug");
            assert_eq!(config.selection_bounds(), SelectionBounds { k_nodes: 10, k_edges: 20 });
            assert_eq!(config.worker_count(), 3);
            // Unspecified keys keep their defaults
            assert_eq!(config.patterns.confidence, 0.9);
            assert_eq!(config.patterns.subject_deps, vec!["nsubj", "nsubjpass"]);
        });
    }

    #[test]
    fn test_config_tables_are_injected() {
        let config = Config::from_toml_str(TEST_CONFIG).unwrap();
        let categories = config.category_map().unwrap();
        assert_eq!(categories.lookup("VILLAGE"), Some(Category::Location));
        assert_eq!(categories.lookup("GPE"), Some(Category::Unclassified));

        let pairs = config.pair_predicates().unwrap();
        assert_eq!(pairs.lookup(Category::Location, Category::Character), ("lives_in", true));
        assert_eq!(pairs.lookup(Category::Character, Category::Character), ("co_occurs", false));

        let patterns = config.verb_patterns();
        assert!(patterns.action_verbs.contains("defeat"));
        assert!(!patterns.action_verbs.contains("fight"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.selection_bounds(), SelectionBounds::default());
        assert_eq!(
            config.category_map().unwrap().lookup("PERSON"),
            Some(Category::Character)
        );
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_config_rejects_unknown_category() {
        let config = Config::from_toml_str("[normalizer.categories]\nPERSON = \"hero\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown category: hero"));
    }

    #[test]
    fn test_config_rejects_bad_confidence() {
        let config = Config::from_toml_str("[patterns]\nconfidence = 1.5\n").unwrap();
        assert!(config.validate().is_err());
        let config = Config::from_toml_str("[cooccurrence]\nconfidence = 0.0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_empty_vocabulary() {
        let config = Config::from_toml_str("[patterns]\naction_verbs = []\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_invalid_toml() {
        let err = Config::from_toml_str("[selection\nk_nodes = 1").unwrap_err();
        assert!(matches!(err, RelgraphError::Toml(_)));
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("RELGRAPH_CONFIG").ok();
        std::env::set_var("RELGRAPH_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("RELGRAPH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("RELGRAPH_CONFIG", v);
        }
    }
}

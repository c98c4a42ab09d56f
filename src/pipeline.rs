//! Corpus build: per-sentence extraction on blocking worker tasks, merged
//! into one canonical graph.
//!
//! Sentences are independent. Each worker folds its share into a private
//! [`PartialGraph`]; partials are combined once every worker has joined. A
//! failed or cancelled build discards everything: dropping the build future
//! drops the `JoinSet`, which aborts outstanding tasks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::config::Config;
use crate::corpus::LoadedCorpus;
use crate::error::{RelgraphError, Result};
use crate::graph::{
    CooccurrenceFallback, EntityNormalizer, Graph, GraphAssembler, Mention, PartialGraph,
    RelationCandidate, RelationPatternMatcher,
};
use crate::nlp::{AnnotatedSentence, Annotator, Sentence};

/// Everything extracted from one sentence
#[derive(Debug, Clone, Default)]
pub struct SentenceOutcome {
    pub mentions: Vec<Mention>,
    pub candidates: Vec<RelationCandidate>,
    /// Mentions dropped for an unmapped label
    pub unmapped: usize,
}

/// The immutable per-sentence stages, shared by every worker.
pub struct Extractors {
    normalizer: EntityNormalizer,
    patterns: RelationPatternMatcher,
    cooccurrence: CooccurrenceFallback,
}

impl Extractors {
    pub fn new(
        normalizer: EntityNormalizer,
        patterns: RelationPatternMatcher,
        cooccurrence: CooccurrenceFallback,
    ) -> Self {
        Self {
            normalizer,
            patterns,
            cooccurrence,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            EntityNormalizer::new(config.category_map()?),
            RelationPatternMatcher::new(config.verb_patterns()),
            CooccurrenceFallback::new(config.pair_predicates()?),
        ))
    }

    /// Normalize one sentence and run both extractors over it.
    ///
    /// Fails with `MalformedInput` if the sentence is missing a required field.
    pub fn process(&self, sentence: &AnnotatedSentence) -> Result<SentenceOutcome> {
        sentence.validate()?;

        let normalized = self.normalizer.normalize_sentence(sentence);
        let mut candidates = self.patterns.extract(sentence, &normalized.mentions);
        candidates.extend(self.cooccurrence.extract(&normalized.mentions));

        Ok(SentenceOutcome {
            mentions: normalized.mentions,
            candidates,
            unmapped: normalized.unmapped,
        })
    }
}

impl Default for Extractors {
    fn default() -> Self {
        Self::new(
            EntityNormalizer::default(),
            RelationPatternMatcher::default(),
            CooccurrenceFallback::default(),
        )
    }
}

/// Summary of one corpus build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub build_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sentences: usize,
    pub rejected_sentences: usize,
    pub unmapped_mentions: usize,
    pub candidates: u64,
    pub skipped_candidates: u64,
    pub nodes: usize,
    pub edges: usize,
}

/// A finished build: the canonical graph and how it was produced
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    pub graph: Arc<Graph>,
    pub report: BuildReport,
}

#[derive(Debug, Default)]
struct WorkerOutput {
    partial: PartialGraph,
    sentences: usize,
    rejected: usize,
    unmapped: usize,
}

fn run_worker<T, F>(extractors: &Extractors, items: Vec<T>, prepare: &F) -> WorkerOutput
where
    F: Fn(T) -> Result<AnnotatedSentence>,
{
    let mut out = WorkerOutput::default();

    for item in items {
        out.sentences += 1;
        match prepare(item).and_then(|sentence| extractors.process(&sentence)) {
            Ok(outcome) => {
                out.partial.add_sentence(&outcome.mentions);
                out.partial.add_candidates(outcome.candidates);
                out.unmapped += outcome.unmapped;
            }
            Err(e) => {
                log::warn!("Rejected sentence: {}", e);
                out.rejected += 1;
            }
        }
    }

    out
}

/// Runs whole-corpus builds over a bounded set of worker tasks.
pub struct GraphBuilder {
    extractors: Arc<Extractors>,
    workers: usize,
}

impl GraphBuilder {
    pub fn new(extractors: Extractors, workers: usize) -> Self {
        Self {
            extractors: Arc::new(extractors),
            workers: workers.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Extractors::from_config(config)?, config.worker_count()))
    }

    /// Build from sentences the collaborator has already annotated
    pub async fn build(&self, sentences: Vec<AnnotatedSentence>) -> Result<BuiltGraph> {
        self.run(sentences, |sentence| Ok(sentence)).await
    }

    /// Build from a loaded corpus; sentences rejected at load time are reported too
    pub async fn build_corpus(&self, corpus: LoadedCorpus) -> Result<BuiltGraph> {
        let rejected_at_load = corpus.rejected.len();
        let mut built = self.build(corpus.sentences).await?;
        built.report.sentences += rejected_at_load;
        built.report.rejected_sentences += rejected_at_load;
        Ok(built)
    }

    /// Annotate each sentence with `annotator`, concurrently, then build.
    ///
    /// A sentence whose annotation fails is rejected like a malformed one.
    pub async fn annotate_and_build(
        &self,
        annotator: Arc<dyn Annotator>,
        sentences: Vec<Sentence>,
    ) -> Result<BuiltGraph> {
        self.run(sentences, move |sentence: Sentence| {
            let annotated = annotator.annotate(&sentence).map_err(|e| {
                RelgraphError::MalformedInput(format!("{}: annotation failed: {}", sentence.id, e))
            })?;
            if annotated.id() != sentence.id {
                return Err(RelgraphError::MalformedInput(format!(
                    "{}: annotator returned sentence {}",
                    sentence.id,
                    annotated.id()
                )));
            }
            Ok(annotated)
        })
        .await
    }

    async fn run<T, F>(&self, items: Vec<T>, prepare: F) -> Result<BuiltGraph>
    where
        T: Send + 'static,
        F: Fn(T) -> Result<AnnotatedSentence> + Send + Sync + 'static,
    {
        let build_id = Uuid::new_v4();
        let started_at = Utc::now();
        let workers = self.workers.min(items.len()).max(1);

        log::info!(
            "Build {}: {} sentences across {} workers",
            build_id,
            items.len(),
            workers
        );

        let mut chunks: Vec<Vec<T>> = (0..workers).map(|_| Vec::new()).collect();
        for (i, item) in items.into_iter().enumerate() {
            chunks[i % workers].push(item);
        }

        let prepare = Arc::new(prepare);
        let mut tasks = JoinSet::new();
        for chunk in chunks {
            let extractors = Arc::clone(&self.extractors);
            let prepare = Arc::clone(&prepare);
            tasks.spawn_blocking(move || run_worker(&extractors, chunk, prepare.as_ref()));
        }

        let mut assembler = GraphAssembler::new();
        let (mut sentences, mut rejected, mut unmapped) = (0, 0, 0);
        while let Some(joined) = tasks.join_next().await {
            let output = joined
                .map_err(|e| RelgraphError::Worker(format!("build {}: {}", build_id, e)))?;
            sentences += output.sentences;
            rejected += output.rejected;
            unmapped += output.unmapped;
            assembler.absorb(output.partial);
        }

        let (graph, stats) = assembler.finish();
        let report = BuildReport {
            build_id,
            started_at,
            finished_at: Utc::now(),
            sentences,
            rejected_sentences: rejected,
            unmapped_mentions: unmapped,
            candidates: stats.candidates,
            skipped_candidates: stats.skipped_candidates,
            nodes: stats.nodes,
            edges: stats.edges,
        };

        log::info!(
            "Build {} done: {} nodes, {} edges ({} sentences, {} rejected, {} candidates, {} skipped)",
            build_id,
            report.nodes,
            report.edges,
            report.sentences,
            report.rejected_sentences,
            report.candidates,
            report.skipped_candidates
        );

        Ok(BuiltGraph {
            graph: Arc::new(graph),
            report,
        })
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(Extractors::default(), workers)
    }
}

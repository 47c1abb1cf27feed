//! Corpus construction pipeline.
//!
//! [`create_lsr_corpus`] turns a directory holding a `config.json` into a
//! reduced benchmark corpus:
//!
//! ```text
//! config.json ─► runs ─► RunPoolSampler ─► sampled ids
//!                                             │
//!                         SourceCollection ◄──┘
//!                                │ texts
//!                                ▼
//!                       SegmentationStrategy ─► CorpusMaterializer
//!                                                   │ mapping
//!                                                   ▼
//!                                           TruthMaterializer
//! ```
//!
//! Every step checks for its artifacts first, so an interrupted construction
//! resumes at the first missing artifact.

pub mod io;
pub mod materializer;
pub mod truths;

use crate::config::CorpusConfig;
use crate::error::{ConfigError, CorpusError};
use crate::sampling::{CorpusSampler, RunPoolSampler};
use crate::segmentation::create_segmenter;
use crate::source::{load_documents, LocalSourceCollection, SourceCollection};
use crate::trec::{read_trec_run, Run};
use materializer::{CorpusMaterializer, CorpusOutcome};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument};
use truths::{TruthMaterializer, TruthReport};

pub use materializer::{read_corpus, IdentifierMapping};

/// Progress callbacks for long construction stages.
///
/// All methods default to no-ops.
pub trait ConstructionProgress {
    /// A stage with `total` steps begins.
    fn start(&self, _stage: &str, _total: usize) {}
    /// One step of the current stage completed.
    fn advance(&self) {}
    /// The current stage completed.
    fn finish(&self) {}
}

/// Progress sink that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ConstructionProgress for NoProgress {}

/// Summary of one construction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructionReport {
    /// Display form of the sampler, e.g. `top-100-run-pool`.
    pub sampler: String,
    /// Distinct document ids selected by the sampler.
    pub sampled: usize,
    /// Sampled documents found in the source collection.
    pub loaded: usize,
    /// Sampled documents missing from the source collection.
    pub skipped_documents: usize,
    /// Segments written across all documents.
    pub segments: usize,
    /// True when an existing corpus was kept.
    pub corpus_reused: bool,
    pub truths: TruthReport,
}

/// Builds all corpus artifacts in `directory` from its `config.json`.
///
/// The source id must name a local source collection directory, either
/// absolute or relative to `directory`. Use [`create_lsr_corpus_from`] to
/// supply another [`SourceCollection`].
pub fn create_lsr_corpus(
    directory: &Path,
    progress: &dyn ConstructionProgress,
) -> Result<ConstructionReport, CorpusError> {
    let config = CorpusConfig::load(directory)?;
    let source_dir = config
        .source_dir(directory)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: "ir-datasets-id",
            reason: format!("'{}' is not a source collection directory", config.source_id),
        })?;
    let source = LocalSourceCollection::open(&source_dir)?;
    create_lsr_corpus_from(directory, &config, &source, progress)
}

/// Builds all corpus artifacts in `directory` from an explicit source.
#[instrument(skip_all, fields(directory = %directory.display()))]
pub fn create_lsr_corpus_from(
    directory: &Path,
    config: &CorpusConfig,
    source: &dyn SourceCollection,
    progress: &dyn ConstructionProgress,
) -> Result<ConstructionReport, CorpusError> {
    let sampler = RunPoolSampler::new(config.subsample_depth);
    let mut report = ConstructionReport {
        sampler: sampler.to_string(),
        ..Default::default()
    };

    let outcome = materialize_corpus(directory, config, source, &sampler, progress, &mut report)?;
    report.corpus_reused = outcome.reused;

    let queries = source.queries()?;
    let qrels = source.qrels()?;
    report.truths = TruthMaterializer::new(directory).materialize(&queries, &qrels, &outcome.mapping)?;

    info!(
        "Corpus in {} has {} documents",
        directory.display(),
        outcome.mapping.len()
    );
    Ok(report)
}

fn materialize_corpus(
    directory: &Path,
    config: &CorpusConfig,
    source: &dyn SourceCollection,
    sampler: &dyn CorpusSampler,
    progress: &dyn ConstructionProgress,
    report: &mut ConstructionReport,
) -> Result<CorpusOutcome, CorpusError> {
    let mut materializer = CorpusMaterializer::new(directory);
    if materializer.mapping_path().exists() {
        // Sampling and segmentation are skipped entirely.
        return materializer.materialize(std::iter::empty());
    }

    source.open_documents()?;
    let runs = config
        .runs
        .iter()
        .map(|path| read_trec_run(path))
        .collect::<Result<Vec<Run>, _>>()?;
    let sample = sampler.sample_corpus(&config.source_id, &runs);
    report.sampled = sample.len();

    progress.start("Loading documents", sample.len());
    let loaded = load_documents(source, &sample, || progress.advance())?;
    progress.finish();
    report.loaded = loaded.texts.len();
    report.skipped_documents = loaded.skipped;

    // Sorted by original id so that the corpus file order is reproducible.
    let texts: BTreeMap<String, String> = loaded.texts.into_iter().collect();
    let segmenter = create_segmenter(config.passage_unit, config.passage_size);
    info!(
        "Segmenting {} documents with {} (size {})",
        texts.len(),
        segmenter.name(),
        segmenter.passage_size()
    );

    progress.start("Segmenting documents", texts.len());
    let mut documents = Vec::with_capacity(texts.len());
    for (doc_id, text) in texts {
        let segments = segmenter.segment(&text);
        report.segments += segments.len();
        documents.push((doc_id, segments));
        progress.advance();
    }
    progress.finish();

    materializer.materialize(documents)
}

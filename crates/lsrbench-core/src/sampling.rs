//! Corpus subsampling from ranked runs.
//!
//! A sampler reduces a large reference collection to the documents that some
//! retrieval system actually ranked. The sampled ids are a set: callers must
//! not rely on any ordering.

use crate::trec::{Run, RunEntry};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Strategy for selecting the document ids of a reduced corpus.
///
/// `Display` must encode the strategy and its parameters so that the
/// construction log records how a corpus was built.
pub trait CorpusSampler: fmt::Display {
    /// Selects document ids for the source collection `source_id`.
    fn sample_corpus(&self, source_id: &str, runs: &[Run]) -> HashSet<String>;
}

/// Pools the top-`depth` documents of every query in every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPoolSampler {
    depth: usize,
}

impl RunPoolSampler {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl fmt::Display for RunPoolSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "top-{}-run-pool", self.depth)
    }
}

impl CorpusSampler for RunPoolSampler {
    fn sample_corpus(&self, source_id: &str, runs: &[Run]) -> HashSet<String> {
        let mut pool = HashSet::new();

        for run in runs {
            let mut per_query: HashMap<&str, Vec<&RunEntry>> = HashMap::new();
            for entry in &run.entries {
                per_query.entry(entry.query_id.as_str()).or_default().push(entry);
            }

            for entries in per_query.values_mut() {
                // NaN scores rank last.
                entries.sort_by(|a, b| {
                    a.score
                        .is_nan()
                        .cmp(&b.score.is_nan())
                        .then(b.score.total_cmp(&a.score))
                        .then(a.rank.cmp(&b.rank))
                });
                pool.extend(entries.iter().take(self.depth).map(|e| e.doc_id.clone()));
            }
        }

        tracing::info!(
            "{} sampled {} documents of {} from {} runs",
            self,
            pool.len(),
            source_id,
            runs.len()
        );
        pool
    }
}

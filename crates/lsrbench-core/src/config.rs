//! Configuration constants and the corpus construction config.
//!
//! Constants fix the on-disk artifact layout shared by the materializers and
//! the dataset facade. [`CorpusConfig`] is the typed form of the `config.json`
//! that drives one corpus construction run.
//!
//! # Usage
//!
//! ```
//! use lsrbench_core::config::{CORPUS_FILE, DEFAULT_PASSAGE_SIZE};
//!
//! assert_eq!(CORPUS_FILE, "corpus.jsonl.gz");
//! assert_eq!(DEFAULT_PASSAGE_SIZE, 80);
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// Artifact Layout
// =============================================================================

/// Name of the construction config inside a corpus directory.
pub const CONFIG_FILE: &str = "config.json";

/// Gzip-compressed JSONL corpus with opaque document ids.
pub const CORPUS_FILE: &str = "corpus.jsonl.gz";

/// Gzip-compressed JSON object mapping opaque ids to original ids.
pub const MAPPING_FILE: &str = "document-mapping.json.gz";

/// Line-delimited queries (`{"qid", "query"}`).
pub const QUERIES_JSONL_FILE: &str = "queries.jsonl";

/// XML rendition of the queries for legacy consumers.
pub const QUERIES_XML_FILE: &str = "queries.xml";

/// TREC-format relevance judgments.
pub const QRELS_FILE: &str = "qrels.txt";

/// Suffix appended to an archive name to form its extraction directory.
pub const EXTRACTED_SUFFIX: &str = "-extracted";

// =============================================================================
// Segmentation
// =============================================================================

/// Default passage budget per segment.
///
/// Measured in whitespace-separated words unless the config selects
/// characters.
pub const DEFAULT_PASSAGE_SIZE: usize = 80;

/// Delimiter around the segment index in segmented-view document ids.
///
/// Segment 3 of `doc-1` becomes `doc-1___3___`.
pub const SEGMENT_ID_DELIMITER: &str = "___";

// =============================================================================
// Dataset Identifiers
// =============================================================================

/// Namespace prefix accepted in front of any dataset identifier.
pub const DATASET_NAMESPACE: &str = "lsr-benchmark";

/// Suffix that selects the passage-level (segmented) view.
pub const SEGMENTED_SUFFIX: &str = "/segmented";

/// Relevance labels used by every qrel file this crate writes.
pub const QREL_DEFS: [(u8, &str); 2] = [(0, "Not Relevant"), (1, "Relevant")];

/// Environment variable overriding the artifact cache home.
pub const HOME_ENV: &str = "LSR_BENCHMARK_HOME";

// =============================================================================
// Corpus Config
// =============================================================================

/// Unit the passage budget is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassageUnit {
    /// Whitespace-separated words.
    #[default]
    Words,
    /// Unicode scalar values.
    Characters,
}

/// Raw shape of `config.json`. Every field is optional so that missing keys
/// can be reported by name instead of as a serde error.
#[derive(Debug, Deserialize)]
struct RawCorpusConfig {
    #[serde(rename = "ir-datasets-id")]
    ir_datasets_id: Option<String>,
    runs: Option<Vec<PathBuf>>,
    subsample_depth: Option<usize>,
    passage_size: Option<usize>,
    passage_unit: Option<PassageUnit>,
}

/// Validated corpus construction config.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusConfig {
    /// Source collection identifier or directory.
    pub source_id: String,
    /// Run files to pool, already resolved against the config directory.
    pub runs: Vec<PathBuf>,
    /// Per (run, query) depth cutoff.
    pub subsample_depth: usize,
    /// Passage budget per segment.
    pub passage_size: usize,
    pub passage_unit: PassageUnit,
}

impl CorpusConfig {
    /// Parses config JSON. Relative run paths are resolved against `base_dir`.
    pub fn from_json(json: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let raw: RawCorpusConfig = serde_json::from_str(json)?;

        let source_id = raw
            .ir_datasets_id
            .ok_or(ConfigError::MissingKey("ir-datasets-id"))?;
        let runs = raw.runs.ok_or(ConfigError::MissingKey("runs"))?;
        let subsample_depth = raw
            .subsample_depth
            .ok_or(ConfigError::MissingKey("subsample_depth"))?;

        if subsample_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "subsample_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        let passage_size = raw.passage_size.unwrap_or(DEFAULT_PASSAGE_SIZE);
        if passage_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "passage_size",
                reason: "must be at least 1".to_string(),
            });
        }

        let runs = runs
            .into_iter()
            .map(|run| {
                if run.is_absolute() {
                    run
                } else {
                    base_dir.join(run)
                }
            })
            .collect();

        Ok(Self {
            source_id,
            runs,
            subsample_depth,
            passage_size,
            passage_unit: raw.passage_unit.unwrap_or_default(),
        })
    }

    /// Reads `config.json` from a corpus directory.
    pub fn load(directory: &Path) -> Result<Self, ConfigError> {
        let path = directory.join(CONFIG_FILE);
        let json = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_json(&json, directory)
    }

    /// Resolves the source id to a directory when it names one.
    ///
    /// Relative paths are tried against `base_dir` first.
    pub fn source_dir(&self, base_dir: &Path) -> Option<PathBuf> {
        let candidate = PathBuf::from(&self.source_id);
        if candidate.is_absolute() {
            return candidate.is_dir().then_some(candidate);
        }
        let relative = base_dir.join(&candidate);
        if relative.is_dir() {
            return Some(relative);
        }
        candidate.is_dir().then_some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let json = r#"{
            "ir-datasets-id": "disks45/nocr/trec-robust-2004",
            "runs": ["runs/bm25.txt", "/abs/run.txt.gz"],
            "subsample_depth": 100,
            "passage_size": 120,
            "passage_unit": "characters"
        }"#;
        let config = CorpusConfig::from_json(json, Path::new("/data/corpus")).unwrap();

        assert_eq!(config.source_id, "disks45/nocr/trec-robust-2004");
        assert_eq!(
            config.runs,
            vec![
                PathBuf::from("/data/corpus/runs/bm25.txt"),
                PathBuf::from("/abs/run.txt.gz")
            ]
        );
        assert_eq!(config.subsample_depth, 100);
        assert_eq!(config.passage_size, 120);
        assert_eq!(config.passage_unit, PassageUnit::Characters);
    }

    #[test]
    fn test_passage_defaults() {
        let json = r#"{"ir-datasets-id": "x", "runs": [], "subsample_depth": 10}"#;
        let config = CorpusConfig::from_json(json, Path::new(".")).unwrap();
        assert_eq!(config.passage_size, DEFAULT_PASSAGE_SIZE);
        assert_eq!(config.passage_unit, PassageUnit::Words);
    }

    #[test]
    fn test_missing_keys_are_fatal() {
        let cases = [
            (r#"{"runs": [], "subsample_depth": 10}"#, "ir-datasets-id"),
            (r#"{"ir-datasets-id": "x", "subsample_depth": 10}"#, "runs"),
            (r#"{"ir-datasets-id": "x", "runs": []}"#, "subsample_depth"),
        ];
        for (json, key) in cases {
            let err = CorpusConfig::from_json(json, Path::new(".")).unwrap_err();
            assert!(
                matches!(err, ConfigError::MissingKey(k) if k == key),
                "expected missing {key}, got {err}"
            );
        }
    }

    #[test]
    fn test_zero_depth_rejected() {
        let json = r#"{"ir-datasets-id": "x", "runs": [], "subsample_depth": 0}"#;
        let err = CorpusConfig::from_json(json, Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "subsample_depth",
                ..
            }
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = CorpusConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

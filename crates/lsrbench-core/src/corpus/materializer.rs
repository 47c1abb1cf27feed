//! Identifier remapping and corpus persistence.
//!
//! Sampled documents are written under fresh opaque identifiers so that a
//! reduced corpus does not leak which source documents it was built from.
//! The mapping back to the original ids is persisted next to the corpus and
//! is written last: its presence marks the corpus step as complete.

use super::io::{open_reader, write_atomic, JsonlReader};
use crate::config::{CORPUS_FILE, MAPPING_FILE};
use crate::error::CorpusError;
use crate::model::{Document, Segment};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

// =============================================================================
// Identifier Generation
// =============================================================================

/// Source of opaque document identifiers.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Random UUID v4 identifiers in hyphenated lowercase form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().hyphenated().to_string()
    }
}

// =============================================================================
// Identifier Mapping
// =============================================================================

/// Bijection from opaque ids to original source ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMapping {
    opaque_to_original: BTreeMap<String, String>,
    originals: HashSet<String>,
}

impl IdentifierMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pair. Fails if either side is already mapped.
    pub fn insert(
        &mut self,
        opaque: impl Into<String>,
        original: impl Into<String>,
    ) -> Result<(), CorpusError> {
        let opaque = opaque.into();
        let original = original.into();
        if self.originals.contains(&original) {
            return Err(CorpusError::DuplicateIdentifier(original));
        }
        match self.opaque_to_original.entry(opaque) {
            Entry::Occupied(e) => Err(CorpusError::DuplicateIdentifier(e.key().clone())),
            Entry::Vacant(e) => {
                self.originals.insert(original.clone());
                e.insert(original);
                Ok(())
            }
        }
    }

    pub fn original(&self, opaque: &str) -> Option<&str> {
        self.opaque_to_original.get(opaque).map(String::as_str)
    }

    /// Inverse view, original id to opaque id.
    pub fn inverse(&self) -> HashMap<&str, &str> {
        self.opaque_to_original
            .iter()
            .map(|(opaque, original)| (original.as_str(), opaque.as_str()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.opaque_to_original
            .iter()
            .map(|(opaque, original)| (opaque.as_str(), original.as_str()))
    }

    pub fn len(&self) -> usize {
        self.opaque_to_original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opaque_to_original.is_empty()
    }

    /// Reads a mapping file (gzip JSON object `{opaque: original}`).
    pub fn read(path: &Path) -> Result<Self, CorpusError> {
        if !path.exists() {
            return Err(CorpusError::MissingArtifact(path.to_path_buf()));
        }
        let raw: BTreeMap<String, String> = serde_json::from_reader(open_reader(path)?)?;
        let mut mapping = Self::new();
        for (opaque, original) in raw {
            mapping.insert(opaque, original)?;
        }
        Ok(mapping)
    }

    /// Writes the mapping atomically.
    pub fn write(&self, path: &Path) -> Result<(), CorpusError> {
        write_atomic(path, |w| {
            serde_json::to_writer(&mut *w, &self.opaque_to_original)?;
            Ok::<_, CorpusError>(())
        })
    }
}

// =============================================================================
// Corpus Materializer
// =============================================================================

/// Result of a corpus materialization.
#[derive(Debug)]
pub struct CorpusOutcome {
    pub mapping: IdentifierMapping,
    /// Documents written by this invocation. Zero when the corpus existed.
    pub documents_written: usize,
    /// True when an existing corpus was reused.
    pub reused: bool,
}

/// Writes `corpus.jsonl.gz` and `document-mapping.json.gz` into a directory.
pub struct CorpusMaterializer<G = UuidGenerator> {
    directory: PathBuf,
    ids: G,
}

impl CorpusMaterializer<UuidGenerator> {
    pub fn new(directory: &Path) -> Self {
        Self::with_generator(directory, UuidGenerator)
    }
}

impl<G: IdGenerator> CorpusMaterializer<G> {
    pub fn with_generator(directory: &Path, ids: G) -> Self {
        Self {
            directory: directory.to_path_buf(),
            ids,
        }
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.directory.join(CORPUS_FILE)
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.directory.join(MAPPING_FILE)
    }

    /// Assigns opaque ids and persists the corpus, in input order.
    ///
    /// A no-op returning the stored mapping if the mapping file already
    /// exists. Fails with [`CorpusError::DuplicateIdentifier`] if the
    /// generator repeats an id or an original id appears twice; nothing is
    /// persisted in that case.
    pub fn materialize<I>(&mut self, documents: I) -> Result<CorpusOutcome, CorpusError>
    where
        I: IntoIterator<Item = (String, Vec<Segment>)>,
    {
        let mapping_path = self.mapping_path();
        if mapping_path.exists() {
            info!("Corpus already materialized at {}", mapping_path.display());
            return Ok(CorpusOutcome {
                mapping: IdentifierMapping::read(&mapping_path)?,
                documents_written: 0,
                reused: true,
            });
        }

        let mut mapping = IdentifierMapping::new();
        let mut corpus = Vec::new();
        for (original, segments) in documents {
            let opaque = self.ids.next_id();
            mapping.insert(opaque.clone(), original)?;
            corpus.push(Document::new(opaque, segments));
        }

        write_atomic(&self.corpus_path(), |w| {
            for doc in &corpus {
                serde_json::to_writer(&mut *w, doc)?;
                w.write_all(b"\n")?;
            }
            Ok::<_, CorpusError>(())
        })?;
        mapping.write(&mapping_path)?;

        info!(
            "Wrote {} documents to {}",
            corpus.len(),
            self.corpus_path().display()
        );
        Ok(CorpusOutcome {
            mapping,
            documents_written: corpus.len(),
            reused: false,
        })
    }
}

/// Lazily reads a corpus file. Each record must carry `doc_id` and
/// `segments`.
pub fn read_corpus(path: &Path) -> Result<JsonlReader<Document>, CorpusError> {
    JsonlReader::open(path)
}

//! Datasets served from materialized files on disk.
//!
//! [`LocalDataset`] implements every capability over an
//! [`ArtifactResolver`], which knows where the corpus, truth and embedding
//! files of one dataset live. Two resolvers exist: a plain directory (as
//! written by the corpus pipeline) and the archive cache of a known dataset.

use super::artifacts::{ArtifactCache, ArtifactDescriptor};
use super::{DatasetIter, DocumentSource, EmbeddingSource, QrelSource, QuerySource};
use crate::config::{CORPUS_FILE, QRELS_FILE, QUERIES_JSONL_FILE};
use crate::corpus::io::JsonlReader;
use crate::corpus::read_corpus;
use crate::embeddings::{model_dir_name, CsrMatrix, SparseEmbeddingStore, TextType};
use crate::error::DatasetError;
use crate::model::{Document, Qrel, Query};
use crate::trec::QrelReader;
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Subdirectory of a corpus directory holding per-model embeddings.
pub const EMBEDDINGS_DIR: &str = "embeddings";

/// Locates the files of one dataset, resolving them on first use.
pub trait ArtifactResolver {
    /// Directory containing the corpus file.
    fn inputs_dir(&self) -> Result<PathBuf, DatasetError>;

    /// Directory containing queries and qrels.
    fn truths_dir(&self) -> Result<PathBuf, DatasetError>;

    /// Directory containing the embeddings of `model`.
    fn embeddings_dir(&self, model: &str) -> Result<PathBuf, DatasetError>;

    /// Models with embeddings available to this dataset, in directory-name
    /// form (see [`model_dir_name`]) so that every resolver reports the same
    /// names.
    fn embedding_models(&self) -> Vec<String>;
}

// =============================================================================
// Resolvers
// =============================================================================

/// All artifacts in one directory, embeddings under `embeddings/<model>/`.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl ArtifactResolver for DirectoryResolver {
    fn inputs_dir(&self) -> Result<PathBuf, DatasetError> {
        Ok(self.root.clone())
    }

    fn truths_dir(&self) -> Result<PathBuf, DatasetError> {
        Ok(self.root.clone())
    }

    fn embeddings_dir(&self, model: &str) -> Result<PathBuf, DatasetError> {
        let dir = self.root.join(EMBEDDINGS_DIR).join(model_dir_name(model));
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(DatasetError::MissingArtifact(format!(
                "embeddings for {model} in {}",
                dir.display()
            )))
        }
    }

    fn embedding_models(&self) -> Vec<String> {
        let mut models: Vec<String> = fs::read_dir(self.root.join(EMBEDDINGS_DIR))
            .into_iter()
            .flatten()
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        models.sort();
        models
    }
}

/// Artifacts of a known dataset, resolved through its archive cache.
///
/// Each archive is resolved at most once per resolver.
pub struct CachedResolver {
    cache: ArtifactCache,
    inputs: ArtifactDescriptor,
    truths: ArtifactDescriptor,
    /// Model name to its embedding archive.
    embeddings: Vec<(String, ArtifactDescriptor)>,
    resolved: RefCell<HashMap<String, PathBuf>>,
}

impl CachedResolver {
    pub fn new(
        cache: ArtifactCache,
        inputs: ArtifactDescriptor,
        truths: ArtifactDescriptor,
        embeddings: Vec<(String, ArtifactDescriptor)>,
    ) -> Self {
        Self {
            cache,
            inputs,
            truths,
            embeddings,
            resolved: RefCell::new(HashMap::new()),
        }
    }

    fn resolve(&self, descriptor: &ArtifactDescriptor) -> Result<PathBuf, DatasetError> {
        if let Some(path) = self.resolved.borrow().get(&descriptor.name) {
            return Ok(path.clone());
        }
        let path = self.cache.resolve(descriptor)?;
        self.resolved
            .borrow_mut()
            .insert(descriptor.name.clone(), path.clone());
        Ok(path)
    }
}

impl ArtifactResolver for CachedResolver {
    fn inputs_dir(&self) -> Result<PathBuf, DatasetError> {
        self.resolve(&self.inputs)
    }

    fn truths_dir(&self) -> Result<PathBuf, DatasetError> {
        self.resolve(&self.truths)
    }

    fn embeddings_dir(&self, model: &str) -> Result<PathBuf, DatasetError> {
        let wanted = model_dir_name(model);
        let descriptor = self
            .embeddings
            .iter()
            .find(|(name, _)| model_dir_name(name) == wanted)
            .map(|(_, descriptor)| descriptor)
            .ok_or_else(|| DatasetError::MissingArtifact(format!("embeddings for {model}")))?;
        self.resolve(descriptor)
    }

    fn embedding_models(&self) -> Vec<String> {
        self.embeddings.iter().map(|(name, _)| model_dir_name(name)).collect()
    }
}

// =============================================================================
// Local Dataset
// =============================================================================

/// Embeddings currently held in memory for one text type.
struct Resident {
    model: String,
    matrix: Rc<CsrMatrix>,
}

/// Dataset whose capabilities all read files found by a resolver.
pub struct LocalDataset {
    id: String,
    resolver: Box<dyn ArtifactResolver>,
    docs_count: OnceCell<usize>,
    resident: RefCell<HashMap<TextType, Resident>>,
}

impl LocalDataset {
    pub fn new(id: impl Into<String>, resolver: Box<dyn ArtifactResolver>) -> Self {
        Self {
            id: id.into(),
            resolver,
            docs_count: OnceCell::new(),
            resident: RefCell::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn resolver(&self) -> &dyn ArtifactResolver {
        self.resolver.as_ref()
    }

    fn required_file(dir: PathBuf, name: &str) -> Result<PathBuf, DatasetError> {
        let path = dir.join(name);
        if path.exists() {
            Ok(path)
        } else {
            Err(DatasetError::MissingArtifact(path.display().to_string()))
        }
    }
}

impl DocumentSource for LocalDataset {
    fn docs_iter(&self) -> Result<DatasetIter<'_, Document>, DatasetError> {
        let path = Self::required_file(self.resolver.inputs_dir()?, CORPUS_FILE)?;
        Ok(Box::new(read_corpus(&path)?.map(|doc| doc.map_err(DatasetError::from))))
    }

    fn docs_count(&self) -> Result<usize, DatasetError> {
        self.docs_count
            .get_or_try_init(|| {
                let mut count = 0;
                for doc in self.docs_iter()? {
                    doc?;
                    count += 1;
                }
                Ok(count)
            })
            .copied()
    }
}

impl QuerySource for LocalDataset {
    fn queries_iter(&self) -> Result<DatasetIter<'_, Query>, DatasetError> {
        let path = Self::required_file(self.resolver.truths_dir()?, QUERIES_JSONL_FILE)?;
        let reader: JsonlReader<Query> = JsonlReader::open(&path)?;
        Ok(Box::new(reader.map(|query| query.map_err(DatasetError::from))))
    }
}

impl QrelSource for LocalDataset {
    fn qrels_iter(&self) -> Result<DatasetIter<'_, Qrel>, DatasetError> {
        let path = Self::required_file(self.resolver.truths_dir()?, QRELS_FILE)?;
        Ok(Box::new(
            QrelReader::open(&path)?.map(|qrel| qrel.map_err(DatasetError::from)),
        ))
    }
}

impl EmbeddingSource for LocalDataset {
    fn embedding_models(&self) -> Vec<String> {
        self.resolver.embedding_models()
    }

    fn embeddings(&self, model: &str, text_type: TextType) -> Result<Rc<CsrMatrix>, DatasetError> {
        let model_key = model_dir_name(model);
        if let Some(resident) = self.resident.borrow().get(&text_type) {
            if resident.model == model_key {
                return Ok(Rc::clone(&resident.matrix));
            }
        }

        let store = SparseEmbeddingStore::new(&self.resolver.embeddings_dir(model)?);
        if !store.contains(text_type) {
            return Err(DatasetError::MissingArtifact(format!(
                "{text_type} embeddings of {model} in {}",
                store.directory().display()
            )));
        }
        let matrix = Rc::new(store.read(text_type)?);
        debug!("Loaded {} {} embeddings of {}", matrix.len(), text_type, model);

        // Replaces any other model's embeddings of this text type.
        self.resident.borrow_mut().insert(
            text_type,
            Resident {
                model: model_key,
                matrix: Rc::clone(&matrix),
            },
        );
        Ok(matrix)
    }
}

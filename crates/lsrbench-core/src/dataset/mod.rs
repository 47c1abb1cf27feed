//! Dataset access facade.
//!
//! A [`Dataset`] is a bundle of independent capabilities. Callers check for a
//! capability with the `has_*` methods before using it; using a missing one
//! fails with [`DatasetError::MissingCapability`].
//!
//! Datasets are obtained from a [`DatasetRegistry`], which validates
//! identifiers and shares one backend per collection so that artifacts are
//! resolved only once.
//!
//! # Example
//!
//! ```no_run
//! use lsrbench_core::dataset::{DatasetRegistry, OfflineFetcher};
//! use std::path::Path;
//! use std::rc::Rc;
//!
//! let mut registry = DatasetRegistry::new(Path::new("/data/lsr-benchmark"), Rc::new(OfflineFetcher));
//! let dataset = registry.load("lsr-benchmark/clueweb09/en/trec-web-2009/segmented")?;
//! for doc in dataset.docs_iter()? {
//!     let doc = doc?;
//!     println!("{}: {}", doc.doc_id, doc.default_text());
//! }
//! # Ok::<(), lsrbench_core::error::DatasetError>(())
//! ```

pub mod artifacts;
pub mod local;
pub mod registry;

use crate::config::QREL_DEFS;
use crate::embeddings::{CsrMatrix, TextType};
use crate::error::DatasetError;
use crate::model::{Document, Qrel, Query};
use std::rc::Rc;

pub use artifacts::{ArtifactDescriptor, ArtifactFetcher, LocalMirrorFetcher, OfflineFetcher};
pub use local::{ArtifactResolver, DirectoryResolver, LocalDataset};
pub use registry::{DatasetId, DatasetRegistry, KnownDataset, SUPPORTED_DATASETS};

/// Fallible iterator returned by the capability traits.
pub type DatasetIter<'a, T> = Box<dyn Iterator<Item = Result<T, DatasetError>> + 'a>;

// =============================================================================
// Capabilities
// =============================================================================

/// Documents of a dataset.
pub trait DocumentSource {
    /// A fresh iterator over all documents, in storage order.
    fn docs_iter(&self) -> Result<DatasetIter<'_, Document>, DatasetError>;

    fn docs_count(&self) -> Result<usize, DatasetError> {
        count(self.docs_iter()?)
    }
}

/// Queries of a dataset.
pub trait QuerySource {
    /// A fresh iterator over all queries, in storage order.
    fn queries_iter(&self) -> Result<DatasetIter<'_, Query>, DatasetError>;

    fn queries_count(&self) -> Result<usize, DatasetError> {
        count(self.queries_iter()?)
    }
}

/// Relevance judgments of a dataset.
pub trait QrelSource {
    fn qrels_iter(&self) -> Result<DatasetIter<'_, Qrel>, DatasetError>;

    /// Relevance grades and their labels.
    fn qrel_defs(&self) -> &'static [(u8, &'static str)] {
        &QREL_DEFS
    }
}

/// Precomputed sparse embeddings of a dataset.
pub trait EmbeddingSource {
    /// Model names with embeddings available.
    fn embedding_models(&self) -> Vec<String>;

    /// All embeddings of `text_type` computed by `model`.
    fn embeddings(&self, model: &str, text_type: TextType) -> Result<Rc<CsrMatrix>, DatasetError>;
}

fn count<T>(iter: DatasetIter<'_, T>) -> Result<usize, DatasetError> {
    let mut n = 0;
    for item in iter {
        item?;
        n += 1;
    }
    Ok(n)
}

// =============================================================================
// Dataset
// =============================================================================

/// A dataset as seen by callers: optional capabilities plus the view mode.
///
/// Cloning is cheap; clones share their backends.
#[derive(Clone)]
pub struct Dataset {
    id: String,
    segmented: bool,
    documents: Option<Rc<dyn DocumentSource>>,
    queries: Option<Rc<dyn QuerySource>>,
    qrels: Option<Rc<dyn QrelSource>>,
    embeddings: Option<Rc<dyn EmbeddingSource>>,
}

impl Dataset {
    /// An empty bundle. Add capabilities with the `with_*` methods.
    pub fn new(id: impl Into<String>, segmented: bool) -> Self {
        Self {
            id: id.into(),
            segmented,
            documents: None,
            queries: None,
            qrels: None,
            embeddings: None,
        }
    }

    /// A bundle with every capability served by `backend`.
    pub fn from_local(id: impl Into<String>, segmented: bool, backend: Rc<LocalDataset>) -> Self {
        Self::new(id, segmented)
            .with_documents(backend.clone())
            .with_queries(backend.clone())
            .with_qrels(backend.clone())
            .with_embeddings(backend)
    }

    pub fn with_documents(mut self, source: Rc<dyn DocumentSource>) -> Self {
        self.documents = Some(source);
        self
    }

    pub fn with_queries(mut self, source: Rc<dyn QuerySource>) -> Self {
        self.queries = Some(source);
        self
    }

    pub fn with_qrels(mut self, source: Rc<dyn QrelSource>) -> Self {
        self.qrels = Some(source);
        self
    }

    pub fn with_embeddings(mut self, source: Rc<dyn EmbeddingSource>) -> Self {
        self.embeddings = Some(source);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when documents are exposed one segment at a time.
    pub fn is_segmented(&self) -> bool {
        self.segmented
    }

    pub fn has_docs(&self) -> bool {
        self.documents.is_some()
    }

    pub fn has_queries(&self) -> bool {
        self.queries.is_some()
    }

    pub fn has_qrels(&self) -> bool {
        self.qrels.is_some()
    }

    pub fn has_embeddings(&self) -> bool {
        self.embeddings.is_some()
    }

    fn missing(&self, capability: &'static str) -> DatasetError {
        DatasetError::MissingCapability {
            id: self.id.clone(),
            capability,
        }
    }

    fn documents(&self) -> Result<&dyn DocumentSource, DatasetError> {
        self.documents.as_deref().ok_or_else(|| self.missing("documents"))
    }

    fn queries(&self) -> Result<&dyn QuerySource, DatasetError> {
        self.queries.as_deref().ok_or_else(|| self.missing("queries"))
    }

    fn qrels(&self) -> Result<&dyn QrelSource, DatasetError> {
        self.qrels.as_deref().ok_or_else(|| self.missing("qrels"))
    }

    fn embedding_source(&self) -> Result<&dyn EmbeddingSource, DatasetError> {
        self.embeddings.as_deref().ok_or_else(|| self.missing("embeddings"))
    }

    /// A fresh iterator over the documents.
    ///
    /// In segmented mode every segment becomes its own document with id
    /// `<doc_id>___<index>___` and that single segment, computed on the fly.
    pub fn docs_iter(&self) -> Result<DatasetIter<'_, Document>, DatasetError> {
        let docs = self.documents()?.docs_iter()?;
        if !self.segmented {
            return Ok(docs);
        }
        Ok(Box::new(docs.flat_map(
            |doc| -> Box<dyn Iterator<Item = Result<Document, DatasetError>>> {
                match doc {
                    Ok(doc) => Box::new(doc.into_segmented().map(|s| Ok(Document::from(s)))),
                    Err(e) => Box::new(std::iter::once(Err(e))),
                }
            },
        )))
    }

    /// Number of documents in the current view.
    pub fn docs_count(&self) -> Result<usize, DatasetError> {
        if self.segmented {
            count(self.docs_iter()?)
        } else {
            self.documents()?.docs_count()
        }
    }

    pub fn queries_iter(&self) -> Result<DatasetIter<'_, Query>, DatasetError> {
        self.queries()?.queries_iter()
    }

    pub fn queries_count(&self) -> Result<usize, DatasetError> {
        self.queries()?.queries_count()
    }

    pub fn qrels_iter(&self) -> Result<DatasetIter<'_, Qrel>, DatasetError> {
        self.qrels()?.qrels_iter()
    }

    pub fn qrel_defs(&self) -> Result<&'static [(u8, &'static str)], DatasetError> {
        Ok(self.qrels()?.qrel_defs())
    }

    pub fn embedding_models(&self) -> Result<Vec<String>, DatasetError> {
        Ok(self.embedding_source()?.embedding_models())
    }

    /// Embeddings of `text_type` computed by `model`.
    pub fn embeddings(&self, model: &str, text_type: TextType) -> Result<Rc<CsrMatrix>, DatasetError> {
        self.embedding_source()?.embeddings(model, text_type)
    }

    pub fn query_embeddings(&self, model: &str) -> Result<Rc<CsrMatrix>, DatasetError> {
        self.embeddings(model, TextType::Query)
    }

    pub fn doc_embeddings(&self, model: &str) -> Result<Rc<CsrMatrix>, DatasetError> {
        self.embeddings(model, TextType::Document)
    }

    /// Token ids and weights of a single query or document.
    pub fn embedding(
        &self,
        model: &str,
        text_type: TextType,
        id: &str,
    ) -> Result<(Vec<u32>, Vec<f32>), DatasetError> {
        let matrix = self.embeddings(model, text_type)?;
        let (tokens, weights) = matrix.get(id)?;
        Ok((tokens.to_vec(), weights.to_vec()))
    }
}

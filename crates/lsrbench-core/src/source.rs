//! Reference collections that reduced corpora are sampled from.
//!
//! The construction pipeline only needs three things from a source
//! collection: document text by id, the queries and the qrels.
//! [`LocalSourceCollection`] serves them from a directory:
//!
//! ```text
//! <source-dir>/
//! ├── documents.jsonl[.gz]   # {"doc_id": "...", "text": "..."}
//! ├── queries.jsonl          # {"qid": "...", "query": "..."}
//! └── qrels.txt              # <qid> 0 <docid> <relevance>
//! ```

use crate::corpus::io::JsonlReader;
use crate::error::CorpusError;
use crate::model::{Qrel, Query};
use crate::trec::read_trec_qrels;
use once_cell::unsync::OnceCell;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Document file names tried in order.
const DOCUMENT_FILES: [&str; 2] = ["documents.jsonl.gz", "documents.jsonl"];
const QUERIES_FILE: &str = "queries.jsonl";
const QRELS_FILE: &str = "qrels.txt";

/// Read access to a reference document collection.
pub trait SourceCollection {
    /// Identifier used in logs.
    fn id(&self) -> &str;

    /// Opens the document store. Fails if the store as a whole is unusable,
    /// e.g. missing or malformed; lookups of single ids never reach it then.
    fn open_documents(&self) -> Result<(), CorpusError> {
        Ok(())
    }

    /// Returns the full text of a document, or `None` if the collection has
    /// no document with this id.
    fn document_text(&self, doc_id: &str) -> Result<Option<String>, CorpusError>;

    /// All queries of the collection.
    fn queries(&self) -> Result<Vec<Query>, CorpusError>;

    /// All relevance judgments of the collection.
    fn qrels(&self) -> Result<Vec<Qrel>, CorpusError>;
}

#[derive(Debug, Deserialize)]
struct SourceDocument {
    doc_id: String,
    text: String,
}

/// Source collection stored as plain files in a directory.
///
/// Documents are loaded into memory on the first lookup.
pub struct LocalSourceCollection {
    id: String,
    directory: PathBuf,
    documents: OnceCell<HashMap<String, String>>,
}

impl LocalSourceCollection {
    pub fn open(directory: &Path) -> Result<Self, CorpusError> {
        if !directory.is_dir() {
            return Err(CorpusError::MissingArtifact(directory.to_path_buf()));
        }
        Ok(Self {
            id: directory.display().to_string(),
            directory: directory.to_path_buf(),
            documents: OnceCell::new(),
        })
    }

    fn documents_path(&self) -> Result<PathBuf, CorpusError> {
        DOCUMENT_FILES
            .iter()
            .map(|name| self.directory.join(name))
            .find(|path| path.exists())
            .ok_or_else(|| CorpusError::MissingArtifact(self.directory.join(DOCUMENT_FILES[1])))
    }

    fn documents(&self) -> Result<&HashMap<String, String>, CorpusError> {
        self.documents.get_or_try_init(|| {
            let path = self.documents_path()?;
            let mut documents = HashMap::new();
            for doc in JsonlReader::<SourceDocument>::open(&path)? {
                let doc = doc?;
                documents.insert(doc.doc_id, doc.text);
            }
            tracing::debug!("Loaded {} source documents from {}", documents.len(), path.display());
            Ok(documents)
        })
    }
}

impl SourceCollection for LocalSourceCollection {
    fn id(&self) -> &str {
        &self.id
    }

    fn open_documents(&self) -> Result<(), CorpusError> {
        self.documents().map(|_| ())
    }

    fn document_text(&self, doc_id: &str) -> Result<Option<String>, CorpusError> {
        Ok(self.documents()?.get(doc_id).cloned())
    }

    fn queries(&self) -> Result<Vec<Query>, CorpusError> {
        JsonlReader::open(&self.directory.join(QUERIES_FILE))?.collect()
    }

    fn qrels(&self) -> Result<Vec<Qrel>, CorpusError> {
        read_trec_qrels(&self.directory.join(QRELS_FILE))
    }
}

/// Sampled documents fetched from a source collection.
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    /// Original document id to full text.
    pub texts: HashMap<String, String>,
    /// Sampled ids the source collection could not provide.
    pub skipped: usize,
}

/// Fetches the text of every sampled id.
///
/// Ids the source does not know are counted in `skipped`. Any other lookup
/// failure means the store itself is broken and aborts the load.
/// `on_document` is called once per id, for progress reporting.
pub fn load_documents(
    source: &dyn SourceCollection,
    sample: &HashSet<String>,
    mut on_document: impl FnMut(),
) -> Result<LoadedDocuments, CorpusError> {
    source.open_documents()?;
    let mut loaded = LoadedDocuments::default();

    for doc_id in sample {
        match source.document_text(doc_id)? {
            Some(text) => {
                loaded.texts.insert(doc_id.clone(), text);
            }
            None => {
                tracing::debug!("Document {} not in {}", doc_id, source.id());
                loaded.skipped += 1;
            }
        }
        on_document();
    }

    if loaded.skipped > 0 {
        tracing::warn!("Skipped {} docs missing from {}", loaded.skipped, source.id());
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_source_collection;
    use tempfile::TempDir;

    #[test]
    fn test_local_source() {
        let dir = TempDir::new().unwrap();
        write_source_collection(dir.path());
        let source = LocalSourceCollection::open(dir.path()).unwrap();

        assert!(source
            .document_text("d1")
            .unwrap()
            .unwrap()
            .starts_with("The first document"));
        assert_eq!(source.document_text("unknown").unwrap(), None);
        assert_eq!(source.queries().unwrap().len(), 3);
        assert_eq!(source.qrels().unwrap().len(), 5);
    }

    #[test]
    fn test_load_documents_counts_skips() {
        let dir = TempDir::new().unwrap();
        write_source_collection(dir.path());
        let source = LocalSourceCollection::open(dir.path()).unwrap();

        let sample: HashSet<String> = ["d1", "d2", "missing-1", "missing-2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut calls = 0;
        let loaded = load_documents(&source, &sample, || calls += 1).unwrap();

        assert_eq!(loaded.texts.len(), 2);
        assert_eq!(loaded.skipped, 2);
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_malformed_document_store_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_source_collection(dir.path());
        let mut docs = std::fs::OpenOptions::new()
            .append(true)
            .open(dir.path().join("documents.jsonl"))
            .unwrap();
        std::io::Write::write_all(&mut docs, b"not json\n").unwrap();
        let source = LocalSourceCollection::open(dir.path()).unwrap();

        let sample: HashSet<String> = ["d1", "missing-1"].iter().map(|s| s.to_string()).collect();
        let mut calls = 0;
        let err = load_documents(&source, &sample, || calls += 1).unwrap_err();

        assert!(matches!(err, CorpusError::InvalidFormat { line: 4, .. }));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_missing_document_store_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_source_collection(dir.path());
        std::fs::remove_file(dir.path().join("documents.jsonl")).unwrap();
        let source = LocalSourceCollection::open(dir.path()).unwrap();

        let sample: HashSet<String> = ["d1".to_string()].into_iter().collect();
        let err = load_documents(&source, &sample, || {}).unwrap_err();
        assert!(matches!(err, CorpusError::MissingArtifact(_)));
    }

    #[test]
    fn test_missing_directory() {
        let result = LocalSourceCollection::open(Path::new("/nonexistent/source"));
        assert!(matches!(result, Err(CorpusError::MissingArtifact(_))));
    }
}

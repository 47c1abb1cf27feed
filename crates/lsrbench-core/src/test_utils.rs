//! Test utilities for lsrbench-core.
//!
//! Builds small on-disk fixtures: a source collection, a corpus construction
//! directory and an already materialized dataset. Only compiled when running
//! tests.

use crate::config::{CONFIG_FILE, CORPUS_FILE, QRELS_FILE, QUERIES_JSONL_FILE};
use crate::corpus::io::write_atomic;
use crate::dataset::local::EMBEDDINGS_DIR;
use crate::embeddings::{SparseEmbeddingStore, TextType};
use crate::error::CorpusError;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Writes a source collection with documents `d1`, `d2`, `d3`, three
/// queries and five qrels.
///
/// # Panics
///
/// Panics on I/O errors.
pub fn write_source_collection(dir: &Path) {
    fs::create_dir_all(dir).expect("Failed to create source dir");
    fs::write(
        dir.join("documents.jsonl"),
        concat!(
            r#"{"doc_id": "d1", "text": "The first document talks about the Obama family tree. It has two sentences."}"#,
            "\n",
            r#"{"doc_id": "d2", "text": "A second document about Hawaii."}"#,
            "\n",
            r#"{"doc_id": "d3", "text": "The third document is never sampled."}"#,
            "\n",
        ),
    )
    .expect("Failed to write documents");
    fs::write(
        dir.join("queries.jsonl"),
        concat!(
            r#"{"qid": "1", "query": "obama family tree"}"#,
            "\n",
            r#"{"qid": "2", "query": "hawaii"}"#,
            "\n",
            r#"{"qid": "3", "query": "unjudged query"}"#,
            "\n",
        ),
    )
    .expect("Failed to write queries");
    fs::write(
        dir.join("qrels.txt"),
        "1 0 d1 2\n1 0 d3 0\n2 0 d2 1\n2 0 d1 0\n2 0 missing-doc 1\n",
    )
    .expect("Failed to write qrels");
}

/// Writes `<root>/source` and a construction directory `<root>/corpus` whose
/// run pools three documents at depth 1, one of them unknown to the source.
///
/// Returns the construction directory.
///
/// # Panics
///
/// Panics on I/O errors.
pub fn write_construction_dir(root: &Path, depth: usize) -> PathBuf {
    write_source_collection(&root.join("source"));

    let corpus = root.join("corpus");
    fs::create_dir_all(&corpus).expect("Failed to create corpus dir");
    fs::write(
        corpus.join("run.txt"),
        concat!(
            "1 Q0 d1 1 10.0 bm25\n",
            "1 Q0 d2 2 9.0 bm25\n",
            "2 Q0 d2 1 8.0 bm25\n",
            "2 Q0 d3 2 7.0 bm25\n",
            "3 Q0 missing-doc 1 5.0 bm25\n",
        ),
    )
    .expect("Failed to write run");
    fs::write(
        corpus.join(CONFIG_FILE),
        format!(
            r#"{{"ir-datasets-id": "../source", "runs": ["run.txt"], "subsample_depth": {depth}}}"#
        ),
    )
    .expect("Failed to write config");
    corpus
}

/// Writes a materialized dataset: documents `a` (two segments) and `b`,
/// two queries, three qrels, and `naver/splade-v3` embeddings for both
/// text types.
///
/// # Panics
///
/// Panics on I/O errors.
pub fn write_materialized_dataset(dir: &Path) {
    write_atomic::<CorpusError, _>(&dir.join(CORPUS_FILE), |w| {
        writeln!(
            w,
            r#"{{"doc_id": "a", "segments": [{{"start": 0, "end": 5, "text": "Hello"}}, {{"start": 6, "end": 11, "text": "world"}}]}}"#
        )?;
        writeln!(
            w,
            r#"{{"doc_id": "b", "segments": [{{"start": 0, "end": 3, "text": "foo"}}]}}"#
        )?;
        Ok(())
    })
    .expect("Failed to write corpus");
    fs::write(
        dir.join(QUERIES_JSONL_FILE),
        "{\"qid\": \"1\", \"query\": \"hello\"}\n{\"qid\": \"2\", \"query\": \"foo\"}\n",
    )
    .expect("Failed to write queries");
    fs::write(dir.join(QRELS_FILE), "1 0 a 1\n1 0 b 0\n2 0 b 1\n").expect("Failed to write qrels");

    let store = SparseEmbeddingStore::new(&dir.join(EMBEDDINGS_DIR).join("naver-splade-v3"));
    store
        .write(
            TextType::Document,
            vec!["a".to_string(), "b".to_string()],
            vec![(vec![1, 2], vec![0.5, 0.5]), (vec![3], vec![1.0])],
        )
        .expect("Failed to write document embeddings");
    store
        .write(
            TextType::Query,
            vec!["1".to_string(), "2".to_string()],
            vec![(vec![7], vec![0.3]), (vec![8, 9], vec![0.2, 0.1])],
        )
        .expect("Failed to write query embeddings");
}

/// Builds an in-memory zip archive of text files.
///
/// # Panics
///
/// Panics if the archive cannot be written.
pub fn write_zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start zip entry");
        zip.write_all(content.as_bytes())
            .expect("Failed to write zip entry");
    }
    zip.finish().expect("Failed to finish zip").into_inner()
}

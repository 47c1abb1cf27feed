//! End-to-end tests for corpus construction and dataset access.
//!
//! These tests exercise the full workflow through the public API:
//! 1. Construction: config.json → run pooling → segmentation → corpus and truths
//! 2. Access: registry → local dataset → plain and segmented views → embeddings
//!
//! Run with: `cargo test -p lsrbench-core --test integration_tests`

use lsrbench_core::config::{CORPUS_FILE, MAPPING_FILE, QRELS_FILE, QUERIES_XML_FILE};
use lsrbench_core::corpus::{create_lsr_corpus, IdentifierMapping, NoProgress};
use lsrbench_core::dataset::{DatasetRegistry, OfflineFetcher};
use lsrbench_core::embeddings::{SparseEmbeddingStore, TextType};
use lsrbench_core::model::{parse_segment_doc_id, Document, Qrel, Query};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

// ============================================================================
// Test Fixtures
// ============================================================================

const LONG_TEXT: &str = "Barack Obama was born in Honolulu, Hawaii. His father was from Kenya \
and his mother from Kansas. He studied at Columbia University and Harvard Law School. \
Before his presidency he served in the Illinois Senate and the United States Senate.";

/// Writes a source collection and a construction directory pooling at `depth`.
fn setup(root: &Path, depth: usize) -> PathBuf {
    let source = root.join("collection");
    fs::create_dir_all(&source).unwrap();
    let documents = [
        ("clueweb09-en0000-00-00001", LONG_TEXT),
        ("clueweb09-en0000-00-00002", "Hawaii is a state of the United States."),
        ("clueweb09-en0000-00-00003", "Kansas is known for its wheat."),
        ("clueweb09-en0000-00-00004", "   "),
    ];
    let mut jsonl = String::new();
    for (doc_id, text) in documents {
        jsonl.push_str(&serde_json::json!({ "doc_id": doc_id, "text": text }).to_string());
        jsonl.push('\n');
    }
    fs::write(source.join("documents.jsonl"), jsonl).unwrap();
    fs::write(
        source.join("queries.jsonl"),
        "{\"qid\": \"1\", \"query\": \"obama family tree\"}\n\
         {\"qid\": \"2\", \"query\": \"hawaii <state>\"}\n\
         {\"qid\": \"3\", \"query\": \"never judged\"}\n",
    )
    .unwrap();
    fs::write(
        source.join("qrels.txt"),
        "1 0 clueweb09-en0000-00-00001 2\n\
         1 0 clueweb09-en0000-00-00003 0\n\
         2 0 clueweb09-en0000-00-00002 1\n\
         2 0 clueweb09-en0000-00-99999 1\n",
    )
    .unwrap();

    let corpus = root.join("trec-web-2009");
    fs::create_dir_all(&corpus).unwrap();
    fs::write(
        corpus.join("run-a.txt"),
        "1 Q0 clueweb09-en0000-00-00001 1 12.5 bm25\n\
         1 Q0 clueweb09-en0000-00-00003 2 11.0 bm25\n\
         2 Q0 clueweb09-en0000-00-00002 1 9.0 bm25\n\
         2 Q0 clueweb09-en0000-00-00004 2 8.0 bm25\n",
    )
    .unwrap();
    fs::write(
        corpus.join("run-b.txt"),
        "1 Q0 clueweb09-en0000-00-00003 1 0.9 splade\n\
         2 Q0 clueweb09-en0000-00-00404 1 0.8 splade\n",
    )
    .unwrap();
    let config = serde_json::json!({
        "ir-datasets-id": "../collection",
        "runs": ["run-a.txt", "run-b.txt"],
        "subsample_depth": depth,
        "passage_size": 12,
    });
    fs::write(corpus.join("config.json"), config.to_string()).unwrap();
    corpus
}

fn collect<T>(iter: impl Iterator<Item = Result<T, lsrbench_core::error::DatasetError>>) -> Vec<T> {
    iter.map(Result::unwrap).collect()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_construction_pools_segments_and_remaps() {
    let root = TempDir::new().unwrap();
    let corpus_dir = setup(root.path(), 1);

    let report = create_lsr_corpus(&corpus_dir, &NoProgress).unwrap();

    // Depth 1: 00001 and 00002 from run-a, 00003 and 00404 from run-b.
    assert_eq!(report.sampler, "top-1-run-pool");
    assert_eq!(report.sampled, 4);
    assert_eq!(report.loaded, 3);
    assert_eq!(report.skipped_documents, 1);

    let mapping = IdentifierMapping::read(&corpus_dir.join(MAPPING_FILE)).unwrap();
    assert_eq!(mapping.len(), 3);
    let originals: HashSet<&str> = mapping.iter().map(|(_, original)| original).collect();
    assert!(originals.contains("clueweb09-en0000-00-00001"));
    assert!(!originals.contains("clueweb09-en0000-00-00004"));
    for (opaque, original) in mapping.iter() {
        assert_ne!(opaque, original);
        assert_eq!(opaque.len(), 36);
    }

    // Long documents are split within the word budget; offsets index the text.
    let docs: Vec<Document> = lsrbench_core::corpus::read_corpus(&corpus_dir.join(CORPUS_FILE))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    let long = docs
        .iter()
        .find(|d| mapping.original(&d.doc_id) == Some("clueweb09-en0000-00-00001"))
        .unwrap();
    assert!(long.segments.len() > 1);
    for segment in &long.segments {
        assert_eq!(&LONG_TEXT[segment.offset_start..segment.offset_end], segment.text);
        assert!(segment.text.split_whitespace().count() <= 12);
    }

    // Unsampled judged documents are dropped from the qrels.
    assert_eq!(report.truths.qrels_written, Some(3));
    assert_eq!(report.truths.qrels_dropped, 1);
    assert_eq!(report.truths.queries_written, Some(2));
    assert_eq!(report.truths.queries_unjudged, 1);

    let xml = fs::read_to_string(corpus_dir.join(QUERIES_XML_FILE)).unwrap();
    assert!(xml.contains("hawaii &lt;state&gt;"));
    let qrels = fs::read_to_string(corpus_dir.join(QRELS_FILE)).unwrap();
    assert!(!qrels.contains("clueweb09"));
}

#[test]
fn test_construction_resumes_from_partial_state() {
    let root = TempDir::new().unwrap();
    let corpus_dir = setup(root.path(), 2);

    create_lsr_corpus(&corpus_dir, &NoProgress).unwrap();
    let corpus_before = fs::read(corpus_dir.join(CORPUS_FILE)).unwrap();
    fs::remove_file(corpus_dir.join(QRELS_FILE)).unwrap();

    let report = create_lsr_corpus(&corpus_dir, &NoProgress).unwrap();

    assert!(report.corpus_reused);
    assert_eq!(report.truths.queries_written, None);
    assert!(report.truths.qrels_written.is_some());
    assert_eq!(fs::read(corpus_dir.join(CORPUS_FILE)).unwrap(), corpus_before);
}

// ============================================================================
// Dataset Access
// ============================================================================

#[test]
fn test_registry_serves_constructed_corpus() {
    let root = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();
    let corpus_dir = setup(root.path(), 1);
    create_lsr_corpus(&corpus_dir, &NoProgress).unwrap();

    let mut registry = DatasetRegistry::new(home.path(), Rc::new(OfflineFetcher));
    let raw = corpus_dir.display().to_string();
    let plain = registry.load(&raw).unwrap();
    let segmented = registry.load(&format!("{raw}/segmented")).unwrap();

    assert!(plain.has_docs() && plain.has_queries() && plain.has_qrels());
    let docs = collect(plain.docs_iter().unwrap());
    assert_eq!(docs.len(), 3);

    // Every segment becomes its own document, in storage order.
    let total_segments: usize = docs.iter().map(|d| d.segments.len()).sum();
    let passages = collect(segmented.docs_iter().unwrap());
    assert_eq!(passages.len(), total_segments);
    assert_eq!(segmented.docs_count().unwrap(), total_segments);
    let (first_id, first_index) = parse_segment_doc_id(&passages[0].doc_id).unwrap();
    assert_eq!(first_id, docs[0].doc_id);
    assert_eq!(first_index, 0);
    assert!(passages.iter().all(|p| p.segments.len() == 1));

    let queries: Vec<Query> = collect(plain.queries_iter().unwrap());
    assert_eq!(queries.len(), 2);
    let qrels: Vec<Qrel> = collect(plain.qrels_iter().unwrap());
    let known: HashSet<&str> = docs.iter().map(|d| d.doc_id.as_str()).collect();
    assert!(qrels.iter().all(|q| known.contains(q.doc_id.as_str())));
}

#[test]
fn test_embeddings_through_dataset() {
    let root = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();
    let corpus_dir = setup(root.path(), 1);
    create_lsr_corpus(&corpus_dir, &NoProgress).unwrap();

    let mut registry = DatasetRegistry::new(home.path(), Rc::new(OfflineFetcher));
    let dataset = registry.load(&corpus_dir.display().to_string()).unwrap();
    let doc_ids: Vec<String> = collect(dataset.docs_iter().unwrap())
        .into_iter()
        .map(|d| d.doc_id)
        .collect();

    let store = SparseEmbeddingStore::new(&corpus_dir.join("embeddings").join("naver-splade-v3"));
    let rows = (0..doc_ids.len() as u32).map(|i| (vec![i, i + 100], vec![1.0, 0.5]));
    store
        .write(TextType::Document, doc_ids.clone(), rows)
        .unwrap();

    assert_eq!(dataset.embedding_models().unwrap(), vec!["naver-splade-v3"]);
    let matrix = dataset.doc_embeddings("naver/splade-v3").unwrap();
    assert_eq!(matrix.len(), doc_ids.len());
    assert_eq!(
        dataset
            .embedding("naver/splade-v3", TextType::Document, &doc_ids[1])
            .unwrap(),
        (vec![1, 101], vec![1.0, 0.5])
    );
    assert!(dataset.query_embeddings("naver/splade-v3").is_err());
}

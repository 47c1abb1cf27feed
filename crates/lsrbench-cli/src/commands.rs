//! Command implementations.
//!
//! Each command resolves its dataset through the registry and returns plain
//! data; formatting happens in [`crate::output`].

use crate::progress::BarProgress;
use anyhow::{Context, Result};
use lsrbench_core::corpus::{create_lsr_corpus, ConstructionReport};
use lsrbench_core::dataset::{Dataset, DatasetRegistry, SUPPORTED_DATASETS};
use lsrbench_core::embeddings::TextType;
use lsrbench_core::model::{Document, Query};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Capabilities and counts of one dataset.
#[derive(Debug, Serialize)]
pub struct DatasetInfo {
    pub id: String,
    pub segmented: bool,
    pub documents: Option<usize>,
    pub queries: Option<usize>,
    pub qrels: Option<usize>,
    pub embedding_models: Vec<String>,
}

/// One sparse embedding row.
#[derive(Debug, Serialize)]
pub struct EmbeddingRow {
    pub id: String,
    pub token_ids: Vec<u32>,
    pub weights: Vec<f32>,
}

/// Builds all corpus artifacts in `directory`.
pub fn create_corpus(directory: &Path) -> Result<ConstructionReport> {
    info!("Creating corpus in {}", directory.display());
    let progress = BarProgress::new();
    create_lsr_corpus(directory, &progress)
        .with_context(|| format!("Failed to create corpus in {}", directory.display()))
}

/// All dataset ids served without a local directory.
pub fn list_datasets() -> Vec<String> {
    SUPPORTED_DATASETS.to_vec()
}

fn load(registry: &mut DatasetRegistry, id: &str) -> Result<Dataset> {
    registry
        .load(id)
        .with_context(|| format!("Failed to load dataset '{}'", id))
}

pub fn dataset_info(registry: &mut DatasetRegistry, id: &str) -> Result<DatasetInfo> {
    let dataset = load(registry, id)?;

    let documents = if dataset.has_docs() {
        Some(dataset.docs_count().context("Failed to count documents")?)
    } else {
        None
    };
    let queries = if dataset.has_queries() {
        Some(dataset.queries_count().context("Failed to count queries")?)
    } else {
        None
    };
    let qrels = if dataset.has_qrels() {
        let mut count = 0;
        for qrel in dataset.qrels_iter()? {
            qrel.context("Failed to read qrels")?;
            count += 1;
        }
        Some(count)
    } else {
        None
    };
    let embedding_models = if dataset.has_embeddings() {
        dataset.embedding_models()?
    } else {
        Vec::new()
    };

    Ok(DatasetInfo {
        id: dataset.id().to_string(),
        segmented: dataset.is_segmented(),
        documents,
        queries,
        qrels,
        embedding_models,
    })
}

pub fn list_docs(registry: &mut DatasetRegistry, id: &str, limit: usize) -> Result<Vec<Document>> {
    let dataset = load(registry, id)?;
    let docs = dataset
        .docs_iter()?
        .take(limit)
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read documents")?;
    Ok(docs)
}

pub fn list_queries(registry: &mut DatasetRegistry, id: &str, limit: usize) -> Result<Vec<Query>> {
    let dataset = load(registry, id)?;
    let queries = dataset
        .queries_iter()?
        .take(limit)
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read queries")?;
    Ok(queries)
}

pub fn list_embeddings(
    registry: &mut DatasetRegistry,
    id: &str,
    model: &str,
    text_type: TextType,
    limit: usize,
) -> Result<Vec<EmbeddingRow>> {
    let dataset = load(registry, id)?;
    let matrix = dataset
        .embeddings(model, text_type)
        .with_context(|| format!("Failed to load {} embeddings of {}", text_type, model))?;
    info!("Loaded {} rows ({} weights)", matrix.len(), matrix.nnz());

    Ok(matrix
        .iter()
        .take(limit)
        .map(|(id, token_ids, weights)| EmbeddingRow {
            id: id.to_string(),
            token_ids: token_ids.to_vec(),
            weights: weights.to_vec(),
        })
        .collect())
}

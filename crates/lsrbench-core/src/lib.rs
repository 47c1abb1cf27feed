//! # lsrbench Core
//!
//! Construction of storage-bounded benchmark corpora for learned sparse
//! retrieval, and lazy access to the resulting datasets.
//!
//! A corpus is built from a reference collection and a set of ranked runs:
//! the runs are pooled to a fixed depth, the pooled documents are split into
//! passages, given opaque identifiers and persisted together with the judged
//! queries and remapped qrels. Precomputed sparse embeddings are stored next
//! to it in CSR layout.
//!
//! ## Modules
//!
//! - [`config`] - Artifact names, defaults and the corpus `config.json`
//! - [`error`] - Error types for configuration, corpora, embeddings and datasets
//! - [`model`] - Documents, segments, queries and qrels
//! - [`trec`] - TREC run and qrel readers
//! - [`sampling`] - Run-pool corpus sampling
//! - [`segmentation`] - Passage segmentation of document text
//! - [`source`] - Reference collections to sample from
//! - [`corpus`] - Corpus construction pipeline and materializers
//! - [`embeddings`] - Sparse embedding storage
//! - [`dataset`] - Dataset registry and capability-based access facade

pub mod config;
pub mod corpus;
pub mod dataset;
pub mod embeddings;
pub mod error;
pub mod model;
pub mod sampling;
pub mod segmentation;
pub mod source;
pub mod trec;

#[cfg(test)]
pub(crate) mod test_utils;

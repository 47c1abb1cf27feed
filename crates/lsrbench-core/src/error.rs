//! Error types for lsrbench-core.
//!
//! Each concern gets its own enum: configuration loading, corpus construction,
//! sparse embedding storage and dataset resolution. Conversions between them
//! allow `?` to be used across layers.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or validating `config.json`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is absent. Construction never starts without it.
    #[error("Missing required configuration key '{0}'")]
    MissingKey(&'static str),
    /// A key is present but its value cannot be used.
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
    /// The configuration file could not be read.
    #[error("Failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON.
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while building corpus artifacts.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// A freshly generated opaque identifier collided with an assigned one.
    #[error("Duplicate opaque identifier: {0}")]
    DuplicateIdentifier(String),
    /// An upstream artifact needed by this step does not exist.
    #[error("Missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),
    /// A line in an input or artifact file could not be parsed.
    #[error("Invalid format in {} line {line}: {message}", path.display())]
    InvalidFormat {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CorpusError {
    pub(crate) fn invalid_format(
        path: impl Into<PathBuf>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        CorpusError::InvalidFormat {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

/// Errors that can occur in the sparse embedding store.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The CSR arrays or the id sidecar violate a structural invariant.
    #[error("Invalid CSR layout: {0}")]
    InvalidLayout(String),
    /// The npz archive lacks one of `data`, `indices`, `indptr`.
    #[error("Missing array '{0}' in embedding archive")]
    MissingArray(String),
    /// An `.npy` member has a header or dtype we cannot decode.
    #[error("Unsupported npy array '{name}': {reason}")]
    UnsupportedArray { name: String, reason: String },
    /// Lookup of an identifier that has no row.
    #[error("No embedding for id '{0}'")]
    UnknownId(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Errors that can occur while registering or resolving datasets.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Unknown identifier that is neither a configured dataset nor a directory.
    #[error("The dataset ID '{id}' is not supported. Supported are: {supported}")]
    UnsupportedDataset { id: String, supported: String },
    /// An archive failed its validity check before extraction.
    #[error("{} is not a valid ZIP archive", .0.display())]
    CorruptArchive(PathBuf),
    /// A required artifact is absent when resolution is attempted.
    #[error("Missing artifact: {0}")]
    MissingArtifact(String),
    /// The dataset does not provide the requested capability.
    #[error("Dataset '{id}' has no {capability}")]
    MissingCapability { id: String, capability: &'static str },
    /// The external fetch collaborator could not provide an artifact.
    #[error("Failed to fetch artifact '{name}': {reason}")]
    Fetch { name: String, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

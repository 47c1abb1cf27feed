//! Dataset identifiers and the registry that resolves them.
//!
//! Identifiers have the form `[lsr-benchmark/]<collection>[/segmented]`,
//! where `<collection>` is either a known dataset or a local corpus
//! directory. Registration only validates the identifier; artifacts are
//! fetched and extracted when a dataset is first read.

use super::artifacts::{ArtifactCache, ArtifactDescriptor, ArtifactFetcher};
use super::local::{CachedResolver, DirectoryResolver, LocalDataset};
use super::Dataset;
use crate::config::{DATASET_NAMESPACE, SEGMENTED_SUFFIX};
use crate::error::DatasetError;
use once_cell::sync::Lazy;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

const WEBIS_FILES: &str =
    "https://files.webis.de/data-in-progress/lsr-benchmark-delete-me-after-01-08-2025";

// =============================================================================
// Known Datasets
// =============================================================================

/// A dataset distributed as downloadable archives.
#[derive(Debug, Clone)]
pub struct KnownDataset {
    pub id: &'static str,
    pub inputs: ArtifactDescriptor,
    pub truths: ArtifactDescriptor,
    /// Embedding archives keyed by model name.
    pub embeddings: Vec<(String, ArtifactDescriptor)>,
}

/// All datasets with published archives.
pub static KNOWN_DATASETS: Lazy<Vec<KnownDataset>> = Lazy::new(|| {
    vec![KnownDataset {
        id: "clueweb09/en/trec-web-2009",
        inputs: ArtifactDescriptor::new(
            "inputs",
            &format!("{WEBIS_FILES}/inputs.zip"),
            "75a107e4c545a5d79c77942b5e863a16",
            421_574_669,
            "trec-web-2009-inputs.zip",
        ),
        truths: ArtifactDescriptor::new(
            "truths",
            &format!("{WEBIS_FILES}/truths.zip"),
            "f28e36759760c9520e7831aba86c4d23",
            502_691,
            "trec-web-2009-truths.zip",
        ),
        embeddings: vec![(
            "naver/splade-v3".to_string(),
            ArtifactDescriptor::new(
                "splade-v3-non-segmented",
                &format!("{WEBIS_FILES}/splade-v3-non-segmented.zip"),
                "f9131d00b4305744ac4ee0cae40bfeeb",
                127_198_049,
                "trec-web-2009-splade-v3-non-segmented.zip",
            ),
        )],
    }]
});

/// Fully qualified identifiers of every known dataset, both views.
pub static SUPPORTED_DATASETS: Lazy<Vec<String>> = Lazy::new(|| {
    KNOWN_DATASETS
        .iter()
        .flat_map(|known| {
            [false, true].map(|segmented| {
                DatasetId {
                    collection: known.id.to_string(),
                    segmented,
                }
                .to_string()
            })
        })
        .collect()
});

fn known_dataset(collection: &str) -> Option<&'static KnownDataset> {
    KNOWN_DATASETS.iter().find(|known| known.id == collection)
}

// =============================================================================
// Identifiers
// =============================================================================

/// Parsed dataset identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetId {
    /// Known dataset id or directory path.
    pub collection: String,
    /// Passage-level view.
    pub segmented: bool,
}

impl DatasetId {
    /// Splits off the optional namespace prefix and view suffix.
    pub fn parse(raw: &str) -> Self {
        let namespace = format!("{DATASET_NAMESPACE}/");
        let rest = raw.strip_prefix(&namespace).unwrap_or(raw);
        match rest.strip_suffix(SEGMENTED_SUFFIX) {
            Some(collection) if !collection.is_empty() => Self {
                collection: collection.to_string(),
                segmented: true,
            },
            _ => Self {
                collection: rest.to_string(),
                segmented: false,
            },
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DATASET_NAMESPACE}/{}", self.collection)?;
        if self.segmented {
            f.write_str(SEGMENTED_SUFFIX)?;
        }
        Ok(())
    }
}

enum Origin {
    Known(&'static KnownDataset),
    Directory(PathBuf),
}

// =============================================================================
// Registry
// =============================================================================

/// Registered datasets, keyed by canonical identifier.
///
/// Both views of a collection share one backend, so its artifacts are
/// resolved once no matter which view reads first.
pub struct DatasetRegistry {
    home: PathBuf,
    fetcher: Rc<dyn ArtifactFetcher>,
    backends: HashMap<String, Rc<LocalDataset>>,
    datasets: HashMap<String, Dataset>,
}

impl DatasetRegistry {
    /// An empty registry caching known datasets under `home`.
    pub fn new(home: &Path, fetcher: Rc<dyn ArtifactFetcher>) -> Self {
        Self {
            home: home.to_path_buf(),
            fetcher,
            backends: HashMap::new(),
            datasets: HashMap::new(),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Validates `id` and registers it if it is new.
    ///
    /// Registering an identifier twice returns the existing dataset.
    ///
    /// # Errors
    ///
    /// [`DatasetError::UnsupportedDataset`] if `id` names neither a known
    /// dataset nor an existing directory.
    pub fn register(&mut self, id: &str) -> Result<&Dataset, DatasetError> {
        let parsed = DatasetId::parse(id);
        let (key, backend_key, origin) = Self::resolve_origin(id, parsed.clone())?;

        match self.datasets.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let backend = self
                    .backends
                    .entry(backend_key.clone())
                    .or_insert_with(|| {
                        Rc::new(Self::backend(&self.home, &self.fetcher, &backend_key, origin))
                    })
                    .clone();
                debug!("Registered dataset {}", entry.key());
                let dataset = Dataset::from_local(entry.key().clone(), parsed.segmented, backend);
                Ok(entry.insert(dataset))
            }
        }
    }

    /// Registers `id` if needed and returns the dataset.
    pub fn load(&mut self, id: &str) -> Result<Dataset, DatasetError> {
        self.register(id).cloned()
    }

    pub fn is_registered(&self, id: &str) -> bool {
        Self::resolve_origin(id, DatasetId::parse(id))
            .map(|(key, _, _)| self.datasets.contains_key(&key))
            .unwrap_or(false)
    }

    /// Canonical identifiers of all registered datasets, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.datasets.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Forgets all registrations. Cached files on disk are kept.
    pub fn clear(&mut self) {
        self.datasets.clear();
        self.backends.clear();
    }

    /// Returns the registry key, the backend key and where the data lives.
    fn resolve_origin(raw: &str, parsed: DatasetId) -> Result<(String, String, Origin), DatasetError> {
        if let Some(known) = known_dataset(&parsed.collection) {
            return Ok((parsed.to_string(), known.id.to_string(), Origin::Known(known)));
        }

        let directory = if Path::new(&parsed.collection).is_dir() {
            Some((PathBuf::from(&parsed.collection), parsed.segmented))
        } else {
            // A directory whose own name ends in the view suffix.
            let rest = raw
                .strip_prefix(&format!("{DATASET_NAMESPACE}/"))
                .unwrap_or(raw);
            Path::new(rest).is_dir().then(|| (PathBuf::from(rest), false))
        };

        match directory {
            Some((path, segmented)) => {
                let path = path.canonicalize()?;
                let backend_key = path.display().to_string();
                let key = if segmented {
                    format!("{backend_key}{SEGMENTED_SUFFIX}")
                } else {
                    backend_key.clone()
                };
                Ok((key, backend_key, Origin::Directory(path)))
            }
            None => Err(DatasetError::UnsupportedDataset {
                id: raw.to_string(),
                supported: SUPPORTED_DATASETS.join(", "),
            }),
        }
    }

    fn backend(
        home: &Path,
        fetcher: &Rc<dyn ArtifactFetcher>,
        backend_key: &str,
        origin: Origin,
    ) -> LocalDataset {
        match origin {
            Origin::Known(known) => {
                let cache = ArtifactCache::new(
                    &ArtifactCache::dataset_dir(home, known.id),
                    Rc::clone(fetcher),
                );
                let resolver = CachedResolver::new(
                    cache,
                    known.inputs.clone(),
                    known.truths.clone(),
                    known.embeddings.clone(),
                );
                LocalDataset::new(backend_key, Box::new(resolver))
            }
            Origin::Directory(path) => {
                LocalDataset::new(backend_key, Box::new(DirectoryResolver::new(&path)))
            }
        }
    }
}

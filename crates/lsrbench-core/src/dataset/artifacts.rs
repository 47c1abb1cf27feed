//! Archive artifacts of known datasets: fetching, caching and extraction.
//!
//! Each known dataset ships as a few zip archives (corpus inputs, truths,
//! embeddings per model). An archive is fetched into the dataset's cache
//! directory once and extracted next to itself:
//!
//! ```text
//! <home>/clueweb09-en-trec-web-2009/
//! ├── trec-web-2009-inputs.zip
//! ├── trec-web-2009-inputs-extracted/
//! ├── trec-web-2009-truths.zip
//! └── trec-web-2009-truths-extracted/
//! ```
//!
//! Downloading is not done here. An [`ArtifactFetcher`] is handed the
//! descriptor and the target path and must place the archive there.

use crate::config::EXTRACTED_SUFFIX;
use crate::corpus::io::{persist, temp_sibling};
use crate::error::DatasetError;
use md5::{Digest, Md5};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::ZipArchive;

/// Where to obtain one archive and how to recognize it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// Logical name, e.g. `inputs` or `truths`.
    pub name: String,
    pub url: String,
    /// Hex md5 of the archive.
    pub md5: String,
    /// Archive size in bytes.
    pub size_hint: u64,
    /// File name of the archive inside the dataset's cache directory.
    pub cache_path: String,
}

impl ArtifactDescriptor {
    pub fn new(name: &str, url: &str, md5: &str, size_hint: u64, cache_path: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            md5: md5.to_string(),
            size_hint,
            cache_path: cache_path.to_string(),
        }
    }
}

// =============================================================================
// Fetchers
// =============================================================================

/// Places a described archive at a target path.
///
/// Implementations own any retry policy. The target must only appear once
/// the archive is complete.
pub trait ArtifactFetcher {
    fn fetch(&self, descriptor: &ArtifactDescriptor, target: &Path) -> Result<(), DatasetError>;
}

/// Fetcher for environments without network access. Every fetch fails with
/// a hint where the archive is expected.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

impl ArtifactFetcher for OfflineFetcher {
    fn fetch(&self, descriptor: &ArtifactDescriptor, target: &Path) -> Result<(), DatasetError> {
        Err(DatasetError::Fetch {
            name: descriptor.name.clone(),
            reason: format!(
                "offline; download {} to {}",
                descriptor.url,
                target.display()
            ),
        })
    }
}

/// Copies archives from a local mirror directory, verifying size and md5.
#[derive(Debug, Clone)]
pub struct LocalMirrorFetcher {
    mirror: PathBuf,
}

impl LocalMirrorFetcher {
    pub fn new(mirror: &Path) -> Self {
        Self {
            mirror: mirror.to_path_buf(),
        }
    }
}

impl ArtifactFetcher for LocalMirrorFetcher {
    fn fetch(&self, descriptor: &ArtifactDescriptor, target: &Path) -> Result<(), DatasetError> {
        let fail = |reason: String| DatasetError::Fetch {
            name: descriptor.name.clone(),
            reason,
        };

        let source = self.mirror.join(&descriptor.cache_path);
        let size = match fs::metadata(&source) {
            Ok(meta) => meta.len(),
            Err(_) => return Err(fail(format!("{} not in mirror", source.display()))),
        };
        if size != descriptor.size_hint {
            return Err(fail(format!(
                "expected {} bytes, mirror has {}",
                descriptor.size_hint, size
            )));
        }

        let mut tmp = temp_sibling(target)?;
        let mut reader = File::open(&source)?;
        let mut hasher = Md5::new();
        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
            tmp.write_all(&buffer[..n])?;
        }

        let digest = format!("{:x}", hasher.finalize());
        if !digest.eq_ignore_ascii_case(&descriptor.md5) {
            return Err(fail(format!(
                "md5 mismatch: expected {}, got {}",
                descriptor.md5, digest
            )));
        }

        persist(tmp, target)?;
        debug!("Copied {} from {}", descriptor.name, source.display());
        Ok(())
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// Directory an archive is extracted into: the archive path without `.zip`
/// plus `-extracted`.
pub fn extraction_dir(archive: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".zip").unwrap_or(&name);
    archive.with_file_name(format!("{stem}{EXTRACTED_SUFFIX}"))
}

/// Extracts `archive` into `target` unless `target` already exists.
///
/// Returns whether an extraction happened. Extraction runs in a temporary
/// sibling directory that is renamed to `target` when complete.
///
/// # Errors
///
/// [`DatasetError::CorruptArchive`] if `archive` is not a readable zip,
/// including members that are truncated or fail their checksum.
pub fn extract_zip(archive: &Path, target: &Path) -> Result<bool, DatasetError> {
    if target.exists() {
        return Ok(false);
    }

    // Truncated or damaged member data surfaces as an I/O error of these kinds.
    let corrupt = |e: ZipError| match e {
        ZipError::Io(e)
            if !matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData
            ) =>
        {
            DatasetError::Io(e)
        }
        _ => DatasetError::CorruptArchive(archive.to_path_buf()),
    };

    let mut zip = ZipArchive::new(File::open(archive)?).map_err(corrupt)?;

    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".extracting-")
        .tempdir_in(parent)?;
    zip.extract(staging.path()).map_err(corrupt)?;

    // The staging guard's cleanup is a no-op once the directory is renamed.
    fs::rename(staging.path(), target)?;
    info!("Extracted {} to {}", archive.display(), target.display());
    Ok(true)
}

// =============================================================================
// Cache
// =============================================================================

/// Per-dataset cache directory that resolves descriptors to extracted
/// directories.
#[derive(Clone)]
pub struct ArtifactCache {
    directory: PathBuf,
    fetcher: Rc<dyn ArtifactFetcher>,
}

impl ArtifactCache {
    pub fn new(directory: &Path, fetcher: Rc<dyn ArtifactFetcher>) -> Self {
        Self {
            directory: directory.to_path_buf(),
            fetcher,
        }
    }

    /// Cache directory of a dataset id under `home`: slashes become dashes.
    pub fn dataset_dir(home: &Path, dataset_id: &str) -> PathBuf {
        home.join(dataset_id.replace('/', "-"))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the extracted directory of `descriptor`, fetching and
    /// extracting the archive if needed.
    pub fn resolve(&self, descriptor: &ArtifactDescriptor) -> Result<PathBuf, DatasetError> {
        let archive = self.directory.join(&descriptor.cache_path);
        let extracted = extraction_dir(&archive);
        if extracted.is_dir() {
            return Ok(extracted);
        }

        if !archive.exists() {
            info!("Fetching {} ({} bytes)", descriptor.name, descriptor.size_hint);
            fs::create_dir_all(&self.directory)?;
            self.fetcher.fetch(descriptor, &archive)?;
        }
        extract_zip(&archive, &extracted)?;
        Ok(extracted)
    }
}

//! Path resolution and registry setup for the CLI.
//!
//! The artifact cache home is resolved in this order:
//! 1. `--cache-dir`
//! 2. `$LSR_BENCHMARK_HOME`
//! 3. The platform data directory

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use lsrbench_core::config::HOME_ENV;
use lsrbench_core::dataset::{ArtifactFetcher, DatasetRegistry, LocalMirrorFetcher, OfflineFetcher};
use std::path::PathBuf;
use std::rc::Rc;

/// Returns the artifact cache home.
///
/// Platform locations:
/// - macOS: `~/Library/Application Support/de.webis.lsr-benchmark/`
/// - Linux: `~/.local/share/lsr-benchmark/`
/// - Windows: `%APPDATA%\webis\lsr-benchmark\data\`
pub fn cache_home(custom_dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = custom_dir {
        return Ok(dir.clone());
    }

    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    ProjectDirs::from("de", "webis", "lsr-benchmark")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine cache directory, set ${}", HOME_ENV))
}

/// Archive fetcher: a local mirror when given, otherwise offline.
pub fn fetcher(mirror: Option<&PathBuf>) -> Rc<dyn ArtifactFetcher> {
    match mirror {
        Some(dir) => Rc::new(LocalMirrorFetcher::new(dir)),
        None => Rc::new(OfflineFetcher),
    }
}

/// Creates a dataset registry rooted at the resolved cache home.
pub fn open_registry(
    custom_dir: Option<&PathBuf>,
    mirror: Option<&PathBuf>,
) -> Result<DatasetRegistry> {
    let home = cache_home(custom_dir)?;
    tracing::info!("Using cache home {}", home.display());
    Ok(DatasetRegistry::new(&home, fetcher(mirror)))
}

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::archive::extract_zip;
use crate::error::CacheError;
use crate::fetcher::Downloader;
use crate::store::{Store, atomic_rename_dir, is_materialized, move_file, move_matching};
use crate::transport::Transport;

#[derive(Debug, Clone, Serialize)]
pub struct InstallResult {
    pub dataset: String,
    pub subfolder: Option<String>,
    pub path: String,
    pub action: String,
    pub flattened: bool,
}

/// Installs remote zip archives into the cache store. Every operation is
/// idempotent against the directory it targets: an existing target is taken
/// as proof of a completed earlier run and skipped.
pub struct Installer<T: Transport> {
    store: Store,
    downloader: Downloader<T>,
}

impl<T: Transport> Installer<T> {
    pub fn new(store: Store, transport: T) -> Self {
        Self {
            store,
            downloader: Downloader::new(transport),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn downloader(&self) -> &Downloader<T> {
        &self.downloader
    }

    /// Extracts `zip_path` into `dest` unless `dest/existence_test` already
    /// exists (an empty `existence_test` tests `dest` itself). Extraction
    /// is staged in a `_tmp` sibling directory and published with a single
    /// rename, so `dest` is only ever observed fully populated. Returns
    /// whether extraction actually ran.
    pub fn extract(
        &self,
        zip_path: &Path,
        dest: &Path,
        existence_test: &str,
    ) -> Result<bool, CacheError> {
        let marker = if existence_test.is_empty() {
            dest.to_path_buf()
        } else {
            dest.join(existence_test)
        };
        if is_materialized(&marker) {
            info!(
                "skipping unzip of {} as unzip path exists: {}",
                zip_path.display(),
                marker.display()
            );
            return Ok(false);
        }

        info!("unzipping {} to {}", zip_path.display(), dest.display());
        let tmp = tmp_sibling_dir(dest);
        if let Err(err) = extract_zip(zip_path, &tmp) {
            let _ = fs::remove_dir_all(&tmp);
            return Err(err);
        }
        atomic_rename_dir(&tmp, dest).map_err(|err| CacheError::Filesystem(err.to_string()))?;
        Ok(true)
    }

    /// Downloads the archive at `url` and extracts it into
    /// `cache_root/dataset[/subfolder]`. The whole operation is skipped
    /// when that directory already exists. With `flatten`, a sole top-level
    /// extracted directory is promoted one level up; flattening re-runs on
    /// every call, including calls that skipped the install.
    pub fn download_and_install(
        &self,
        url: &str,
        dataset: &str,
        subfolder: Option<&str>,
        flatten: bool,
    ) -> Result<InstallResult, CacheError> {
        let target = self.store.dataset_dir(dataset, subfolder);
        let target = target.as_std_path();

        let action = if is_materialized(target) {
            info!(
                "skipping {dataset} as unzip path exists: {}",
                target.display()
            );
            "skipped"
        } else {
            let scratch =
                tempfile::tempdir().map_err(|err| CacheError::Filesystem(err.to_string()))?;
            let zip_path = scratch.path().join(format!("{dataset}.zip"));
            self.downloader.download(url, &zip_path)?;
            self.extract(&zip_path, target, "")?;
            "installed"
        };

        let flattened = if flatten { flatten_dir(target)? } else { false };

        Ok(InstallResult {
            dataset: dataset.to_string(),
            subfolder: subfolder.map(str::to_string),
            path: target.display().to_string(),
            action: action.to_string(),
            flattened,
        })
    }

    /// Downloads and extracts the archive at `url` in a private scratch
    /// directory, then keeps only the files whose names match `patterns`
    /// under `cache_root/dataset`. Everything else, including the scratch
    /// directory, is discarded; zero matches is not an error.
    pub fn keep_subset(
        &self,
        url: &str,
        patterns: &[String],
        dataset: &str,
    ) -> Result<InstallResult, CacheError> {
        let target = self.store.dataset_dir(dataset, None);
        let target = target.as_std_path();

        if is_materialized(target) {
            info!(
                "skipping {dataset} as unzip path exists: {}",
                target.display()
            );
            return Ok(InstallResult {
                dataset: dataset.to_string(),
                subfolder: None,
                path: target.display().to_string(),
                action: "skipped".to_string(),
                flattened: false,
            });
        }

        let scratch =
            tempfile::tempdir().map_err(|err| CacheError::Filesystem(err.to_string()))?;
        let zip_path = scratch.path().join(format!("{dataset}.zip"));
        info!("downloading to {}", zip_path.display());
        self.downloader.download(url, &zip_path)?;

        let extracted = scratch.path().join(dataset);
        self.extract(&zip_path, &extracted, "")?;
        move_matching(patterns, &extracted, target)?;

        Ok(InstallResult {
            dataset: dataset.to_string(),
            subfolder: None,
            path: target.display().to_string(),
            action: "installed".to_string(),
            flattened: false,
        })
    }
}

/// Promotes the contents of a sole top-level directory up into `target` and
/// removes the emptied directory. A single top-level file is left alone;
/// anything else is ambiguous and skipped with a warning. Note that a
/// flattened tree whose contents are themselves a single directory will
/// flatten again on a later call; callers relying on flatten re-evaluation
/// accept that.
fn flatten_dir(target: &Path) -> Result<bool, CacheError> {
    let mut entries = Vec::new();
    let dir = fs::read_dir(target).map_err(|err| CacheError::Filesystem(err.to_string()))?;
    for entry in dir {
        let entry = entry.map_err(|err| CacheError::Filesystem(err.to_string()))?;
        entries.push(entry.path());
    }

    match entries.as_slice() {
        [] => Ok(false),
        [only] if only.is_dir() => {
            info!("flattening directory structure for {}", target.display());
            let children = fs::read_dir(only).map_err(|err| CacheError::Filesystem(err.to_string()))?;
            for child in children {
                let child = child.map_err(|err| CacheError::Filesystem(err.to_string()))?;
                let from = child.path();
                let to = target.join(child.file_name());
                move_file_or_dir(&from, &to)?;
            }
            fs::remove_dir(only).map_err(|err| CacheError::Filesystem(err.to_string()))?;
            Ok(true)
        }
        [_only_file] => Ok(false),
        _ => {
            warn!(
                "not flattening {}: more than one top-level entry",
                target.display()
            );
            Ok(false)
        }
    }
}

fn move_file_or_dir(from: &Path, to: &Path) -> Result<(), CacheError> {
    if from.is_dir() {
        fs::rename(from, to).map_err(|err| CacheError::Filesystem(err.to_string()))
    } else {
        move_file(from, to)
    }
}

fn tmp_sibling_dir(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push("_tmp");
    PathBuf::from(name)
}

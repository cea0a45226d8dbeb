use std::fs;
use std::io;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use tracing::info;

use crate::error::CacheError;

/// Layout of the local dataset cache. A dataset named `era5` with subfolder
/// `2020` lives at `cache_root/era5/2020`; the existence of that directory
/// is the sole durable marker that the dataset has been materialized.
#[derive(Debug, Clone)]
pub struct Store {
    cache_root: Utf8PathBuf,
}

impl Store {
    pub fn new(cache_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
        }
    }

    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    pub fn dataset_dir(&self, dataset: &str, subfolder: Option<&str>) -> Utf8PathBuf {
        let dir = self.cache_root.join(dataset);
        match subfolder {
            Some(subfolder) => dir.join(subfolder),
            None => dir,
        }
    }
}

/// The idempotency contract: a path that exists is considered fully
/// materialized by a previous run, regardless of its contents. There is no
/// manifest or checksum behind it.
pub fn is_materialized(path: &Path) -> bool {
    path.exists()
}

pub fn atomic_rename_dir(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_dir_all(to)?;
    }
    fs::rename(from, to)
}

/// Moves the immediate children of `source` whose file name matches any of
/// `patterns` into `dest`, creating `dest` if needed. A file claimed by an
/// earlier pattern is absent for later ones, so overlapping patterns move
/// each file once. Zero matches is not an error.
pub fn move_matching(
    patterns: &[String],
    source: &Path,
    dest: &Path,
) -> Result<(), CacheError> {
    fs::create_dir_all(dest).map_err(|err| CacheError::Filesystem(err.to_string()))?;

    for pattern in patterns {
        let pattern = Pattern::new(pattern)
            .map_err(|err| CacheError::InvalidPattern(format!("{pattern}: {err}")))?;
        let entries =
            fs::read_dir(source).map_err(|err| CacheError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| CacheError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !pattern.matches(name) {
                continue;
            }
            let target = dest.join(name);
            move_file(&path, &target)?;
            info!("moved {} to {}", path.display(), target.display());
        }
    }
    Ok(())
}

/// Rename, falling back to copy+remove when source and destination are on
/// different filesystems (the scratch area is often on tmpfs).
pub fn move_file(source: &Path, dest: &Path) -> Result<(), CacheError> {
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }
    fs::copy(source, dest).map_err(|err| CacheError::Filesystem(err.to_string()))?;
    fs::remove_file(source).map_err(|err| CacheError::Filesystem(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new("data-cache");
        assert_eq!(store.dataset_dir("era5", None), "data-cache/era5");
        assert_eq!(
            store.dataset_dir("era5", Some("2020")),
            "data-cache/era5/2020"
        );
    }

    #[test]
    fn materialized_is_plain_existence() {
        let temp = tempfile::tempdir().unwrap();
        assert!(is_materialized(temp.path()));
        assert!(!is_materialized(&temp.path().join("missing")));
    }

    #[test]
    fn move_matching_filters_by_pattern() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("src");
        let dest = temp.path().join("dst");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("keep.txt"), b"k").unwrap();
        fs::write(source.join("drop.csv"), b"d").unwrap();

        move_matching(&["*.txt".to_string()], &source, &dest).unwrap();

        assert!(dest.join("keep.txt").is_file());
        assert!(!dest.join("drop.csv").exists());
        assert!(source.join("drop.csv").is_file());
    }

    #[test]
    fn overlapping_patterns_move_once() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("src");
        let dest = temp.path().join("dst");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("station.txt"), b"s").unwrap();

        move_matching(
            &["*.txt".to_string(), "station.*".to_string()],
            &source,
            &dest,
        )
        .unwrap();

        assert!(dest.join("station.txt").is_file());
        assert!(!source.join("station.txt").exists());
    }

    #[test]
    fn zero_matches_is_ok() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("src");
        let dest = temp.path().join("dst");
        fs::create_dir_all(&source).unwrap();

        move_matching(&["*.nc".to_string()], &source, &dest).unwrap();
        assert!(dest.is_dir());
    }
}

use std::fs;
use std::io;
use std::path::Path;

use zip::ZipArchive;

use crate::error::CacheError;

/// Windows MAX_PATH. Archives are refused rather than producing trees that
/// cannot be read back on that platform.
pub const MAX_EXTRACT_PATH: usize = 260;

/// Extracts `zip_path` into `target_dir`, creating it if needed. Entries
/// whose extracted path would exceed [`MAX_EXTRACT_PATH`] abort the whole
/// extraction before that entry is written; entries written earlier in the
/// same pass are left behind in `target_dir` (callers stage into a temp
/// directory and publish by rename).
pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<(), CacheError> {
    let file = fs::File::open(zip_path)
        .map_err(|err| CacheError::Filesystem(format!("open zip {}: {err}", zip_path.display())))?;
    let mut archive = ZipArchive::new(file).map_err(|err| CacheError::Archive(err.to_string()))?;

    fs::create_dir_all(target_dir).map_err(|err| CacheError::Filesystem(err.to_string()))?;
    let absolute_target = std::path::absolute(target_dir)
        .map_err(|err| CacheError::Filesystem(err.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| CacheError::Archive(err.to_string()))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => absolute_target.join(path),
            None => {
                return Err(CacheError::Archive(format!(
                    "zip entry path traversal detected: {}",
                    entry.name()
                )));
            }
        };

        let length = entry_path.as_os_str().len();
        if length > MAX_EXTRACT_PATH {
            return Err(CacheError::PathTooLong {
                limit: MAX_EXTRACT_PATH,
                length,
                path: entry_path.display().to_string(),
            });
        }

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| CacheError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| CacheError::Filesystem(err.to_string()))?;
        }
        let mut outfile = fs::File::create(&entry_path)
            .map_err(|err| CacheError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|err| CacheError::Filesystem(err.to_string()))?;
    }
    Ok(())
}

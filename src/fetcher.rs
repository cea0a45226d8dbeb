use std::ffi::OsString;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::CacheError;
use crate::progress::Progress;
use crate::transport::{Body, Transport};

/// Streaming block size, matching the transfer granularity of progress
/// updates.
pub const BLOCK_SIZE: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded,
    Skipped,
}

/// File-level fetcher. A destination that already exists is never
/// re-downloaded, and a failed transfer never leaves a partial file at the
/// destination path: bytes land in a `.tmp` sibling that is renamed into
/// place only once the body has been fully streamed.
pub struct Downloader<T: Transport> {
    transport: T,
}

impl<T: Transport> Downloader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn download(&self, url: &str, dest: &Path) -> Result<DownloadOutcome, CacheError> {
        if dest.exists() {
            info!("skipping download of {}; it already exists", dest.display());
            return Ok(DownloadOutcome::Skipped);
        }

        info!("downloading from {url}");
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|err| CacheError::Filesystem(err.to_string()))?;
        }

        let tmp = tmp_sibling(dest);
        let body = self.transport.open(url)?;
        if let Err(err) = stream_to(body, &tmp, url) {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
        fs::rename(&tmp, dest).map_err(|err| CacheError::Filesystem(err.to_string()))?;
        info!("download complete: {}", dest.display());
        Ok(DownloadOutcome::Downloaded)
    }
}

fn tmp_sibling(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn stream_to(mut body: Body, tmp: &Path, url: &str) -> Result<(), CacheError> {
    let mut out = fs::File::create(tmp).map_err(|err| CacheError::Filesystem(err.to_string()))?;
    let mut progress = Progress::new(body.content_length);
    let mut buf = vec![0u8; BLOCK_SIZE];
    loop {
        let read = body
            .reader
            .read(&mut buf)
            .map_err(|err| CacheError::Transfer {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        if read == 0 {
            break;
        }
        out.write_all(&buf[..read])
            .map_err(|err| CacheError::Transfer {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        progress.advance(read as u64);
    }
    progress.finish();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_sibling_appends_suffix() {
        let tmp = tmp_sibling(Path::new("/cache/era5/data.zip"));
        assert_eq!(tmp, Path::new("/cache/era5/data.zip.tmp"));
    }
}

use std::io::{self, Cursor, Read};
use std::sync::Mutex;

use assert_matches::assert_matches;

use datacache::error::CacheError;
use datacache::fetcher::{DownloadOutcome, Downloader};
use datacache::transport::{Body, Transport};

struct MockTransport {
    payload: Vec<u8>,
    calls: Mutex<usize>,
}

impl MockTransport {
    fn new(payload: &[u8]) -> Self {
        Self {
            payload: payload.to_vec(),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Transport for MockTransport {
    fn open(&self, _url: &str) -> Result<Body, CacheError> {
        *self.calls.lock().unwrap() += 1;
        Ok(Body {
            reader: Box::new(Cursor::new(self.payload.clone())),
            content_length: Some(self.payload.len() as u64),
        })
    }
}

/// Yields a prefix of bytes, then fails as an interrupted connection.
struct InterruptedReader {
    prefix: Vec<u8>,
    offset: usize,
}

impl Read for InterruptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.offset < self.prefix.len() {
            let n = buf.len().min(self.prefix.len() - self.offset);
            buf[..n].copy_from_slice(&self.prefix[self.offset..self.offset + n]);
            self.offset += n;
            return Ok(n);
        }
        Err(io::Error::other("connection reset by peer"))
    }
}

struct InterruptedTransport;

impl Transport for InterruptedTransport {
    fn open(&self, _url: &str) -> Result<Body, CacheError> {
        Ok(Body {
            reader: Box::new(InterruptedReader {
                prefix: vec![0u8; 100_000],
                offset: 0,
            }),
            content_length: Some(1_000_000),
        })
    }
}

#[test]
fn downloads_to_destination() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("nested/dir/data.bin");
    let downloader = Downloader::new(MockTransport::new(b"payload"));

    let outcome = downloader
        .download("https://example.com/data.bin", &dest)
        .unwrap();

    assert_eq!(outcome, DownloadOutcome::Downloaded);
    assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
}

#[test]
fn second_download_is_a_no_op() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("data.bin");
    let downloader = Downloader::new(MockTransport::new(b"payload"));

    let first = downloader
        .download("https://example.com/data.bin", &dest)
        .unwrap();
    let second = downloader
        .download("https://example.com/data.bin", &dest)
        .unwrap();

    assert_eq!(first, DownloadOutcome::Downloaded);
    assert_eq!(second, DownloadOutcome::Skipped);
    assert_eq!(downloader.transport().calls(), 1);
    assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
}

#[test]
fn existing_file_is_never_transferred() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("data.bin");
    std::fs::write(&dest, b"original").unwrap();
    let downloader = Downloader::new(MockTransport::new(b"replacement"));

    let outcome = downloader
        .download("https://example.com/data.bin", &dest)
        .unwrap();

    assert_eq!(outcome, DownloadOutcome::Skipped);
    assert_eq!(downloader.transport().calls(), 0);
    assert_eq!(std::fs::read(&dest).unwrap(), b"original");
}

#[test]
fn interrupted_download_leaves_no_file() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("data.bin");
    let downloader = Downloader::new(InterruptedTransport);

    let err = downloader
        .download("https://example.com/data.bin", &dest)
        .unwrap_err();

    assert_matches!(err, CacheError::Transfer { .. });
    assert!(!dest.exists());
    assert!(!temp.path().join("data.bin.tmp").exists());
}

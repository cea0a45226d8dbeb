use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CacheError {
    #[error("failed to build http client: {0}")]
    Client(String),

    #[error("transfer failed for {url}: {reason}")]
    Transfer { url: String, reason: String },

    #[error("{url} returned status {status}")]
    TransferStatus { url: String, status: u16 },

    #[error(
        "extraction path too long for Windows (max {limit} chars), it is {length} characters: {path}"
    )]
    PathTooLong {
        limit: usize,
        length: usize,
        path: String,
    },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("invalid glob pattern: {0}")]
    InvalidPattern(String),
}

impl CacheError {
    pub fn from_io(err: std::io::Error) -> Self {
        CacheError::Filesystem(err.to_string())
    }
}

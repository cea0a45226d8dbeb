//! Idempotent dataset fetching into a local cache.
//!
//! The crate downloads remote archives and plain files, extracts them and
//! optionally normalizes the extracted layout. Re-running any operation
//! against an already-materialized target is a cheap no-op: the existence
//! of the target path is the completion marker, and partial results are
//! never published thanks to a write-to-temp, rename-on-success discipline
//! shared by downloads and extractions.

pub mod archive;
pub mod error;
pub mod fetcher;
pub mod installer;
pub mod output;
pub mod progress;
pub mod store;
pub mod transport;

pub use error::CacheError;
pub use fetcher::{DownloadOutcome, Downloader};
pub use installer::{InstallResult, Installer};
pub use store::Store;
pub use transport::{HttpTransport, Transport};

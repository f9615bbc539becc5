//! Error types for the reconciliation engine.
//!
//! Only two conditions are fatal: an unparseable legacy export (aborts the
//! extraction pipeline) and a transport failure while listing the remote
//! inventory (aborts the audit pipeline). Everything that happens to a single
//! document is reported through [`DocumentError`] and recorded per document.

use std::path::PathBuf;
use thiserror::Error;

/// The legacy export could not be read or parsed.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to read export {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed export: {message}")]
    Malformed { message: String },
}

/// A single request to the remote asset host failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("asset host returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// The inventory fetch was aborted; whatever was listed so far is discarded.
#[derive(Debug, Error)]
#[error("inventory fetch failed on page {page}: {source}")]
pub struct InventoryFetchError {
    /// 1-based index of the page request that failed.
    pub page: usize,
    #[source]
    pub source: TransportError,
}

/// Failure while processing one document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize front matter: {0}")]
    Render(#[from] serde_yaml::Error),
}

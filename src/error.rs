//! Error types for a reconciliation run.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors. Any of these aborts the run before the snapshot is written,
/// so the next run retries the same work against the unchanged snapshot.
///
/// A 304 Not Modified is not an error; it is a recognized fetch outcome and
/// surfaces as an [`crate::github::ApiPage`] with `changed == false`.
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub answered with a status that is neither 2xx nor 304.
    #[error("GitHub API returned {status} for {url}")]
    Api {
        status: reqwest::StatusCode,
        url: String,
    },

    /// Network-level failure while talking to either platform.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Snapshot file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot document or API body did not parse.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required configuration value is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A date string (watermark or Last-Modified header) did not parse.
    #[error("date parse error: {0}")]
    Date(String),
}

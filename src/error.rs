//! Error types shared across the harvesting pipeline.
//!
//! Fetch failures carry enough context (URL or page number) to be logged
//! and skipped without aborting a run; only a failed session construction
//! is treated as fatal to the run that requested it.

use thiserror::Error;

/// Failures raised by the page-fetch layer.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP session could not be created at all. Aborts the current
    /// crawl run; the command loop and scheduler keep going.
    #[error("fetch session could not be created: {0}")]
    Session(#[source] reqwest::Error),

    /// A single request failed (timeout, connection reset, bad status).
    #[error("request for {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The listing index has no page at this number. A normal terminal
    /// signal for the crawl, not a fault.
    #[error("no listing page at index {0}")]
    Exhausted(u32),

    /// The article page loaded but its content region is missing.
    #[error("article content region missing at {0}")]
    MissingContent(String),

    #[error("invalid url: {0}")]
    BadUrl(#[from] url::ParseError),
}

impl FetchError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Request { .. })
    }
}

/// A date string the operator supplied that matches none of the accepted
/// input forms.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized date '{0}' (expected yyyy/mm/dd, yyyy-mm-dd, or yyyymmdd)")]
pub struct DateError(pub String);

/// A wall-clock string for the daily schedule that is not `HH:MM`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized schedule time '{0}' (expected HH:MM)")]
pub struct TimeError(pub String);

/// Failures while loading the province/city reference table.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("failed to read reference table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

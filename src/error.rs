//! Error taxonomy for the monitor.
//!
//! [`FetchError`] and [`ParseError`] only ever surface at the scheduler
//! boundary (wrapped in [`CycleError`]); [`QueryError`] is what HTTP callers
//! see.

use std::time::Duration;

use thiserror::Error;

/// Failure to retrieve the status document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure talking to the feed.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The feed answered with a non-success status code.
    #[error("feed returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// The fetch did not finish within the configured bound.
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid feed URL {0:?}")]
    InvalidUrl(String),

    /// Local feed file could not be read.
    #[error("failed to read feed file: {0}")]
    Io(#[from] std::io::Error),
}

/// The document was retrieved but is not a usable SIRI delivery.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("feed is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("missing <{0}> element")]
    MissingElement(&'static str),
}

/// Why a monitoring cycle was skipped.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// An identifier that is not part of the line catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid subway line {0:?}")]
pub struct InvalidLineError(pub String);

/// Errors returned to query callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("No subway line specified")]
    MissingLine,

    #[error(transparent)]
    InvalidLine(#[from] InvalidLineError),

    /// No time has elapsed since monitoring started, or it has not started.
    #[error("Uptime is undefined until monitoring has run for some time")]
    UndefinedUptime,
}

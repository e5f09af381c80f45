//! Probe errors

use thiserror::Error;

/// Errors returned by a reachability probe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The URL is not a valid http(s) URL. Retrying will not help.
    #[error("invalid registry URL {url}: {reason}")]
    InvalidUrl {
        /// URL as supplied by the caller
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Connection refused, DNS failure, TLS failure or timeout
    #[error("registry at {url} is unreachable: {reason}")]
    Unreachable {
        /// URL that was probed
        url: String,
        /// Underlying transport failure
        reason: String,
    },

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl ProbeError {
    /// Whether probing again later could succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, ProbeError::InvalidUrl { .. })
    }
}

//! Mock prober for unit testing
//!
//! Answers probes from an in-memory set of reachable URLs, so reconcilers can
//! be tested without any network access. Every probe is recorded.

use crate::error::ProbeError;
use crate::prober::{Prober, validate_url};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A recorded probe call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCall {
    /// URL that was probed
    pub url: String,
    /// Timeout the caller asked for
    pub timeout: Duration,
    /// Whether TLS verification was requested
    pub verify_tls: bool,
}

/// Mock prober for testing
///
/// URLs are unreachable until marked reachable with [`MockProber::set_reachable`].
/// Clones share state, so a test can keep a handle after boxing one.
#[derive(Debug, Clone, Default)]
pub struct MockProber {
    reachable: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<ProbeCall>>>,
}

impl MockProber {
    /// Create a mock where nothing is reachable
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `url` as reachable
    pub fn set_reachable(&self, url: impl Into<String>) {
        self.reachable.lock().unwrap().insert(url.into());
    }

    /// Mark `url` as unreachable
    pub fn set_unreachable(&self, url: &str) {
        self.reachable.lock().unwrap().remove(url);
    }

    /// All probes issued so far, in order
    pub fn calls(&self) -> Vec<ProbeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// URLs probed so far, in order
    pub fn probed_urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.url).collect()
    }
}

#[async_trait::async_trait]
impl Prober for MockProber {
    async fn probe(&self, url: &str, timeout: Duration, verify_tls: bool) -> Result<(), ProbeError> {
        self.calls.lock().unwrap().push(ProbeCall {
            url: url.to_string(),
            timeout,
            verify_tls,
        });

        validate_url(url)?;

        if self.reachable.lock().unwrap().contains(url) {
            Ok(())
        } else {
            Err(ProbeError::Unreachable {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }
}

//! HTTP reachability prober
//!
//! Implements [`Prober`] with reqwest. Two clients are built up front, one
//! verifying certificates and one accepting any certificate, so a probe never
//! has to construct a client on the hot path.

use crate::error::ProbeError;
use reqwest::{Client, Url, redirect};
use std::time::Duration;
use tracing::debug;

/// Liveness check against a registry URL
///
/// All methods must be `Send` to work with Tokio's work-stealing runtime,
/// and the trait is object safe so reconcilers can hold `Box<dyn Prober>`.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Probe `url`, waiting at most `timeout`.
    ///
    /// Any HTTP response counts as reachable. When `verify_tls` is false,
    /// certificate validation errors are ignored.
    async fn probe(&self, url: &str, timeout: Duration, verify_tls: bool) -> Result<(), ProbeError>;
}

/// Parse `url` and check that it is an http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<Url, ProbeError> {
    let parsed = Url::parse(url).map_err(|e| ProbeError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ProbeError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {}", parsed.scheme()),
        });
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ProbeError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(parsed)
}

/// reqwest-backed prober
#[derive(Debug, Clone)]
pub struct HttpProber {
    verifying: Client,
    insecure: Client,
}

impl HttpProber {
    /// Create a new prober
    pub fn new() -> Result<Self, ProbeError> {
        let verifying = Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;
        let insecure = Client::builder()
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self { verifying, insecure })
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout: Duration, verify_tls: bool) -> Result<(), ProbeError> {
        let target = validate_url(url)?;
        let client = if verify_tls { &self.verifying } else { &self.insecure };

        debug!("Probing {} (timeout {:?}, verify TLS: {})", url, timeout, verify_tls);

        let response = client
            .head(target)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ProbeError::Unreachable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        debug!("{} answered with {}", url, response.status());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_http_and_https() {
        assert!(validate_url("http://registry.example.com").is_ok());
        assert!(validate_url("https://registry.example.com:8443/index").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_garbage() {
        let err = validate_url("not a url").unwrap_err();
        assert!(matches!(err, ProbeError::InvalidUrl { ref url, .. } if url == "not a url"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        let err = validate_url("ftp://registry.example.com").unwrap_err();
        assert!(matches!(err, ProbeError::InvalidUrl { ref reason, .. } if reason.contains("ftp")));
    }

    #[tokio::test]
    async fn test_probe_invalid_url_fails_without_network() {
        let prober = HttpProber::new().expect("client should build");
        let result = prober.probe("://", Duration::from_millis(50), true).await;
        assert!(matches!(result, Err(ProbeError::InvalidUrl { .. })));
    }
}

//! Controller-specific error types.
//!
//! This module defines error types specific to the Devfile Registry Controller
//! that are not covered by upstream library errors, and classifies every
//! error as retryable or permanent for the error policy.

use crate::store::StoreError;
use kube::Error as KubeError;
use registry_probe::ProbeError;
use thiserror::Error;

/// Errors that can occur in the Devfile Registry Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes client error outside of the cluster store (client setup, discovery)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Cluster store read/write failure
    #[error("Cluster store error: {0}")]
    Store(#[from] StoreError),

    /// Registry endpoint did not answer its probe
    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Object is missing metadata needed to own children (name, namespace or uid)
    #[error("Object is missing {0}")]
    MissingObjectKey(&'static str),

    /// Live object came back as a different kind than requested
    #[error("Expected a {expected}, found a {found}")]
    KindMismatch {
        /// Kind that was requested
        expected: &'static str,
        /// Kind that came back
        found: &'static str,
    },

    /// A generated document could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Whether a later pass could succeed without operator intervention.
    ///
    /// Cluster API failures, conflicts and unreachable endpoints are retried
    /// with backoff. Malformed configuration and malformed objects are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ControllerError::Kube(_) | ControllerError::Store(_) | ControllerError::Watch(_) => true,
            ControllerError::Probe(e) => e.is_transient(),
            ControllerError::InvalidConfig(_)
            | ControllerError::MissingObjectKey(_)
            | ControllerError::KindMismatch { .. }
            | ControllerError::Serialization(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_unreachable_errors_are_transient() {
        assert!(ControllerError::Store(StoreError::Conflict("registry".to_string())).is_transient());
        assert!(ControllerError::Store(StoreError::Unavailable("etcd".to_string())).is_transient());
        assert!(
            ControllerError::Probe(ProbeError::Unreachable {
                url: "https://registry".to_string(),
                reason: "timeout".to_string(),
            })
            .is_transient()
        );
    }

    #[test]
    fn test_config_errors_are_permanent() {
        assert!(!ControllerError::InvalidConfig("bad".to_string()).is_transient());
        assert!(!ControllerError::MissingObjectKey("uid").is_transient());
        assert!(
            !ControllerError::Probe(ProbeError::InvalidUrl {
                url: "https://".to_string(),
                reason: "missing host".to_string(),
            })
            .is_transient()
        );
    }
}

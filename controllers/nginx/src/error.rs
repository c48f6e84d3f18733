//! Controller-specific error types.
//!
//! This module defines error types specific to the Nginx Controller
//! that are not covered by upstream library errors.

use kube::Error as KubeError;
use kube_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the Nginx Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes client error (client construction, watch stream)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Object store read or write failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A child written this run could not be read back yet
    #[error("Child not yet converged: {0}")]
    ChildNotConverged(String),

    /// A mutation or ownership invariant was violated
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Whether a later run of the same reconcile can succeed.
    ///
    /// Invariant violations count as transient: they are logged loudly and
    /// retried, since another actor may fix the offending object.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ControllerError::Store(e) => e.is_transient(),
            ControllerError::Kube(_)
            | ControllerError::ChildNotConverged(_)
            | ControllerError::Invariant(_)
            | ControllerError::Watch(_) => true,
            ControllerError::InvalidConfig(_) => false,
        }
    }

    /// Whether this error is a stale-write rejection
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, ControllerError::Store(e) if e.is_conflict())
    }
}

//! Object store errors

use thiserror::Error;

/// Errors that can occur when reading or writing cluster objects
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write was based on a stale resourceVersion, or the object already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other error reported by the Kubernetes API or client
    #[error("Kubernetes API error: {0}")]
    Kube(#[source] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request (e.g., object without a name or namespace)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether retrying the same operation later can succeed.
    ///
    /// Conflicts are transient: the next attempt re-reads the object.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Conflict(_) | StoreError::Unavailable(_) | StoreError::NotFound(_) => true,
            StoreError::Kube(kube::Error::Api(ae)) => ae.code == 429 || ae.code >= 500,
            StoreError::Kube(_) => true,
            StoreError::Serialization(_) | StoreError::InvalidRequest(_) => false,
        }
    }

    /// Whether this error means the object does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Whether this error is an optimistic concurrency conflict
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound(ae.message.clone()),
            kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict(ae.message.clone()),
            kube::Error::SerdeError(e) => StoreError::Serialization(e),
            other => StoreError::Kube(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_and_unavailable_are_transient() {
        assert!(StoreError::Conflict("stale".to_string()).is_transient());
        assert!(StoreError::Unavailable("connection refused".to_string()).is_transient());
        assert!(StoreError::NotFound("gone".to_string()).is_transient());
    }

    #[test]
    fn test_invalid_request_is_permanent() {
        assert!(!StoreError::InvalidRequest("missing name".to_string()).is_transient());
    }

    #[test]
    fn test_serde_error_maps_to_serialization() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StoreError::from(kube::Error::SerdeError(serde_err));
        assert!(matches!(err, StoreError::Serialization(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_error_messages() {
        let err = StoreError::NotFound("deployments \"deploy-web\" not found".to_string());
        assert_eq!(err.to_string(), "Not found: deployments \"deploy-web\" not found");
        assert!(err.is_not_found());
        assert!(StoreError::Conflict(String::new()).is_conflict());
    }
}

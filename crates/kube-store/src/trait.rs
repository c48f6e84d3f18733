//! ObjectStore trait for mocking
//!
//! This trait abstracts access to one Kubernetes resource kind so the
//! reconciler can run against the API server or an in-memory store.

use crate::error::StoreError;

/// Typed, namespaced access to objects of kind `K`
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Objects handed to `create`, `update` and `update_status` carry their own
/// namespace and name in `metadata`.
#[async_trait::async_trait]
pub trait ObjectStore<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    /// Fetch an object by name. `Ok(None)` when it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError>;

    /// List objects in a namespace, optionally filtered by an equality label
    /// selector (`key=value,key=value`).
    async fn list(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<K>, StoreError>;

    /// Create a new object. Fails with `Conflict` if the name is taken.
    async fn create(&self, obj: &K) -> Result<K, StoreError>;

    /// Replace spec and metadata of an existing object.
    ///
    /// The write is rejected with `Conflict` when `metadata.resourceVersion`
    /// is stale. The status subresource is left untouched.
    async fn update(&self, obj: &K) -> Result<K, StoreError>;

    /// Delete an object by name. Fails with `NotFound` if it is already gone.
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    /// Write only the status subresource of an existing object.
    ///
    /// Rejected with `Conflict` when `metadata.resourceVersion` is stale.
    async fn update_status(&self, obj: &K) -> Result<K, StoreError>;
}

//! Kubernetes API backed store
//!
//! Implements [`ObjectStore`] on top of `kube::Api` for namespaced kinds.

use crate::error::StoreError;
use crate::store_trait::ObjectStore;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use k8s_openapi::NamespaceResourceScope;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::marker::PhantomData;
use tracing::debug;

/// Object store talking to the Kubernetes API server
pub struct KubeStore<K> {
    client: Client,
    field_manager: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeStore<K> {
    /// Create a store for kind `K`
    ///
    /// # Arguments
    /// * `client` - Kubernetes client
    /// * `field_manager` - Name recorded in `managedFields` for our writes
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            _kind: PhantomData,
        }
    }
}

impl<K> Clone for KubeStore<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            field_manager: self.field_manager.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> Debug for KubeStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("kind", &std::any::type_name::<K>())
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(self.field_manager.clone()),
        }
    }
}

/// Namespace and name of an object about to be written
fn identity<K: Resource>(obj: &K) -> Result<(String, String), StoreError> {
    let namespace = obj
        .meta()
        .namespace
        .clone()
        .ok_or_else(|| StoreError::InvalidRequest(format!("{} has no namespace", std::any::type_name::<K>())))?;
    let name = obj
        .meta()
        .name
        .clone()
        .ok_or_else(|| StoreError::InvalidRequest(format!("{} has no name", std::any::type_name::<K>())))?;
    Ok((namespace, name))
}

#[async_trait::async_trait]
impl<K> ObjectStore<K> for KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static,
    <K as Resource>::DynamicType: Default,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn list(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<K>, StoreError> {
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let list = self.api(namespace).list(&params).await?;
        Ok(list.items)
    }

    async fn create(&self, obj: &K) -> Result<K, StoreError> {
        let (namespace, name) = identity(obj)?;
        debug!("Creating {} {}/{}", K::kind(&Default::default()), namespace, name);
        Ok(self.api(&namespace).create(&self.post_params(), obj).await?)
    }

    async fn update(&self, obj: &K) -> Result<K, StoreError> {
        let (namespace, name) = identity(obj)?;
        if obj.resource_version().is_none() {
            return Err(StoreError::InvalidRequest(format!(
                "update of {}/{} requires a resourceVersion",
                namespace, name
            )));
        }
        debug!("Replacing {} {}/{}", K::kind(&Default::default()), namespace, name);
        Ok(self.api(&namespace).replace(&name, &self.post_params(), obj).await?)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        debug!("Deleting {} {}/{}", K::kind(&Default::default()), namespace, name);
        self.api(namespace)
            .delete(name, &DeleteParams::background())
            .await?;
        Ok(())
    }

    async fn update_status(&self, obj: &K) -> Result<K, StoreError> {
        let (namespace, name) = identity(obj)?;
        let value = serde_json::to_value(obj)?;
        let status = value.get("status").cloned().unwrap_or(serde_json::Value::Null);

        // resourceVersion in the patch body acts as a precondition
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": obj.resource_version() },
            "status": status,
        });
        let params = PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..PatchParams::default()
        };

        debug!("Patching status of {} {}/{}", K::kind(&Default::default()), namespace, name);
        Ok(self
            .api(&namespace)
            .patch_status(&name, &params, &Patch::Merge(&patch))
            .await?)
    }
}

//! Helper functions for common reconciliation patterns
//!
//! - [`create_or_update`]: fetch-or-initialize, mutate, write only if different
//! - [`MergePolicy`]: how a mutation treats a field someone else may have set
//! - [`set_controller_reference`]: ownership back-reference from child to `Nginx`

use crate::error::ControllerError;
use crds::Nginx;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::Resource;
use kube_store::ObjectStore;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// What `create_or_update` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    /// Object did not exist and was created
    Created,
    /// Object existed and differed after mutation
    Updated,
    /// Object already matched; nothing was written
    Unchanged,
}

impl OperationResult {
    /// Whether a write reached the store
    #[must_use]
    pub fn is_write(self) -> bool {
        !matches!(self, OperationResult::Unchanged)
    }
}

/// Per-field write policy for mutation functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Always replace with the desired value
    Overwrite,
    /// Only fill the field when it is absent; never replace a present value
    SetIfAbsent,
}

impl MergePolicy {
    /// Apply `desired` to `field` under this policy
    pub fn apply<T: FieldValue>(self, field: &mut T, desired: T) {
        match self {
            MergePolicy::Overwrite => *field = desired,
            MergePolicy::SetIfAbsent => {
                if field.is_absent() {
                    *field = desired;
                }
            }
        }
    }
}

/// A field value that can be "absent" for [`MergePolicy::SetIfAbsent`]
pub trait FieldValue {
    /// Whether the field counts as unset
    fn is_absent(&self) -> bool;
}

impl<T> FieldValue for Option<T> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

impl<T> FieldValue for Vec<T> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl FieldValue for BTreeMap<String, String> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl FieldValue for LabelSelector {
    fn is_absent(&self) -> bool {
        self.match_labels.as_ref().is_none_or(BTreeMap::is_empty)
            && self.match_expressions.as_ref().is_none_or(Vec::is_empty)
    }
}

/// Fetch `namespace/name`, apply `mutate`, and persist only if something changed
///
/// An absent object starts as `K::default()` carrying the identity. The
/// mutation must not change that identity.
pub async fn create_or_update<K, F>(
    store: &dyn ObjectStore<K>,
    namespace: &str,
    name: &str,
    mutate: F,
) -> Result<(K, OperationResult), ControllerError>
where
    K: Resource<DynamicType = ()> + Clone + Default + PartialEq + Send + Sync + 'static,
    F: FnOnce(&mut K) -> Result<(), ControllerError> + Send,
{
    let kind = K::kind(&());
    let existing = store.get(namespace, name).await?;

    let mut desired = existing.clone().unwrap_or_else(|| {
        let mut obj = K::default();
        obj.meta_mut().name = Some(name.to_string());
        obj.meta_mut().namespace = Some(namespace.to_string());
        obj
    });
    mutate(&mut desired)?;

    if desired.meta().name.as_deref() != Some(name) || desired.meta().namespace.as_deref() != Some(namespace) {
        return Err(ControllerError::Invariant(format!(
            "mutation changed the identity of {} {}/{}",
            kind, namespace, name
        )));
    }

    match existing {
        None => {
            let created = store.create(&desired).await?;
            info!("Created {} {}/{}", kind, namespace, name);
            Ok((created, OperationResult::Created))
        }
        Some(current) if current == desired => {
            debug!("{} {}/{} already up to date", kind, namespace, name);
            Ok((current, OperationResult::Unchanged))
        }
        Some(_) => {
            let updated = store.update(&desired).await?;
            info!("Updated {} {}/{}", kind, namespace, name);
            Ok((updated, OperationResult::Updated))
        }
    }
}

/// Record `owner` as the controlling owner of a child
///
/// Idempotent for the same owner. Fails when a different object already
/// controls the child.
pub fn set_controller_reference(meta: &mut ObjectMeta, owner: &Nginx) -> Result<(), ControllerError> {
    let owner_ref = owner.controller_owner_ref(&()).ok_or_else(|| {
        ControllerError::Invariant(format!(
            "Nginx {} has no uid yet, cannot own children",
            owner.meta().name.as_deref().unwrap_or("<unnamed>")
        ))
    })?;

    let refs = meta.owner_references.get_or_insert_with(Vec::new);
    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner_ref.uid)
    {
        return Err(ControllerError::Invariant(format!(
            "{}/{} is already controlled by {} {}",
            meta.namespace.as_deref().unwrap_or_default(),
            meta.name.as_deref().unwrap_or("<unnamed>"),
            other.kind,
            other.name
        )));
    }

    match refs.iter_mut().find(|r| r.uid == owner_ref.uid) {
        Some(existing) => *existing = owner_ref,
        None => refs.push(owner_ref),
    }
    Ok(())
}

#[cfg(test)]
#[path = "reconcile_helpers_test.rs"]
mod reconcile_helpers_test;

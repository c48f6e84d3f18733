//! Owner index: which `Nginx` controls which children.
//!
//! Rebuilt from a fresh listing on every reconcile; nothing here is cached
//! between runs.

use crds::Nginx;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use std::collections::{BTreeMap, BTreeSet};

/// The controller owner reference of `obj`, if it points at an `Nginx`
///
/// Matched on group and kind so a version bump of the resource keeps its
/// children.
pub fn nginx_controller_of<K: Resource>(obj: &K) -> Option<&OwnerReference> {
    let group = Nginx::group(&());
    let kind = Nginx::kind(&());
    obj.owner_references().iter().find(|r| {
        r.controller == Some(true)
            && r.kind == kind
            && r.api_version.split('/').next() == Some(&*group)
    })
}

/// Owner name to the names of the children it controls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerIndex {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl OwnerIndex {
    /// Index `children` by their `Nginx` controller
    pub fn build<'a, K, I>(children: I) -> Self
    where
        K: Resource + 'a,
        I: IntoIterator<Item = &'a K>,
    {
        let mut entries: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for child in children {
            if let Some(owner) = nginx_controller_of(child) {
                entries
                    .entry(owner.name.clone())
                    .or_default()
                    .insert(child.name_any());
            }
        }
        Self { entries }
    }

    /// Children controlled by the `Nginx` named `owner`
    pub fn owned_by(&self, owner: &str) -> impl Iterator<Item = &str> {
        self.entries
            .get(owner)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }

    /// Number of owners with at least one child
    #[cfg(test)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no child has an `Nginx` controller
    #[cfg(test)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

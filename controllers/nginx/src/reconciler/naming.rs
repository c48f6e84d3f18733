//! Child naming and labelling policy.
//!
//! Cleanup and convergence both derive child identities from here, so a
//! change to the policy renames children instead of duplicating them.

use std::collections::BTreeMap;

/// Value of the `app` label on every managed child
pub const APP_LABEL_VALUE: &str = "nginx";

/// Container name in the pod template
pub const CONTAINER_NAME: &str = "nginx";

/// Container image in the pod template
pub const CONTAINER_IMAGE: &str = "nginx:latest";

/// Port exposed by the Service and targeted on the pods
pub const HTTP_PORT: i32 = 80;

/// Names of the children owned by one `Nginx`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildNames {
    /// Deployment name
    pub deployment: String,
    /// Service name
    pub service: String,
}

impl ChildNames {
    /// Children of the `Nginx` named `name`
    #[must_use]
    pub fn for_nginx(name: &str) -> Self {
        Self {
            deployment: format!("deploy-{}", name),
            service: format!("service-{}", name),
        }
    }
}

/// Labels put on the Deployment selector and pod template
#[must_use]
pub fn workload_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), APP_LABEL_VALUE.to_string()),
        ("controller".to_string(), name.to_string()),
    ])
}

/// Service selector; a subset of [`workload_labels`]
#[must_use]
pub fn service_selector(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("controller".to_string(), name.to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_names() {
        let names = ChildNames::for_nginx("web");
        assert_eq!(names.deployment, "deploy-web");
        assert_eq!(names.service, "service-web");
    }

    #[test]
    fn test_service_selector_targets_workload() {
        let labels = workload_labels("web");
        for (key, value) in service_selector("web") {
            assert_eq!(labels.get(&key), Some(&value));
        }
    }
}

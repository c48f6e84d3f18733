//! Deployment mutation.
//!
//! Fills in the fields of the Deployment this controller owns. Fields set
//! by users or other controllers are left alone unless the policy table
//! says the controller is authoritative for them.

use super::naming::{CONTAINER_IMAGE, CONTAINER_NAME, workload_labels};
use crate::error::ControllerError;
use crate::reconcile_helpers::{MergePolicy, set_controller_reference};
use crds::Nginx;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Container;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::ResourceExt;

/// Merge policy per controller-managed Deployment field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentFieldPolicy {
    /// `spec.replicas`
    pub replicas: MergePolicy,
    /// `spec.selector` (immutable once created)
    pub selector: MergePolicy,
    /// `spec.template.metadata.labels`
    pub template_labels: MergePolicy,
    /// `spec.template.spec.containers`
    pub containers: MergePolicy,
}

impl Default for DeploymentFieldPolicy {
    fn default() -> Self {
        Self {
            replicas: MergePolicy::Overwrite,
            selector: MergePolicy::SetIfAbsent,
            template_labels: MergePolicy::SetIfAbsent,
            containers: MergePolicy::SetIfAbsent,
        }
    }
}

/// Bring `deployment` in line with `nginx` under `policy`
pub fn mutate_deployment(
    deployment: &mut Deployment,
    nginx: &Nginx,
    policy: &DeploymentFieldPolicy,
) -> Result<(), ControllerError> {
    let owner = nginx.name_any();
    let labels = workload_labels(&owner);

    let spec = deployment.spec.get_or_insert_with(Default::default);
    policy
        .replicas
        .apply(&mut spec.replicas, Some(nginx.spec.desired_replicas()));
    policy.selector.apply(
        &mut spec.selector,
        LabelSelector {
            match_labels: Some(labels.clone()),
            match_expressions: None,
        },
    );

    let template_meta = spec.template.metadata.get_or_insert_with(Default::default);
    policy.template_labels.apply(&mut template_meta.labels, Some(labels));

    let pod_spec = spec.template.spec.get_or_insert_with(Default::default);
    policy.containers.apply(
        &mut pod_spec.containers,
        vec![Container {
            name: CONTAINER_NAME.to_string(),
            image: Some(CONTAINER_IMAGE.to_string()),
            ..Default::default()
        }],
    );

    set_controller_reference(&mut deployment.metadata, nginx)
}

//! Status reduction.
//!
//! Folds what the children report back into `NginxStatus`. The comparison
//! is pure; the reconciler writes only when a field changed.

use crds::NginxStatus;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;

/// Child state as read back after convergence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedState {
    /// Name of the Deployment read back
    pub deployment_name: String,
    /// Name of the Service read back
    pub service_name: String,
    /// `status.availableReplicas` of the Deployment, never negative
    pub available_replicas: i32,
    /// `spec.clusterIP` of the Service
    pub cluster_ip: String,
    /// First load balancer ingress of the Service
    pub external_ip: String,
}

impl ObservedState {
    /// Observe a freshly read Deployment and Service
    #[must_use]
    pub fn observe(deployment: &Deployment, service: &Service) -> Self {
        Self {
            deployment_name: deployment.name_any(),
            service_name: service.name_any(),
            available_replicas: deployment
                .status
                .as_ref()
                .and_then(|s| s.available_replicas)
                .unwrap_or(0)
                .max(0),
            cluster_ip: service
                .spec
                .as_ref()
                .and_then(|s| s.cluster_ip.clone())
                .unwrap_or_default(),
            external_ip: external_address(service),
        }
    }

    /// The status this observation describes
    #[must_use]
    pub fn to_status(&self) -> NginxStatus {
        NginxStatus {
            deployment_name: self.deployment_name.clone(),
            service_name: self.service_name.clone(),
            available_replicas: self.available_replicas,
            cluster_ip: self.cluster_ip.clone(),
            external_ip: self.external_ip.clone(),
        }
    }
}

/// First assigned ingress endpoint of a Service, IP preferred over hostname
///
/// Only the first ingress entry is considered.
#[must_use]
pub fn external_address(service: &Service) -> String {
    service
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| ingress.first())
        .and_then(|first| first.ip.clone().or_else(|| first.hostname.clone()))
        .unwrap_or_default()
}

/// A status field that differs between recorded and observed state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    /// `deploymentName`
    DeploymentName,
    /// `serviceName`
    ServiceName,
    /// `availableReplicas`
    AvailableReplicas,
    /// `clusterIP`
    ClusterIp,
    /// `externalIP`
    ExternalIp,
}

/// Result of comparing recorded status with an observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDelta {
    /// Status to persist
    pub desired: NginxStatus,
    /// Fields that differ from the recorded status
    pub changed_fields: Vec<StatusField>,
}

impl StatusDelta {
    /// Whether a status write is needed
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.changed_fields.is_empty()
    }
}

/// Compare the recorded status with the observation
///
/// A missing status is compared field by field against the default, so an
/// observation of nothing at all yields no change.
#[must_use]
pub fn reduce_status(current: Option<&NginxStatus>, observed: &ObservedState) -> StatusDelta {
    let recorded = current.cloned().unwrap_or_default();
    let desired = observed.to_status();

    let mut changed_fields = Vec::new();
    if recorded.deployment_name != desired.deployment_name {
        changed_fields.push(StatusField::DeploymentName);
    }
    if recorded.service_name != desired.service_name {
        changed_fields.push(StatusField::ServiceName);
    }
    if recorded.available_replicas != desired.available_replicas {
        changed_fields.push(StatusField::AvailableReplicas);
    }
    if recorded.cluster_ip != desired.cluster_ip {
        changed_fields.push(StatusField::ClusterIp);
    }
    if recorded.external_ip != desired.external_ip {
        changed_fields.push(StatusField::ExternalIp);
    }

    StatusDelta {
        desired,
        changed_fields,
    }
}

//! Nginx CRD
//!
//! Declares an nginx workload: how many replicas to run and how the
//! workload is exposed inside (or outside) the cluster.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Replica count used when `spec.replicas` is not set.
pub const DEFAULT_REPLICAS: i32 = 1;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[kube(
    group = "nginxcontroller.example.com",
    version = "v1",
    kind = "Nginx",
    plural = "nginxes",
    shortname = "ng",
    namespaced,
    status = "NginxStatus",
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".status.availableReplicas"}"#,
    printcolumn = r#"{"name":"Service_Name","type":"string","jsonPath":".status.serviceName"}"#,
    printcolumn = r#"{"name":"Cluster-IP","type":"string","jsonPath":".status.clusterIP"}"#,
    printcolumn = r#"{"name":"External-IP","type":"string","jsonPath":".status.externalIP"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NginxSpec {
    /// Desired number of nginx pods (defaults to 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub replicas: Option<i32>,

    /// How the workload is exposed
    #[serde(default)]
    pub service_type: ServiceType,
}

impl NginxSpec {
    /// Replica count the workload should run, applying the default.
    #[must_use]
    pub fn desired_replicas(&self) -> i32 {
        self.replicas.unwrap_or(DEFAULT_REPLICAS)
    }
}

/// Exposure mode of the managed Service.
///
/// Serialized with the Kubernetes spelling so the value can be copied
/// verbatim into `Service.spec.type`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum ServiceType {
    /// Reachable only from inside the cluster
    #[default]
    ClusterIP,

    /// Exposed on a port of every node
    NodePort,

    /// Exposed through an external load balancer
    LoadBalancer,
}

impl ServiceType {
    /// Kubernetes `Service.spec.type` value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::ClusterIP => "ClusterIP",
            ServiceType::NodePort => "NodePort",
            ServiceType::LoadBalancer => "LoadBalancer",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed state of the children managed for an `Nginx`.
///
/// Empty strings mean "not assigned yet". Fields are always serialized so a
/// merge patch can clear a value that went away.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NginxStatus {
    /// Name of the Deployment currently managed for this resource
    #[serde(default)]
    pub deployment_name: String,

    /// Name of the Service currently managed for this resource
    #[serde(default)]
    pub service_name: String,

    /// Available replicas reported by the Deployment
    #[serde(default)]
    pub available_replicas: i32,

    /// Cluster-internal address of the Service
    #[serde(default, rename = "clusterIP")]
    pub cluster_ip: String,

    /// First external ingress address of the Service
    #[serde(default, rename = "externalIP")]
    pub external_ip: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::{CustomResourceExt, Resource};

    #[test]
    fn test_spec_defaults() {
        let spec: NginxSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec.replicas, None);
        assert_eq!(spec.desired_replicas(), 1);
        assert_eq!(spec.service_type, ServiceType::ClusterIP);
    }

    #[test]
    fn test_explicit_zero_replicas_is_kept() {
        let spec: NginxSpec = serde_json::from_str(r#"{"replicas":0}"#).unwrap();
        assert_eq!(spec.desired_replicas(), 0);
    }

    #[test]
    fn test_service_type_wire_names() {
        let spec: NginxSpec =
            serde_json::from_str(r#"{"replicas":2,"serviceType":"LoadBalancer"}"#).unwrap();
        assert_eq!(spec.service_type, ServiceType::LoadBalancer);
        assert_eq!(
            serde_json::to_value(ServiceType::ClusterIP).unwrap(),
            serde_json::json!("ClusterIP")
        );
        assert_eq!(ServiceType::NodePort.to_string(), "NodePort");
    }

    #[test]
    fn test_status_uses_original_field_names() {
        let status = NginxStatus {
            deployment_name: "deploy-web".to_string(),
            service_name: "service-web".to_string(),
            available_replicas: 2,
            cluster_ip: "10.0.0.7".to_string(),
            external_ip: String::new(),
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["deploymentName"], "deploy-web");
        assert_eq!(value["serviceName"], "service-web");
        assert_eq!(value["availableReplicas"], 2);
        assert_eq!(value["clusterIP"], "10.0.0.7");
        // Empty values are still sent so merge patches can clear them
        assert_eq!(value["externalIP"], "");
    }

    #[test]
    fn test_crd_identity() {
        assert_eq!(Nginx::crd_name(), "nginxes.nginxcontroller.example.com");
        assert_eq!(Nginx::kind(&()), "Nginx");
        assert_eq!(Nginx::api_version(&()), "nginxcontroller.example.com/v1");
    }
}

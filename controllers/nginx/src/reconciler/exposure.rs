//! Service mutation.

use super::naming::{HTTP_PORT, service_selector};
use crate::error::ControllerError;
use crate::reconcile_helpers::{MergePolicy, set_controller_reference};
use crds::Nginx;
use k8s_openapi::api::core::v1::{Service, ServicePort};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

/// Merge policy per controller-managed Service field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceFieldPolicy {
    /// `spec.selector`
    pub selector: MergePolicy,
    /// `spec.type`
    pub service_type: MergePolicy,
    /// `spec.ports`; the API server fills in node ports, so these are not overwritten
    pub ports: MergePolicy,
}

impl Default for ServiceFieldPolicy {
    fn default() -> Self {
        Self {
            selector: MergePolicy::Overwrite,
            service_type: MergePolicy::Overwrite,
            ports: MergePolicy::SetIfAbsent,
        }
    }
}

/// Bring `service` in line with `nginx` under `policy`
pub fn mutate_service(
    service: &mut Service,
    nginx: &Nginx,
    policy: &ServiceFieldPolicy,
) -> Result<(), ControllerError> {
    let owner = nginx.name_any();

    let spec = service.spec.get_or_insert_with(Default::default);
    policy
        .selector
        .apply(&mut spec.selector, Some(service_selector(&owner)));
    policy
        .service_type
        .apply(&mut spec.type_, Some(nginx.spec.service_type.as_str().to_string()));
    policy.ports.apply(
        &mut spec.ports,
        Some(vec![ServicePort {
            port: HTTP_PORT,
            target_port: Some(IntOrString::Int(HTTP_PORT)),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
    );

    set_controller_reference(&mut service.metadata, nginx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_nginx;
    use crds::ServiceType;

    #[test]
    fn test_fills_empty_service() {
        let nginx = create_test_nginx("web", "default", Some(3));
        let mut service = Service::default();

        mutate_service(&mut service, &nginx, &ServiceFieldPolicy::default()).unwrap();

        let spec = service.spec.unwrap();
        assert_eq!(spec.selector, Some(service_selector("web")));
        assert_eq!(spec.type_.as_deref(), Some("ClusterIP"));
        let ports = spec.ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 80);
        assert_eq!(ports[0].target_port, Some(IntOrString::Int(80)));
        assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));
    }

    #[test]
    fn test_type_follows_spec_and_node_port_is_kept() {
        let mut nginx = create_test_nginx("web", "default", None);
        let mut service = Service::default();
        mutate_service(&mut service, &nginx, &ServiceFieldPolicy::default()).unwrap();

        // The API server assigns a node port after the type change
        nginx.spec.service_type = ServiceType::NodePort;
        mutate_service(&mut service, &nginx, &ServiceFieldPolicy::default()).unwrap();
        service.spec.as_mut().unwrap().ports.as_mut().unwrap()[0].node_port = Some(30080);
        mutate_service(&mut service, &nginx, &ServiceFieldPolicy::default()).unwrap();

        let spec = service.spec.unwrap();
        assert_eq!(spec.type_.as_deref(), Some("NodePort"));
        assert_eq!(spec.ports.unwrap()[0].node_port, Some(30080));
    }

    #[test]
    fn test_selector_is_restored() {
        let nginx = create_test_nginx("web", "default", None);
        let mut service = Service::default();
        mutate_service(&mut service, &nginx, &ServiceFieldPolicy::default()).unwrap();
        service.spec.as_mut().unwrap().selector = None;

        mutate_service(&mut service, &nginx, &ServiceFieldPolicy::default()).unwrap();
        assert_eq!(service.spec.unwrap().selector, Some(service_selector("web")));
    }
}

//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::config::ControllerConfig;
use crate::events::EventPublisher;
use crate::reconciler::Reconciler;
use crate::reconcile_helpers::set_controller_reference;
use async_trait::async_trait;
use crds::{Nginx, NginxSpec, ServiceType};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use k8s_openapi::api::core::v1::{ObjectReference, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use kube::runtime::events::EventType;
use kube_store::MockStore;
use std::sync::{Arc, Mutex};

/// Helper to create a test Nginx with a uid, as the API server would assign
pub fn create_test_nginx(name: &str, namespace: &str, replicas: Option<i32>) -> Nginx {
    Nginx {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("uid-{}", name)),
            ..Default::default()
        },
        spec: NginxSpec {
            replicas,
            service_type: ServiceType::ClusterIP,
        },
        status: None,
    }
}

fn owned_meta(name: &str, owner: &Nginx) -> ObjectMeta {
    let mut meta = ObjectMeta {
        name: Some(name.to_string()),
        namespace: owner.namespace(),
        ..Default::default()
    };
    set_controller_reference(&mut meta, owner).unwrap();
    meta
}

/// Helper to create a Deployment controlled by `owner`
pub fn create_owned_deployment(name: &str, owner: &Nginx) -> Deployment {
    Deployment {
        metadata: owned_meta(name, owner),
        ..Default::default()
    }
}

/// Helper to create a Service controlled by `owner`
pub fn create_owned_service(name: &str, owner: &Nginx) -> Service {
    Service {
        metadata: owned_meta(name, owner),
        ..Default::default()
    }
}

/// Set `status.availableReplicas` as the deployment controller would
pub fn set_available_replicas(deployment: &mut Deployment, available: i32) {
    deployment
        .status
        .get_or_insert_with(DeploymentStatus::default)
        .available_replicas = Some(available);
}

/// An event captured by [`RecordingEventPublisher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub object: String,
    pub warning: bool,
    pub reason: String,
    pub action: String,
    pub note: Option<String>,
}

/// Event publisher that remembers everything it was asked to publish
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventPublisher {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.reason).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        self.events.lock().unwrap().push(RecordedEvent {
            object: format!(
                "{}/{}",
                resource_ref.namespace.as_deref().unwrap_or_default(),
                resource_ref.name.as_deref().unwrap_or_default()
            ),
            warning: matches!(type_, EventType::Warning),
            reason: reason.to_string(),
            action: action.to_string(),
            note,
        });
    }
}

/// A reconciler wired to in-memory stores
pub struct TestContext {
    pub nginxes: MockStore<Nginx>,
    pub deployments: MockStore<Deployment>,
    pub services: MockStore<Service>,
    pub events: Arc<RecordingEventPublisher>,
    pub reconciler: Reconciler,
}

impl TestContext {
    pub fn new() -> Self {
        let nginxes = MockStore::<Nginx>::new();
        let deployments = MockStore::<Deployment>::new();
        let services = MockStore::<Service>::new();
        let events = Arc::new(RecordingEventPublisher::default());
        let reconciler = Reconciler::new(
            Arc::new(nginxes.clone()),
            Arc::new(deployments.clone()),
            Arc::new(services.clone()),
            Arc::clone(&events) as Arc<dyn EventPublisher>,
            &ControllerConfig::default(),
        );
        Self {
            nginxes,
            deployments,
            services,
            events,
            reconciler,
        }
    }

    /// Forget writes and events recorded so far
    pub fn clear_records(&self) {
        self.nginxes.clear_writes();
        self.deployments.clear_writes();
        self.services.clear_writes();
        self.events.clear();
    }

    /// Total writes across all stores
    pub fn write_count(&self) -> usize {
        self.nginxes.writes().len() + self.deployments.writes().len() + self.services.writes().len()
    }
}

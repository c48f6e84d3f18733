//! Reconciliation logic for Nginx resources.
//!
//! One reconcile takes a `(namespace, name)` key and runs:
//! 1. fetch the `Nginx` (absent: done, nothing written)
//! 2. delete owned children whose names no longer match [`naming`]
//! 3. create or update the Deployment
//! 4. create or update the Service
//! 5. read both children back
//! 6. reduce their state into `NginxStatus`
//! 7. write the status subresource if it changed
//!
//! Every step is a function of the current cluster state, so running the
//! same key twice, concurrently, or after a partial failure converges to
//! the same result. Stale writes surface as conflicts and the whole
//! sequence is retried.

pub mod cleanup;
pub mod exposure;
pub mod naming;
pub mod owner_index;
pub mod status;
pub mod workload;


use crate::backoff::FibonacciBackoff;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::events::{EventPublisher, actions, reasons};
use crate::reconcile_helpers::{OperationResult, create_or_update};
use cleanup::cleanup_owned;
use crds::Nginx;
use exposure::{ServiceFieldPolicy, mutate_service};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::Resource;
use kube::runtime::events::EventType;
use kube_store::ObjectStore;
use naming::ChildNames;
use status::{ObservedState, reduce_status};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use workload::{DeploymentFieldPolicy, mutate_deployment};

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// What a reconcile did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The `Nginx` no longer exists or is being deleted; nothing was written
    Absent,
    /// The children and status match the `Nginx`
    Converged(ConvergeReport),
}

/// Writes performed by a converging reconcile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergeReport {
    /// Deployment create-or-update result
    pub deployment: OperationResult,
    /// Service create-or-update result
    pub service: OperationResult,
    /// Legacy children deleted during cleanup
    pub deleted: Vec<String>,
    /// Whether the status subresource was written
    pub status_changed: bool,
}

impl ConvergeReport {
    /// Whether this run wrote anything at all
    #[must_use]
    pub fn wrote_anything(&self) -> bool {
        self.deployment.is_write() || self.service.is_write() || !self.deleted.is_empty() || self.status_changed
    }
}

/// Reconciles Nginx resources.
pub struct Reconciler {
    pub(crate) nginx_store: Arc<dyn ObjectStore<Nginx>>,
    pub(crate) deployment_store: Arc<dyn ObjectStore<Deployment>>,
    pub(crate) service_store: Arc<dyn ObjectStore<Service>>,
    pub(crate) events: Arc<dyn EventPublisher>,
    deployment_policy: DeploymentFieldPolicy,
    service_policy: ServiceFieldPolicy,
    backoff_min_secs: u64,
    backoff_max_secs: u64,
    /// Error count tracking per resource (namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("deployment_policy", &self.deployment_policy)
            .field("service_policy", &self.service_policy)
            .field("backoff_min_secs", &self.backoff_min_secs)
            .field("backoff_max_secs", &self.backoff_max_secs)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        nginx_store: Arc<dyn ObjectStore<Nginx>>,
        deployment_store: Arc<dyn ObjectStore<Deployment>>,
        service_store: Arc<dyn ObjectStore<Service>>,
        events: Arc<dyn EventPublisher>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            nginx_store,
            deployment_store,
            service_store,
            events,
            deployment_policy: DeploymentFieldPolicy::default(),
            service_policy: ServiceFieldPolicy::default(),
            backoff_min_secs: config.error_backoff_min_secs,
            backoff_max_secs: config.error_backoff_max_secs,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Reconcile the `Nginx` at `namespace/name`.
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<ReconcileOutcome, ControllerError> {
        let Some(nginx) = self.nginx_store.get(namespace, name).await? else {
            debug!("Nginx {}/{} not found, nothing to do", namespace, name);
            self.forget_resource(&format!("{}/{}", namespace, name));
            return Ok(ReconcileOutcome::Absent);
        };
        if nginx.meta().deletion_timestamp.is_some() {
            debug!("Nginx {}/{} is being deleted, leaving children to the garbage collector", namespace, name);
            self.forget_resource(&format!("{}/{}", namespace, name));
            return Ok(ReconcileOutcome::Absent);
        }

        info!("Reconciling Nginx {}/{}", namespace, name);
        let names = ChildNames::for_nginx(name);

        let mut deleted =
            cleanup_owned(&*self.deployment_store, &*self.events, &nginx, &names.deployment).await?;
        deleted.extend(cleanup_owned(&*self.service_store, &*self.events, &nginx, &names.service).await?);

        let (_, deployment_result) = create_or_update(
            &*self.deployment_store,
            namespace,
            &names.deployment,
            |deployment: &mut Deployment| mutate_deployment(deployment, &nginx, &self.deployment_policy),
        )
        .await?;
        self.publish_write(&nginx, "Deployment", &names.deployment, deployment_result)
            .await;

        let (_, service_result) = create_or_update(
            &*self.service_store,
            namespace,
            &names.service,
            |service: &mut Service| mutate_service(service, &nginx, &self.service_policy),
        )
        .await?;
        self.publish_write(&nginx, "Service", &names.service, service_result)
            .await;

        let deployment = self
            .deployment_store
            .get(namespace, &names.deployment)
            .await?
            .ok_or_else(|| {
                ControllerError::ChildNotConverged(format!("Deployment {}/{}", namespace, names.deployment))
            })?;
        let service = self
            .service_store
            .get(namespace, &names.service)
            .await?
            .ok_or_else(|| ControllerError::ChildNotConverged(format!("Service {}/{}", namespace, names.service)))?;

        let observed = ObservedState::observe(&deployment, &service);
        let delta = reduce_status(nginx.status.as_ref(), &observed);
        if delta.changed() {
            let mut updated = nginx.clone();
            updated.status = Some(delta.desired.clone());
            self.nginx_store.update_status(&updated).await?;
            info!(
                "Updated Nginx {}/{} status ({:?}): available replicas {}",
                namespace, name, delta.changed_fields, delta.desired.available_replicas
            );
            self.events
                .publish(
                    &nginx.object_ref(&()),
                    EventType::Normal,
                    reasons::STATUS_UPDATED,
                    actions::UPDATE_STATUS,
                    Some(format!(
                        "Available replicas {}, cluster IP {:?}, external IP {:?}",
                        delta.desired.available_replicas, delta.desired.cluster_ip, delta.desired.external_ip
                    )),
                )
                .await;
        } else {
            debug!("Nginx {}/{} already has correct status, skipping update", namespace, name);
        }

        Ok(ReconcileOutcome::Converged(ConvergeReport {
            deployment: deployment_result,
            service: service_result,
            deleted,
            status_changed: delta.changed(),
        }))
    }

    async fn publish_write(&self, nginx: &Nginx, kind: &str, child: &str, result: OperationResult) {
        let reason = match result {
            OperationResult::Created => reasons::CREATED,
            OperationResult::Updated => reasons::UPDATED,
            OperationResult::Unchanged => return,
        };
        self.events
            .publish(
                &nginx.object_ref(&()),
                EventType::Normal,
                reason,
                actions::CONVERGE,
                Some(format!("{} {} {:?}", reason, kind, child)),
            )
            .await;
    }

    /// Get the Fibonacci backoff duration for a resource based on its error count
    ///
    /// Returns (backoff_seconds, error_count)
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(|| BackoffState::new(self.backoff_min_secs, self.backoff_max_secs));
                let backoff_seconds = state.backoff.next_backoff_seconds();
                (backoff_seconds, state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using minimum backoff", e);
                (self.backoff_min_secs, 0)
            }
        }
    }

    /// Increment error count for a resource
    pub fn increment_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states
                .entry(resource_key.to_string())
                .or_insert_with(|| BackoffState::new(self.backoff_min_secs, self.backoff_max_secs))
                .increment_error();
        }
    }

    /// Drop all backoff state for a resource that no longer needs reconciling
    pub fn forget_resource(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }

    /// Reset error count for a resource (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }
}

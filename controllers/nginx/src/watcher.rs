//! Kubernetes resource watchers.
//!
//! Watches `Nginx` resources and the Deployments and Services they own,
//! and drives [`Reconciler::reconcile`] through `kube_runtime::Controller`.
//! A change to an owned child is mapped back to its controlling `Nginx`,
//! so deleting or editing a child triggers a reconcile of its owner.

use crate::error::ControllerError;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crds::Nginx;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, ResourceExt};
use kube_runtime::controller::{Action, Config as RuntimeConfig};
use kube_runtime::{Controller, watcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Requeue key for a resource, also used for backoff bookkeeping
fn resource_key(nginx: &Nginx) -> String {
    format!("{}/{}", nginx.namespace().unwrap_or_default(), nginx.name_any())
}

/// Watches Kubernetes resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    nginx_api: Api<Nginx>,
    deployment_api: Api<Deployment>,
    service_api: Api<Service>,
    resync_interval: Duration,
    debounce: Duration,
    concurrency: u16,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        reconciler: Arc<Reconciler>,
        nginx_api: Api<Nginx>,
        deployment_api: Api<Deployment>,
        service_api: Api<Service>,
        resync_interval: Duration,
        debounce: Duration,
        concurrency: u16,
    ) -> Self {
        Self {
            reconciler,
            nginx_api,
            deployment_api,
            service_api,
            resync_interval,
            debounce,
            concurrency,
        }
    }

    /// Starts watching Nginx resources and their children.
    ///
    /// Runs until the process receives SIGTERM or Ctrl+C.
    pub async fn watch_nginxes(&self) -> Result<(), ControllerError> {
        info!("Starting Nginx watcher");

        let resync_interval = self.resync_interval;
        let reconcile = move |nginx: Arc<Nginx>, reconciler: Arc<Reconciler>| {
            let namespace = nginx.namespace().unwrap_or_default();
            let name = nginx.name_any();
            let span = info_span!("reconcile", namespace = %namespace, name = %name);
            async move {
                let key = resource_key(&nginx);
                let outcome = reconciler.reconcile(&namespace, &name).await?;
                reconciler.reset_error(&key);
                let action = match outcome {
                    ReconcileOutcome::Absent => Action::await_change(),
                    ReconcileOutcome::Converged(report) => {
                        if report.wrote_anything() {
                            info!(
                                deployment = ?report.deployment,
                                service = ?report.service,
                                deleted = report.deleted.len(),
                                status_changed = report.status_changed,
                                "Nginx converged"
                            );
                        } else {
                            debug!("Nginx already converged");
                        }
                        Action::requeue(resync_interval)
                    }
                };
                Ok::<_, ControllerError>(action)
            }
            .instrument(span)
        };

        // Fibonacci backoff per resource, reset on the next success
        let error_policy = |nginx: Arc<Nginx>, err: &ControllerError, reconciler: Arc<Reconciler>| {
            let key = resource_key(&nginx);
            reconciler.increment_error(&key);
            let (backoff_secs, error_count) = reconciler.get_backoff_for_resource(&key);
            if err.is_conflict() {
                debug!(
                    "Nginx {} changed during reconcile (attempt {}), retrying in {}s: {}",
                    key, error_count, backoff_secs, err
                );
            } else if err.is_transient() {
                warn!(
                    "Reconciliation of Nginx {} failed (attempt {}), retrying in {}s: {}",
                    key, error_count, backoff_secs, err
                );
            } else {
                error!(
                    "Reconciliation of Nginx {} failed permanently (attempt {}), retrying in {}s: {}",
                    key, error_count, backoff_secs, err
                );
            }
            Action::requeue(Duration::from_secs(backoff_secs))
        };

        let runtime_config = RuntimeConfig::default()
            .debounce(self.debounce)
            .concurrency(self.concurrency);

        Controller::new(self.nginx_api.clone(), watcher::Config::default())
            .owns(self.deployment_api.clone(), watcher::Config::default())
            .owns(self.service_api.clone(), watcher::Config::default())
            .with_config(runtime_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.reconciler.clone())
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled Nginx {}/{}", obj.namespace.as_deref().unwrap_or_default(), obj.name),
                    Err(e) => debug!("Controller stream error: {}", e),
                }
            })
            .await;

        info!("Nginx watcher stopped");
        Ok(())
    }
}

//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! client, object stores, event publisher and reconciler together and runs
//! the Nginx watcher.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::events::{EventPublisher, KubeEventPublisher, NoopEventPublisher};
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use crds::Nginx;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use kube_store::KubeStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Main controller for Nginx resource management.
pub struct Controller {
    nginx_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its watcher.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Nginx Controller");

        let client = Client::try_default().await?;
        match client.apiserver_version().await {
            Ok(version) => info!("Connected to Kubernetes {}.{}", version.major, version.minor),
            Err(e) => warn!("Could not read API server version (will continue): {}", e),
        }

        let events: Arc<dyn EventPublisher> = if config.emit_events {
            Arc::new(KubeEventPublisher::new(client.clone(), &config.controller_name))
        } else {
            info!("Kubernetes Events disabled");
            Arc::new(NoopEventPublisher)
        };

        let reconciler = Arc::new(Reconciler::new(
            Arc::new(KubeStore::<Nginx>::new(client.clone(), config.controller_name.clone())),
            Arc::new(KubeStore::<Deployment>::new(client.clone(), config.controller_name.clone())),
            Arc::new(KubeStore::<Service>::new(client.clone(), config.controller_name.clone())),
            events,
            &config,
        ));

        let (nginx_api, deployment_api, service_api) = match config.namespace.as_deref() {
            Some(ns) => (
                Api::<Nginx>::namespaced(client.clone(), ns),
                Api::<Deployment>::namespaced(client.clone(), ns),
                Api::<Service>::namespaced(client, ns),
            ),
            None => (
                Api::<Nginx>::all(client.clone()),
                Api::<Deployment>::all(client.clone()),
                Api::<Service>::all(client),
            ),
        };

        let watcher = Watcher::new(
            reconciler,
            nginx_api,
            deployment_api,
            service_api,
            config.resync_interval,
            config.debounce,
            config.concurrency,
        );
        let nginx_watcher = tokio::spawn(async move { watcher.watch_nginxes().await });

        Ok(Self { nginx_watcher })
    }

    /// Runs until the watcher exits.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Nginx Controller running");

        self.nginx_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("Nginx watcher panicked: {}", e)))??;

        info!("Nginx Controller stopped");
        Ok(())
    }
}

//! Nginx Controller
//!
//! Reconciles `Nginx` resources into a Deployment running the nginx image
//! and a Service exposing it on port 80, and reports what it observes on
//! those children back into `Nginx.status`.

mod backoff;
mod config;
mod controller;
mod error;
mod events;
mod reconcile_helpers;
mod reconciler;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // kube's rustls-tls needs a process-wide crypto provider
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::debug!("rustls crypto provider already installed");
    }

    info!("Starting Nginx Controller");

    let config = ControllerConfig::from_env()?;
    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Resync interval: {}s", config.resync_interval.as_secs());
    info!(
        "  Error backoff: {}s..{}s",
        config.error_backoff_min_secs, config.error_backoff_max_secs
    );
    info!("  Concurrency: {}", config.concurrency);
    info!("  Debounce: {}s", config.debounce.as_secs());
    info!("  Controller name: {}", config.controller_name);
    info!("  Emit events: {}", config.emit_events);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}

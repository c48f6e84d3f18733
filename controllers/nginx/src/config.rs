//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings for the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Requeue interval after a successful reconcile
    pub resync_interval: Duration,
    /// First retry delay after a failed reconcile, in seconds
    pub error_backoff_min_secs: u64,
    /// Retry delay cap, in seconds
    pub error_backoff_max_secs: u64,
    /// Maximum reconciles running at once
    pub concurrency: u16,
    /// Quiet period before a burst of events triggers a reconcile
    pub debounce: Duration,
    /// Field manager and event reporter name
    pub controller_name: String,
    /// Publish Kubernetes Events on the Nginx resource
    pub emit_events: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            resync_interval: Duration::from_secs(300),
            error_backoff_min_secs: 5,
            error_backoff_max_secs: 300,
            concurrency: 4,
            debounce: Duration::from_secs(1),
            controller_name: "nginx-controller".to_string(),
            emit_events: true,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let defaults = Self::default();

        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());
        let resync_secs = parse_or(&lookup, "RESYNC_INTERVAL_SECS", defaults.resync_interval.as_secs())?;
        let error_backoff_min_secs =
            parse_or(&lookup, "ERROR_BACKOFF_MIN_SECS", defaults.error_backoff_min_secs)?;
        let error_backoff_max_secs =
            parse_or(&lookup, "ERROR_BACKOFF_MAX_SECS", defaults.error_backoff_max_secs)?;
        let concurrency = parse_or(&lookup, "RECONCILE_CONCURRENCY", defaults.concurrency)?;
        let debounce_secs = parse_or(&lookup, "RECONCILE_DEBOUNCE_SECS", defaults.debounce.as_secs())?;
        let controller_name = lookup("CONTROLLER_NAME")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(defaults.controller_name);
        let emit_events = parse_or(&lookup, "EMIT_EVENTS", defaults.emit_events)?;

        if resync_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "RESYNC_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }
        if error_backoff_min_secs == 0 || error_backoff_min_secs > error_backoff_max_secs {
            return Err(ControllerError::InvalidConfig(format!(
                "ERROR_BACKOFF_MIN_SECS ({}) must be in 1..=ERROR_BACKOFF_MAX_SECS ({})",
                error_backoff_min_secs, error_backoff_max_secs
            )));
        }
        if concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_CONCURRENCY must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            namespace,
            resync_interval: Duration::from_secs(resync_secs),
            error_backoff_min_secs,
            error_backoff_max_secs,
            concurrency,
            debounce: Duration::from_secs(debounce_secs),
            controller_name,
            emit_events,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ControllerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{} has invalid value '{}': {}", key, raw, e))
        }),
    }
}

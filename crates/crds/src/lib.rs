//! Nginx Controller CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the nginx controller.

pub mod nginx;

pub use nginx::*;

//! Kubernetes Object Store
//!
//! A narrow, typed view of the Kubernetes API used by the nginx controller.
//! One store instance serves one resource kind; all operations are scoped
//! to a namespace.
//!
//! # Example
//!
//! ```no_run
//! use k8s_openapi::api::apps::v1::Deployment;
//! use kube_store::{KubeStore, ObjectStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let deployments: KubeStore<Deployment> = KubeStore::new(client, "nginx-controller");
//!
//! // Label selectors use the usual `key=value,key=value` form
//! let owned = deployments.list("default", Some("app=nginx")).await?;
//! for deployment in owned {
//!     println!("{:?}", deployment.metadata.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Optimistic concurrency**: updates carry `metadata.resourceVersion` and
//!   surface stale writes as [`StoreError::Conflict`]
//! - **Status subresource**: `update` writes spec and metadata, `update_status`
//!   writes status only
//! - **Test double**: `MockStore` (feature `test-util`) keeps objects in memory

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeStore;
pub use error::StoreError;
pub use store_trait::ObjectStore;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockStore, StoreOp, WriteRecord};

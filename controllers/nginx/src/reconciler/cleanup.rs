//! Cleanup of children left behind by an earlier naming.

use super::owner_index::OwnerIndex;
use crate::error::ControllerError;
use crate::events::{EventPublisher, actions, reasons};
use crds::Nginx;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use kube_store::ObjectStore;
use tracing::{debug, info};

/// Delete every child of kind `K` controlled by `nginx` except `current_name`
///
/// Returns the names that were deleted. A child that disappears between the
/// listing and the delete counts as deleted by someone else and is skipped.
pub async fn cleanup_owned<K>(
    store: &dyn ObjectStore<K>,
    events: &dyn EventPublisher,
    nginx: &Nginx,
    current_name: &str,
) -> Result<Vec<String>, ControllerError>
where
    K: Resource<DynamicType = ()> + Send + Sync + 'static,
{
    let namespace = nginx.namespace().unwrap_or_default();
    let owner = nginx.name_any();
    let kind = K::kind(&());

    let children = store.list(&namespace, None).await?;
    let index = OwnerIndex::build(&children);
    let legacy: Vec<String> = index
        .owned_by(&owner)
        .filter(|name| *name != current_name)
        .map(str::to_string)
        .collect();

    let mut deleted = Vec::with_capacity(legacy.len());
    for name in legacy {
        match store.delete(&namespace, &name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!("{} {}/{} already gone", kind, namespace, name);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
        info!("Deleted legacy {} {}/{} of Nginx {}", kind, namespace, name, owner);
        events
            .publish(
                &nginx.object_ref(&()),
                EventType::Normal,
                reasons::DELETED,
                actions::CLEANUP,
                Some(format!("Deleted {} {:?}", kind, name)),
            )
            .await;
        deleted.push(name);
    }

    Ok(deleted)
}

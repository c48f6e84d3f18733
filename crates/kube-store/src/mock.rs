//! Mock ObjectStore for unit testing
//!
//! Keeps objects in memory and behaves like the API server where the
//! reconciler can tell the difference:
//! - every write bumps `metadata.resourceVersion`
//! - writes carrying a stale resourceVersion fail with `Conflict`
//! - `update` never changes status, `update_status` changes nothing but status
//! - list filters by namespace and equality label selectors
//!
//! Writes made through the trait are recorded so tests can assert which
//! operations a reconcile performed. Seeding and external modification go
//! around the log.

use crate::error::StoreError;
use crate::store_trait::ObjectStore;
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Store operation, used for the write log and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `ObjectStore::get`
    Get,
    /// `ObjectStore::list`
    List,
    /// `ObjectStore::create`
    Create,
    /// `ObjectStore::update`
    Update,
    /// `ObjectStore::delete`
    Delete,
    /// `ObjectStore::update_status`
    UpdateStatus,
}

/// A write that reached the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    /// Operation performed
    pub op: StoreOp,
    /// Namespace of the object written
    pub namespace: String,
    /// Name of the object written
    pub name: String,
}

type Key = (String, String);

/// In-memory store for objects of kind `K`
pub struct MockStore<K> {
    objects: Arc<Mutex<BTreeMap<Key, K>>>,
    writes: Arc<Mutex<Vec<WriteRecord>>>,
    failures: Arc<Mutex<HashMap<StoreOp, StoreError>>>,
    next_version: Arc<Mutex<u64>>,
}

impl<K> Clone for MockStore<K> {
    fn clone(&self) -> Self {
        Self {
            objects: Arc::clone(&self.objects),
            writes: Arc::clone(&self.writes),
            failures: Arc::clone(&self.failures),
            next_version: Arc::clone(&self.next_version),
        }
    }
}

impl<K> fmt::Debug for MockStore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockStore")
            .field("kind", &std::any::type_name::<K>())
            .field("objects", &lock(&self.objects).len())
            .field("writes", &lock(&self.writes).len())
            .finish_non_exhaustive()
    }
}

impl<K> Default for MockStore<K> {
    fn default() -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            next_version: Arc::new(Mutex::new(1)),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key_of<K: Resource>(obj: &K) -> Result<Key, StoreError> {
    let meta = obj.meta();
    match (&meta.namespace, &meta.name) {
        (Some(ns), Some(name)) => Ok((ns.clone(), name.clone())),
        _ => Err(StoreError::InvalidRequest("object needs a namespace and a name".to_string())),
    }
}

/// Equality selector match: `a=b,c=d`. A bare key only requires presence.
fn matches_selector(labels: &BTreeMap<String, String>, selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => {
                let value = value.trim_start_matches('=');
                labels.get(key.trim()).is_some_and(|v| v == value.trim())
            }
            None => labels.contains_key(term),
        })
}

/// Copy the `status` field of `from` onto `onto`
fn with_status_of<K>(onto: &K, from: &K) -> Result<K, StoreError>
where
    K: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(onto)?;
    let status = serde_json::to_value(from)?.get("status").cloned();
    if let Some(map) = value.as_object_mut() {
        match status {
            Some(status) => {
                map.insert("status".to_string(), status);
            }
            None => {
                map.remove("status");
            }
        }
    }
    Ok(serde_json::from_value(value)?)
}

impl<K> MockStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_version(&self, obj: &mut K) {
        let mut next = lock(&self.next_version);
        obj.meta_mut().resource_version = Some(next.to_string());
        *next += 1;
    }

    fn take_failure(&self, op: StoreOp) -> Result<(), StoreError> {
        match lock(&self.failures).remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record(&self, op: StoreOp, key: &Key) {
        lock(&self.writes).push(WriteRecord {
            op,
            namespace: key.0.clone(),
            name: key.1.clone(),
        });
    }

    /// Add an object as if another actor had created it (for test setup)
    ///
    /// Assigns a uid and resourceVersion when missing. Not recorded as a write.
    pub fn seed(&self, mut obj: K) -> K {
        if obj.meta().uid.is_none() {
            obj.meta_mut().uid = Some(uuid::Uuid::new_v4().to_string());
        }
        if obj.meta().resource_version.is_none() {
            self.bump_version(&mut obj);
        }
        let key = (obj.namespace().unwrap_or_default(), obj.name_any());
        lock(&self.objects).insert(key, obj.clone());
        obj
    }

    /// Change a stored object as another actor would, bumping its resourceVersion
    ///
    /// Returns `false` when the object does not exist. Not recorded as a write.
    pub fn modify(&self, namespace: &str, name: &str, f: impl FnOnce(&mut K)) -> bool {
        let mut objects = lock(&self.objects);
        let Some(obj) = objects.get_mut(&(namespace.to_string(), name.to_string())) else {
            return false;
        };
        f(obj);
        self.bump_version(obj);
        true
    }

    /// Remove an object as another actor would. Not recorded as a write.
    pub fn remove(&self, namespace: &str, name: &str) -> Option<K> {
        lock(&self.objects).remove(&(namespace.to_string(), name.to_string()))
    }

    /// Peek at a stored object without going through the trait
    #[must_use]
    pub fn object(&self, namespace: &str, name: &str) -> Option<K> {
        lock(&self.objects)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// All stored objects, ordered by namespace and name
    #[must_use]
    pub fn objects(&self) -> Vec<K> {
        lock(&self.objects).values().cloned().collect()
    }

    /// Writes recorded since creation or the last `clear_writes`
    #[must_use]
    pub fn writes(&self) -> Vec<WriteRecord> {
        lock(&self.writes).clone()
    }

    /// Forget recorded writes
    pub fn clear_writes(&self) {
        lock(&self.writes).clear();
    }

    /// Make the next call of `op` fail with `err`
    pub fn fail_next(&self, op: StoreOp, err: StoreError) {
        lock(&self.failures).insert(op, err);
    }
}

#[async_trait::async_trait]
impl<K> ObjectStore<K> for MockStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        self.take_failure(StoreOp::Get)?;
        Ok(self.object(namespace, name))
    }

    async fn list(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<K>, StoreError> {
        self.take_failure(StoreOp::List)?;
        let objects = lock(&self.objects);
        Ok(objects
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, obj)| obj)
            .filter(|obj| label_selector.is_none_or(|sel| matches_selector(obj.labels(), sel)))
            .cloned()
            .collect())
    }

    async fn create(&self, obj: &K) -> Result<K, StoreError> {
        self.take_failure(StoreOp::Create)?;
        let key = key_of(obj)?;
        let mut objects = lock(&self.objects);
        if objects.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{}/{} already exists", key.0, key.1)));
        }
        let mut created = obj.clone();
        created.meta_mut().uid = Some(uuid::Uuid::new_v4().to_string());
        self.bump_version(&mut created);
        objects.insert(key.clone(), created.clone());
        drop(objects);
        self.record(StoreOp::Create, &key);
        Ok(created)
    }

    async fn update(&self, obj: &K) -> Result<K, StoreError> {
        self.take_failure(StoreOp::Update)?;
        let key = key_of(obj)?;
        let mut objects = lock(&self.objects);
        let stored = objects
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{} not found", key.0, key.1)))?;
        match obj.resource_version() {
            None => {
                return Err(StoreError::InvalidRequest(format!(
                    "update of {}/{} requires a resourceVersion",
                    key.0, key.1
                )));
            }
            Some(rv) if Some(&rv) != stored.meta().resource_version.as_ref() => {
                return Err(StoreError::Conflict(format!(
                    "{}/{} has been modified; resourceVersion {} is stale",
                    key.0, key.1, rv
                )));
            }
            Some(_) => {}
        }
        let mut updated = with_status_of(obj, stored)?;
        updated.meta_mut().uid.clone_from(&stored.meta().uid);
        self.bump_version(&mut updated);
        objects.insert(key.clone(), updated.clone());
        drop(objects);
        self.record(StoreOp::Update, &key);
        Ok(updated)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.take_failure(StoreOp::Delete)?;
        let key = (namespace.to_string(), name.to_string());
        if lock(&self.objects).remove(&key).is_none() {
            return Err(StoreError::NotFound(format!("{}/{} not found", namespace, name)));
        }
        self.record(StoreOp::Delete, &key);
        Ok(())
    }

    async fn update_status(&self, obj: &K) -> Result<K, StoreError> {
        self.take_failure(StoreOp::UpdateStatus)?;
        let key = key_of(obj)?;
        let mut objects = lock(&self.objects);
        let stored = objects
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(format!("{}/{} not found", key.0, key.1)))?;
        // Unconditional when no resourceVersion is given, like a bare merge patch
        if let Some(rv) = obj.resource_version() {
            if Some(&rv) != stored.meta().resource_version.as_ref() {
                return Err(StoreError::Conflict(format!(
                    "{}/{} has been modified; resourceVersion {} is stale",
                    key.0, key.1, rv
                )));
            }
        }
        let mut updated = with_status_of(stored, obj)?;
        self.bump_version(&mut updated);
        objects.insert(key.clone(), updated.clone());
        drop(objects);
        self.record(StoreOp::UpdateStatus, &key);
        Ok(updated)
    }
}

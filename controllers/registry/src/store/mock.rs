//! In-memory cluster store for unit tests
//!
//! Stores child objects keyed by (kind, namespace, name), records every write
//! in order, and can be told to fail or to lag behind its own writes the way a
//! watch cache does.

use super::{ClusterStore, ListTarget, ManagedObject, ResourceKind, StoreError};
use crds::DevfileRegistryStatus;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

type ObjectKey = (ResourceKind, String, String);

/// A write recorded by [`MockClusterStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Child object created
    Create(ResourceKind, String),
    /// Child object replaced
    Update(ResourceKind, String),
    /// Child object deleted
    Delete(ResourceKind, String),
    /// DevfileRegistry status written
    RegistryStatus(String, String),
    /// Registries list status written
    ListStatus(ListTarget, String),
}

/// Mock cluster store for testing
#[derive(Clone, Default)]
pub struct MockClusterStore {
    objects: Arc<Mutex<HashMap<ObjectKey, ManagedObject>>>,
    ops: Arc<Mutex<Vec<StoreOp>>>,
    registry_statuses: Arc<Mutex<HashMap<(String, String), DevfileRegistryStatus>>>,
    list_statuses: Arc<Mutex<HashMap<ListTarget, String>>>,
    missing_parents: Arc<Mutex<HashSet<String>>>,
    failing_kinds: Arc<Mutex<HashSet<ResourceKind>>>,
    lagging_kinds: Arc<Mutex<HashSet<ResourceKind>>>,
    unseen: Arc<Mutex<HashSet<ObjectKey>>>,
    route_domain: Arc<Mutex<Option<String>>>,
    next_version: Arc<Mutex<u64>>,
}

impl MockClusterStore {
    /// Create an empty store whose routes get hosts under `apps.cluster.test`
    pub fn new() -> Self {
        let store = Self::default();
        *store.route_domain.lock().unwrap() = Some("apps.cluster.test".to_string());
        store
    }

    /// Stop assigning hosts to created routes
    pub fn without_route_hosts(self) -> Self {
        *self.route_domain.lock().unwrap() = None;
        self
    }

    /// Seed an object without recording a write
    pub fn insert(&self, namespace: &str, mut object: ManagedObject) {
        let version = self.bump_version();
        object.metadata_mut().resource_version = Some(version);
        object.metadata_mut().namespace = Some(namespace.to_string());
        let key = (object.kind(), namespace.to_string(), object.name().to_string());
        self.objects.lock().unwrap().insert(key, object);
    }

    /// Fetch an object directly
    pub fn object(&self, kind: ResourceKind, namespace: &str, name: &str) -> Option<ManagedObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(kind, namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Whether an object exists
    pub fn contains(&self, kind: ResourceKind, namespace: &str, name: &str) -> bool {
        self.object(kind, namespace, name).is_some()
    }

    /// Every write so far, in order
    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Forget recorded writes
    pub fn clear_ops(&self) {
        self.ops.lock().unwrap().clear();
    }

    /// Last status written for a registry
    pub fn registry_status(&self, namespace: &str, name: &str) -> Option<DevfileRegistryStatus> {
        self.registry_statuses
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Last status written for a registries list
    pub fn list_status(&self, target: &ListTarget) -> Option<String> {
        self.list_statuses.lock().unwrap().get(target).cloned()
    }

    /// Make status writes for `name` fail with NotFound (top-level object deleted)
    pub fn remove_parent(&self, name: &str) {
        self.missing_parents.lock().unwrap().insert(name.to_string());
    }

    /// Make every call for `kind` fail with `Unavailable`
    pub fn fail_kind(&self, kind: ResourceKind) {
        self.failing_kinds.lock().unwrap().insert(kind);
    }

    /// Make the first read after each create of `kind` miss
    pub fn lag_reads_for(&self, kind: ResourceKind) {
        self.lagging_kinds.lock().unwrap().insert(kind);
    }

    fn bump_version(&self) -> String {
        let mut next = self.next_version.lock().unwrap();
        *next += 1;
        next.to_string()
    }

    fn record(&self, op: StoreOp) {
        self.ops.lock().unwrap().push(op);
    }

    fn check_available(&self, kind: ResourceKind) -> Result<(), StoreError> {
        if self.failing_kinds.lock().unwrap().contains(&kind) {
            return Err(StoreError::Unavailable(format!("{kind} API is unavailable")));
        }
        Ok(())
    }

    fn assign_route_host(&self, namespace: &str, object: &mut ManagedObject) {
        let domain = self.route_domain.lock().unwrap().clone();
        if let (ManagedObject::Route(route), Some(domain)) = (object, domain) {
            if route.spec.host.as_deref().unwrap_or_default().is_empty() {
                let name = route.metadata.name.clone().unwrap_or_default();
                route.spec.host = Some(format!("{name}-{namespace}.{domain}"));
            }
        }
    }
}

#[async_trait::async_trait]
impl ClusterStore for MockClusterStore {
    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<ManagedObject, StoreError> {
        self.check_available(kind)?;
        let key = (kind, namespace.to_string(), name.to_string());
        if self.unseen.lock().unwrap().remove(&key) {
            return Err(StoreError::NotFound(format!("{kind} {namespace}/{name} not in cache yet")));
        }
        self.objects
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{kind} {namespace}/{name}")))
    }

    async fn create(&self, namespace: &str, object: &ManagedObject) -> Result<ManagedObject, StoreError> {
        let kind = object.kind();
        self.check_available(kind)?;
        let key = (kind, namespace.to_string(), object.name().to_string());
        if self.objects.lock().unwrap().contains_key(&key) {
            return Err(StoreError::Conflict(format!("{kind} {namespace}/{} already exists", object.name())));
        }

        let mut stored = object.clone();
        stored.metadata_mut().resource_version = Some(self.bump_version());
        self.assign_route_host(namespace, &mut stored);

        if self.lagging_kinds.lock().unwrap().contains(&kind) {
            self.unseen.lock().unwrap().insert(key.clone());
        }
        self.objects.lock().unwrap().insert(key, stored.clone());
        self.record(StoreOp::Create(kind, object.name().to_string()));
        Ok(stored)
    }

    async fn update(&self, namespace: &str, object: &ManagedObject) -> Result<ManagedObject, StoreError> {
        let kind = object.kind();
        self.check_available(kind)?;
        let key = (kind, namespace.to_string(), object.name().to_string());
        let mut objects = self.objects.lock().unwrap();
        let Some(live) = objects.get(&key) else {
            return Err(StoreError::NotFound(format!("{kind} {namespace}/{}", object.name())));
        };
        if live.metadata().resource_version != object.metadata().resource_version {
            return Err(StoreError::Conflict(format!(
                "{kind} {namespace}/{} was modified concurrently",
                object.name()
            )));
        }

        let mut stored = object.clone();
        stored.metadata_mut().resource_version = Some(self.bump_version());
        objects.insert(key, stored.clone());
        drop(objects);
        self.record(StoreOp::Update(kind, object.name().to_string()));
        Ok(stored)
    }

    async fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.check_available(kind)?;
        let key = (kind, namespace.to_string(), name.to_string());
        if self.objects.lock().unwrap().remove(&key).is_none() {
            return Err(StoreError::NotFound(format!("{kind} {namespace}/{name}")));
        }
        self.record(StoreOp::Delete(kind, name.to_string()));
        Ok(())
    }

    async fn patch_registry_status(
        &self,
        namespace: &str,
        name: &str,
        status: &DevfileRegistryStatus,
    ) -> Result<(), StoreError> {
        if self.missing_parents.lock().unwrap().contains(name) {
            return Err(StoreError::NotFound(format!("DevfileRegistry {namespace}/{name}")));
        }
        self.registry_statuses
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), status.clone());
        self.record(StoreOp::RegistryStatus(name.to_string(), status.url.clone()));
        Ok(())
    }

    async fn patch_list_status(&self, target: &ListTarget, status: &str) -> Result<(), StoreError> {
        let name = match target {
            ListTarget::Namespaced { name, .. } | ListTarget::Cluster { name } => name,
        };
        if self.missing_parents.lock().unwrap().contains(name) {
            return Err(StoreError::NotFound(target.to_string()));
        }
        self.list_statuses
            .lock()
            .unwrap()
            .insert(target.clone(), status.to_string());
        self.record(StoreOp::ListStatus(target.clone(), status.to_string()));
        Ok(())
    }
}

//! Cluster store backed by the Kubernetes API server.

use super::{ClusterStore, ListTarget, ManagedObject, ResourceKind, StoreError};
use crds::{ClusterDevfileRegistriesList, DevfileRegistriesList, DevfileRegistry, DevfileRegistryStatus, Route};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt::Debug;
use tracing::debug;

/// [`ClusterStore`] talking to the API server through kube-rs
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    /// Creates a new store from a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn create_typed<K>(&self, namespace: &str, object: &K) -> Result<K, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned,
    {
        Ok(self.api::<K>(namespace).create(&PostParams::default(), object).await?)
    }

    async fn replace_typed<K>(&self, namespace: &str, object: &K) -> Result<K, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned,
    {
        let name = object
            .meta()
            .name
            .clone()
            .ok_or_else(|| StoreError::NotFound("object has no name".to_string()))?;
        Ok(self
            .api::<K>(namespace)
            .replace(&name, &PostParams::default(), object)
            .await?)
    }

    async fn delete_typed<K>(&self, namespace: &str, name: &str) -> Result<(), StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        self.api::<K>(namespace)
            .delete(name, &DeleteParams::background())
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ClusterStore for KubeStore {
    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<ManagedObject, StoreError> {
        debug!("GET {} {}/{}", kind, namespace, name);
        let object = match kind {
            ResourceKind::Service => ManagedObject::Service(self.api::<Service>(namespace).get(name).await?),
            ResourceKind::PersistentVolumeClaim => {
                ManagedObject::PersistentVolumeClaim(self.api::<PersistentVolumeClaim>(namespace).get(name).await?)
            }
            ResourceKind::ConfigMap => ManagedObject::ConfigMap(self.api::<ConfigMap>(namespace).get(name).await?),
            ResourceKind::Deployment => {
                ManagedObject::Deployment(self.api::<Deployment>(namespace).get(name).await?)
            }
            ResourceKind::Ingress => ManagedObject::Ingress(self.api::<Ingress>(namespace).get(name).await?),
            ResourceKind::Route => ManagedObject::Route(self.api::<Route>(namespace).get(name).await?),
        };
        Ok(object)
    }

    async fn create(&self, namespace: &str, object: &ManagedObject) -> Result<ManagedObject, StoreError> {
        debug!("CREATE {} {}/{}", object.kind(), namespace, object.name());
        let created = match object {
            ManagedObject::Service(o) => ManagedObject::Service(self.create_typed(namespace, o).await?),
            ManagedObject::PersistentVolumeClaim(o) => {
                ManagedObject::PersistentVolumeClaim(self.create_typed(namespace, o).await?)
            }
            ManagedObject::ConfigMap(o) => ManagedObject::ConfigMap(self.create_typed(namespace, o).await?),
            ManagedObject::Deployment(o) => ManagedObject::Deployment(self.create_typed(namespace, o).await?),
            ManagedObject::Ingress(o) => ManagedObject::Ingress(self.create_typed(namespace, o).await?),
            ManagedObject::Route(o) => ManagedObject::Route(self.create_typed(namespace, o).await?),
        };
        Ok(created)
    }

    async fn update(&self, namespace: &str, object: &ManagedObject) -> Result<ManagedObject, StoreError> {
        debug!("UPDATE {} {}/{}", object.kind(), namespace, object.name());
        let updated = match object {
            ManagedObject::Service(o) => ManagedObject::Service(self.replace_typed(namespace, o).await?),
            ManagedObject::PersistentVolumeClaim(o) => {
                ManagedObject::PersistentVolumeClaim(self.replace_typed(namespace, o).await?)
            }
            ManagedObject::ConfigMap(o) => ManagedObject::ConfigMap(self.replace_typed(namespace, o).await?),
            ManagedObject::Deployment(o) => ManagedObject::Deployment(self.replace_typed(namespace, o).await?),
            ManagedObject::Ingress(o) => ManagedObject::Ingress(self.replace_typed(namespace, o).await?),
            ManagedObject::Route(o) => ManagedObject::Route(self.replace_typed(namespace, o).await?),
        };
        Ok(updated)
    }

    async fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<(), StoreError> {
        debug!("DELETE {} {}/{}", kind, namespace, name);
        match kind {
            ResourceKind::Service => self.delete_typed::<Service>(namespace, name).await,
            ResourceKind::PersistentVolumeClaim => {
                self.delete_typed::<PersistentVolumeClaim>(namespace, name).await
            }
            ResourceKind::ConfigMap => self.delete_typed::<ConfigMap>(namespace, name).await,
            ResourceKind::Deployment => self.delete_typed::<Deployment>(namespace, name).await,
            ResourceKind::Ingress => self.delete_typed::<Ingress>(namespace, name).await,
            ResourceKind::Route => self.delete_typed::<Route>(namespace, name).await,
        }
    }

    async fn patch_registry_status(
        &self,
        namespace: &str,
        name: &str,
        status: &DevfileRegistryStatus,
    ) -> Result<(), StoreError> {
        let status_patch = json!({ "status": status });
        self.api::<DevfileRegistry>(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await?;
        Ok(())
    }

    async fn patch_list_status(&self, target: &ListTarget, status: &str) -> Result<(), StoreError> {
        let status_patch = json!({ "status": { "status": status } });
        let pp = PatchParams::default();
        match target {
            ListTarget::Namespaced { namespace, name } => {
                self.api::<DevfileRegistriesList>(namespace)
                    .patch_status(name, &pp, &Patch::Merge(&status_patch))
                    .await?;
            }
            ListTarget::Cluster { name } => {
                Api::<ClusterDevfileRegistriesList>::all(self.client.clone())
                    .patch_status(name, &pp, &Patch::Merge(&status_patch))
                    .await?;
            }
        }
        Ok(())
    }
}

//! DevfileRegistry reconciliation
//!
//! One pass converges the children in dependency order (Service, PVC,
//! ConfigMap, Deployment, then Ingress or Route), derives the registry's
//! external URL and, when that URL is new, probes it before publishing it in
//! the status. A failed probe never clears a previously published URL.

use super::{Reconciler, track_result};
use crate::ensure::{READ_AFTER_WRITE_REQUEUE, ensure};
use crate::error::ControllerError;
use crate::resources::{self, child_name, labels_for};
use crate::store::{ManagedObject, ResourceKind};
use crds::{DevfileRegistry, DevfileRegistryStatus};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{Level, debug, info, instrument, warn};

/// Where a registry stands, recomputed from live state on every pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// None of the children exist yet
    NoChildren,
    /// Some children exist, others are still missing
    PartiallyConverged,
    /// Every child exists, no URL has been published
    ConvergedNoUrl,
    /// Every child exists and the published URL is current
    ConvergedUrlKnown,
    /// Every child exists but the published URL no longer matches the host
    ConvergedUrlStale,
}

impl Reconciler {
    /// Kinds the current spec asks for, in convergence order
    fn expected_children(&self, registry: &DevfileRegistry) -> Vec<ResourceKind> {
        let mut kinds = vec![ResourceKind::Service];
        if registry.storage_enabled() {
            kinds.push(ResourceKind::PersistentVolumeClaim);
        }
        kinds.push(ResourceKind::ConfigMap);
        kinds.push(ResourceKind::Deployment);
        kinds.push(if self.uses_route(registry) {
            ResourceKind::Route
        } else {
            ResourceKind::Ingress
        });
        kinds
    }

    /// Routes are used on clusters serving them unless an ingress domain is set
    fn uses_route(&self, registry: &DevfileRegistry) -> bool {
        self.route_support && registry.ingress_domain().is_none()
    }

    /// Classify a registry against live cluster state
    pub async fn registry_state(&self, registry: &DevfileRegistry) -> Result<RegistryState, ControllerError> {
        let (name, namespace) = resources::registry_key(registry)?;

        let mut present = 0;
        let expected = self.expected_children(registry);
        for kind in &expected {
            match self.store.get(*kind, namespace, &child_name(*kind, name)).await {
                Ok(_) => present += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        if present == 0 {
            return Ok(RegistryState::NoChildren);
        }
        if present < expected.len() {
            return Ok(RegistryState::PartiallyConverged);
        }
        if registry.status_url().is_empty() {
            return Ok(RegistryState::ConvergedNoUrl);
        }

        let hostname = if self.uses_route(registry) {
            match self.store.get(ResourceKind::Route, namespace, name).await? {
                ManagedObject::Route(route) => route.assigned_host().map(str::to_string),
                other => {
                    return Err(ControllerError::KindMismatch {
                        expected: ResourceKind::Route.as_str(),
                        found: other.kind().as_str(),
                    });
                }
            }
        } else {
            Some(resources::ingress_hostname(registry, self.config.default_ingress_domain.as_deref())?)
        };

        let current = hostname.map(|host| resources::registry_url(registry.tls_enabled(), &host));
        if current.as_deref() == Some(registry.status_url()) {
            Ok(RegistryState::ConvergedUrlKnown)
        } else {
            Ok(RegistryState::ConvergedUrlStale)
        }
    }

    /// Run one reconcile pass over a DevfileRegistry
    pub async fn reconcile_devfile_registry(&self, registry: &DevfileRegistry) -> Result<Action, ControllerError> {
        let (name, namespace) = resources::registry_key(registry)?;
        let labels = labels_for(name);
        info!("Deploying registry {}/{}", namespace, name);

        if let Some(action) = ensure(self.store.as_ref(), registry, ResourceKind::Service, &labels, "").await? {
            return Ok(action);
        }

        if registry.storage_enabled() {
            if let Some(action) =
                ensure(self.store.as_ref(), registry, ResourceKind::PersistentVolumeClaim, &labels, "").await?
            {
                return Ok(action);
            }
        }

        for kind in [ResourceKind::ConfigMap, ResourceKind::Deployment] {
            if let Some(action) = ensure(self.store.as_ref(), registry, kind, &labels, "").await? {
                return Ok(action);
            }
        }

        // The Deployment has stopped mounting the claim by now.
        self.delete_unused_volume(registry).await?;

        let hostname = match self.resolve_hostname(registry, &labels).await? {
            Some(hostname) => hostname,
            None => return Ok(Action::requeue(READ_AFTER_WRITE_REQUEUE)),
        };

        let url = resources::registry_url(registry.tls_enabled(), &hostname);
        if url == registry.status_url() {
            debug!("Registry {}/{} already published at {}", namespace, name, url);
            return Ok(Action::await_change());
        }

        // New deployments may not have a trusted certificate yet.
        if let Err(e) = self
            .prober
            .probe(&url, self.config.server_probe_timeout, false)
            .await
        {
            warn!(
                "Registry server {} did not answer within {:?}, requeueing: {}",
                url, self.config.server_probe_timeout, e
            );
            return Err(e.into());
        }

        let status = DevfileRegistryStatus { url: url.clone() };
        match self.store.patch_registry_status(namespace, name, &status).await {
            Ok(()) => info!("Registry {}/{} is reachable at {}", namespace, name, url),
            Err(e) if e.is_not_found() => {
                info!("DevfileRegistry {}/{} no longer exists, skipping status update", namespace, name);
                return Ok(Action::await_change());
            }
            Err(e) => return Err(e.into()),
        }

        // Consumers read the URL from the registry ConfigMap.
        let mut published = registry.clone();
        published.status = Some(status);
        if let Some(action) = ensure(self.store.as_ref(), &published, ResourceKind::ConfigMap, &labels, "").await? {
            return Ok(action);
        }

        Ok(Action::await_change())
    }

    /// Converge the Route or Ingress and return the registry's host
    ///
    /// `None` means the route's host could not be read back yet.
    async fn resolve_hostname(
        &self,
        registry: &DevfileRegistry,
        labels: &BTreeMap<String, String>,
    ) -> Result<Option<String>, ControllerError> {
        let (name, namespace) = resources::registry_key(registry)?;

        if !self.uses_route(registry) {
            let hostname = resources::ingress_hostname(registry, self.config.default_ingress_domain.as_deref())?;
            ensure(self.store.as_ref(), registry, ResourceKind::Ingress, labels, &hostname).await?;
            return Ok(Some(hostname));
        }

        ensure(self.store.as_ref(), registry, ResourceKind::Route, labels, "").await?;

        let route_name = child_name(ResourceKind::Route, name);
        match self.store.get(ResourceKind::Route, namespace, &route_name).await {
            Ok(ManagedObject::Route(route)) => match route.assigned_host() {
                Some(host) => Ok(Some(host.to_string())),
                None => {
                    warn!("Route {}/{} has no host assigned yet, requeueing", namespace, route_name);
                    Ok(None)
                }
            },
            Ok(other) => Err(ControllerError::KindMismatch {
                expected: ResourceKind::Route.as_str(),
                found: other.kind().as_str(),
            }),
            Err(e) => {
                // Most likely the cache has not seen the route created above.
                warn!("Failed to get Route {}/{}: {}, requeueing", namespace, route_name, e);
                Ok(None)
            }
        }
    }

    /// Delete the registry's claim when storage has been switched off
    async fn delete_unused_volume(&self, registry: &DevfileRegistry) -> Result<(), ControllerError> {
        if registry.storage_enabled() {
            return Ok(());
        }
        let (name, namespace) = resources::registry_key(registry)?;
        let pvc_name = child_name(ResourceKind::PersistentVolumeClaim, name);

        let pvc = match self
            .store
            .get(ResourceKind::PersistentVolumeClaim, namespace, &pvc_name)
            .await
        {
            Ok(pvc) => pvc,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if !resources::is_owned_by(pvc.metadata(), registry) {
            debug!(
                "PersistentVolumeClaim {}/{} is not owned by this registry, leaving it",
                namespace, pvc_name
            );
            return Ok(());
        }

        info!("Storage disabled, deleting PersistentVolumeClaim {}/{}", namespace, pvc_name);
        match self
            .store
            .delete(ResourceKind::PersistentVolumeClaim, namespace, &pvc_name)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Controller entry point for DevfileRegistry
#[instrument(skip(registry, ctx), fields(registry = %registry.name_any(), namespace = ?registry.namespace()))]
pub async fn reconcile(registry: Arc<DevfileRegistry>, ctx: Arc<Reconciler>) -> Result<Action, ControllerError> {
    let result = ctx.reconcile_devfile_registry(&registry).await;
    if tracing::enabled!(Level::DEBUG) {
        if let Ok(state) = ctx.registry_state(&registry).await {
            debug!("DevfileRegistry state after pass: {:?}", state);
        }
    }
    track_result(&ctx, registry.as_ref(), result)
}

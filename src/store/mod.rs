// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster store access for reconcilers.
//!
//! Reconcilers never hold a `kube::Client` directly. They read and write
//! through [`ClusterStore`], which the controller backs with [`KubeStore`].
//! Writes are plain create/replace calls so the API server's optimistic
//! concurrency check (`resourceVersion`) applies to every update; a stale
//! write surfaces as [`StoreError::Conflict`].

#[cfg(test)]
pub mod memory;

use crate::constants::FIELD_MANAGER;
use crate::errors::StoreError;
use async_trait::async_trait;
use kube::api::{Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use tracing::{debug, info};

/// Namespaced objects the store can persist.
pub trait StoreObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> StoreObject for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Read/create/replace access to namespaced cluster objects.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Fetch an object, `None` if it does not exist.
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str)
        -> Result<Option<K>, StoreError>;

    /// Create an object in the namespace named by its metadata.
    async fn create<K: StoreObject>(&self, object: &K) -> Result<K, StoreError>;

    /// Replace an object, guarded by its `resourceVersion`.
    async fn replace<K: StoreObject>(&self, object: &K) -> Result<K, StoreError>;

    /// Merge-patch the status subresource.
    async fn patch_status<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
        status: &serde_json::Value,
    ) -> Result<(), StoreError>;
}

/// Namespace and name of an object, required before it can be written.
///
/// # Errors
///
/// Returns [`StoreError::MissingMetadata`] when either is unset.
pub fn object_key<K: StoreObject>(object: &K) -> Result<(String, String), StoreError> {
    let meta = object.meta();
    let missing = |field| StoreError::MissingMetadata {
        kind: K::kind(&()).to_string(),
        field,
    };
    let namespace = meta.namespace.clone().ok_or_else(|| missing("namespace"))?;
    let name = meta.name.clone().ok_or_else(|| missing("name"))?;
    Ok((namespace, name))
}

/// [`ClusterStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

/// Maps HTTP 409 and 404 to the store's typed errors.
pub(crate) fn classify_write_error<K: StoreObject>(
    error: kube::Error,
    namespace: &str,
    name: &str,
    creating: bool,
) -> StoreError {
    match error {
        kube::Error::Api(api_err) if api_err.code == 409 => {
            let kind = K::kind(&()).to_string();
            let (namespace, name) = (namespace.to_string(), name.to_string());
            if creating {
                StoreError::AlreadyExists {
                    kind,
                    namespace,
                    name,
                }
            } else {
                StoreError::Conflict {
                    kind,
                    namespace,
                    name,
                }
            }
        }
        kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound {
            kind: K::kind(&()).to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        other => StoreError::Kube(other),
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        Ok(self.api::<K>(namespace).get_opt(name).await?)
    }

    async fn create<K: StoreObject>(&self, object: &K) -> Result<K, StoreError> {
        let (namespace, name) = object_key(object)?;
        let created = self
            .api::<K>(&namespace)
            .create(&post_params(), object)
            .await
            .map_err(|e| classify_write_error::<K>(e, &namespace, &name, true))?;
        info!("Created {} {}/{}", K::kind(&()), namespace, name);
        Ok(created)
    }

    async fn replace<K: StoreObject>(&self, object: &K) -> Result<K, StoreError> {
        let (namespace, name) = object_key(object)?;
        let replaced = self
            .api::<K>(&namespace)
            .replace(&name, &post_params(), object)
            .await
            .map_err(|e| classify_write_error::<K>(e, &namespace, &name, false))?;
        info!("Updated {} {}/{}", K::kind(&()), namespace, name);
        Ok(replaced)
    }

    async fn patch_status<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
        status: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let patch = json!({ "status": status });
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        self.api::<K>(namespace)
            .patch_status(name, &params, &Patch::Merge(&patch))
            .await
            .map_err(|e| classify_write_error::<K>(e, namespace, name, false))?;
        debug!("Patched {} {}/{} status", K::kind(&()), namespace, name);
        Ok(())
    }
}

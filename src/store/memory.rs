// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ClusterStore`] for reconciler tests.
//!
//! Objects are kept as JSON, keyed by kind, namespace and name. The store
//! mimics the API server behaviour reconcilers rely on: uid and
//! `resourceVersion` assignment, `clusterIP` allocation for Services,
//! stale-write conflicts, and status being owned by the status subresource.

use super::{object_key, ClusterStore, StoreObject};
use crate::errors::StoreError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

type ObjectKey = (String, String, String);

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, Value>,
    counter: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn key_for<K: StoreObject>(namespace: &str, name: &str) -> ObjectKey {
    (
        K::kind(&()).to_string(),
        namespace.to_string(),
        name.to_string(),
    )
}

fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    target.remove(key);
                } else {
                    merge(target.entry(key.clone()).or_insert(Value::Null), value);
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an object synchronously, as if another actor had done it.
    pub fn insert<K: StoreObject>(&self, object: &K) -> Result<K, StoreError> {
        let (namespace, name) = object_key(object)?;
        let key = key_for::<K>(&namespace, &name);
        let mut state = self.state.lock().unwrap();
        if state.objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: key.0,
                namespace,
                name,
            });
        }

        state.counter += 1;
        let counter = state.counter;
        let mut value = serde_json::to_value(object)?;
        value["metadata"]["uid"] = json!(format!("uid-{counter}"));
        value["metadata"]["resourceVersion"] = json!("1");
        if key.0 == "Service" && value["spec"]["clusterIP"].as_str().is_none() {
            value["spec"]["clusterIP"] = json!(format!("10.96.0.{counter}"));
        }

        let stored = serde_json::from_value(value.clone())?;
        state.objects.insert(key, value);
        Ok(stored)
    }

    /// Read an object synchronously.
    pub fn object<K: StoreObject>(&self, namespace: &str, name: &str) -> Option<K> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&key_for::<K>(namespace, name))
            .map(|value| serde_json::from_value(value.clone()).unwrap())
    }

    /// Overwrite an object's status, as a kubelet or controller would.
    pub fn set_status<K: StoreObject>(&self, namespace: &str, name: &str, status: Value) {
        let mut state = self.state.lock().unwrap();
        let value = state
            .objects
            .get_mut(&key_for::<K>(namespace, name))
            .unwrap();
        value["status"] = status;
        bump_resource_version(value);
    }

    /// Number of stored objects of one kind.
    pub fn count<K: StoreObject>(&self) -> usize {
        let kind = K::kind(&()).to_string();
        let state = self.state.lock().unwrap();
        state.objects.keys().filter(|(k, _, _)| *k == kind).count()
    }
}

fn bump_resource_version(value: &mut Value) {
    let current = value["metadata"]["resourceVersion"]
        .as_str()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    value["metadata"]["resourceVersion"] = json!((current + 1).to_string());
}

#[async_trait]
impl ClusterStore for MemoryStore {
    async fn get<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        Ok(self.object(namespace, name))
    }

    async fn create<K: StoreObject>(&self, object: &K) -> Result<K, StoreError> {
        self.insert(object)
    }

    async fn replace<K: StoreObject>(&self, object: &K) -> Result<K, StoreError> {
        let (namespace, name) = object_key(object)?;
        let key = key_for::<K>(&namespace, &name);
        let mut state = self.state.lock().unwrap();
        let Some(existing) = state.objects.get(&key) else {
            return Err(StoreError::NotFound {
                kind: key.0,
                namespace,
                name,
            });
        };

        let stored_version = existing["metadata"]["resourceVersion"].clone();
        if let Some(version) = object.meta().resource_version.as_deref() {
            if stored_version.as_str() != Some(version) {
                return Err(StoreError::Conflict {
                    kind: key.0,
                    namespace,
                    name,
                });
            }
        }

        let mut value = serde_json::to_value(object)?;
        value["metadata"]["uid"] = existing["metadata"]["uid"].clone();
        value["metadata"]["resourceVersion"] = stored_version;
        match existing.get("status") {
            Some(status) => value["status"] = status.clone(),
            None => {
                if let Some(map) = value.as_object_mut() {
                    map.remove("status");
                }
            }
        }
        bump_resource_version(&mut value);

        let stored = serde_json::from_value(value.clone())?;
        state.objects.insert(key, value);
        Ok(stored)
    }

    async fn patch_status<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
        status: &Value,
    ) -> Result<(), StoreError> {
        let key = key_for::<K>(namespace, name);
        let mut state = self.state.lock().unwrap();
        let Some(value) = state.objects.get_mut(&key) else {
            return Err(StoreError::NotFound {
                kind: key.0,
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        };
        merge(&mut value["status"], status);
        bump_resource_version(value);
        Ok(())
    }
}

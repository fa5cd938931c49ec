// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic fetch-or-create and drift-correction helpers for child resources.
//!
//! Every resource reconciler follows the same contract:
//!
//! 1. Build the desired object (pure, see [`crate::sonarqube_resources`]).
//! 2. [`fetch_or_create`]: return the existing object, or create it and stop
//!    the chain with `ResourceCreate`.
//! 3. Compare the owned fields; on the first mismatch, copy the desired value
//!    into the fetched object and [`correct_drift`], which stops the chain
//!    with `ResourceUpdate`.
//!
//! One corrective write per call keeps every mutation independently visible
//! in the audit trail. Several drifted fields converge over several cycles.
//!
//! # Example
//!
//! ```rust,ignore
//! use sonarqube_operator::reconcilers::resources::{correct_drift, fetch_or_create};
//!
//! let mut service = fetch_or_create(&ctx.store, &desired).await?;
//! if service.spec != desired.spec {
//!     service.spec = desired.spec.clone();
//!     return Err(correct_drift(&ctx.store, &service, "spec").await);
//! }
//! ```

use crate::errors::{Error, ErrorReason};
use crate::metrics::{record_child_created, record_drift_corrected};
use crate::store::{object_key, ClusterStore, StoreObject};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Fetch a child resource by the desired object's name, creating it if absent.
///
/// # Errors
///
/// Returns a `ResourceCreate` error after creating the object, or the store
/// error if the lookup or create fails.
pub async fn fetch_or_create<S, K>(store: &S, desired: &K) -> Result<K, Error>
where
    S: ClusterStore,
    K: StoreObject,
{
    let (namespace, name) = object_key(desired)?;
    let kind = K::kind(&());

    if let Some(existing) = store.get::<K>(&namespace, &name).await? {
        debug!("{} {}/{} exists", kind, namespace, name);
        return Ok(existing);
    }

    store.create(desired).await?;
    record_child_created(&kind);
    info!("Created {} {}/{}", kind, namespace, name);
    Err(Error::new(
        ErrorReason::ResourceCreate,
        format!("created {kind} {namespace}/{name}"),
    ))
}

/// Write back a drift-corrected object.
///
/// Always yields an error: `ResourceUpdate` naming the corrected `field` when
/// the write succeeds, otherwise the store failure.
pub async fn correct_drift<S, K>(store: &S, object: &K, field: &str) -> Error
where
    S: ClusterStore,
    K: StoreObject,
{
    let (namespace, name) = match object_key(object) {
        Ok(key) => key,
        Err(e) => return e.into(),
    };
    let kind = K::kind(&());

    match store.replace(object).await {
        Ok(_) => {
            record_drift_corrected(&kind, field);
            info!("Corrected {} on {} {}/{}", field, kind, namespace, name);
            Error::new(
                ErrorReason::ResourceUpdate,
                format!("updated {field} on {kind} {namespace}/{name}"),
            )
        }
        Err(e) => e.into(),
    }
}

/// Merge `desired` labels into `existing`, returning true if anything changed.
///
/// Labels added by other actors are left alone.
pub fn merge_labels(
    existing: &mut BTreeMap<String, String>,
    desired: &BTreeMap<String, String>,
) -> bool {
    let mut changed = false;
    for (key, value) in desired {
        if existing.get(key) != Some(value) {
            existing.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Server workload (Deployment) reconciliation.
//!
//! The workload depends on every other child resource: it runs as the
//! identity, mounts the credential bundle and the storage claim, and points
//! clustered nodes at the endpoint's cluster address.
//!
//! Drift is corrected one field per cycle, in this order:
//!
//! 1. replica count
//! 2. container environment (compared by name, order-insensitive)
//! 3. readiness probe
//! 4. liveness probe
//! 5. labels
//!
//! The image tag is not corrected, so pinning a version never restarts a
//! running server.

use super::resources::{correct_drift, fetch_or_create, merge_labels};
use super::status::SonarQubeStatusUpdater;
use crate::constants::CONTAINER_NAME;
use crate::context::Context;
use crate::crd::{SonarQube, WorkloadStatus};
use crate::errors::{Error, ErrorReason};
use crate::sonarqube_resources::{build_deployment, WorkloadDependencies};
use crate::store::ClusterStore;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, EnvVar, EnvVarSource};
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::debug;

const REPLICA_FAILURE: &str = "ReplicaFailure";

fn container_mut(deployment: &mut Deployment) -> Option<&mut Container> {
    deployment
        .spec
        .as_mut()?
        .template
        .spec
        .as_mut()?
        .containers
        .iter_mut()
        .find(|c| c.name == CONTAINER_NAME)
}

fn container(deployment: &Deployment) -> Option<&Container> {
    deployment
        .spec
        .as_ref()?
        .template
        .spec
        .as_ref()?
        .containers
        .iter()
        .find(|c| c.name == CONTAINER_NAME)
}

fn env_index(env: &[EnvVar]) -> BTreeMap<&str, (&str, Option<&EnvVarSource>)> {
    env.iter()
        .map(|var| {
            (
                var.name.as_str(),
                (var.value.as_deref().unwrap_or_default(), var.value_from.as_ref()),
            )
        })
        .collect()
}

/// True when two environments differ in names, values or sources, ignoring order.
#[must_use]
pub fn env_differs(current: &[EnvVar], desired: &[EnvVar]) -> bool {
    env_index(current) != env_index(desired)
}

/// Copy the first drifted field of `desired` into `existing` and name it.
pub fn deployment_drift(existing: &mut Deployment, desired: &Deployment) -> Option<&'static str> {
    let desired_replicas = desired.spec.as_ref().and_then(|s| s.replicas);
    let spec = existing.spec.get_or_insert_with(Default::default);
    if spec.replicas != desired_replicas {
        spec.replicas = desired_replicas;
        return Some("replicas");
    }

    let Some(wanted) = container(desired).cloned() else {
        return None;
    };
    if container(existing).is_none() {
        // Container missing entirely: restore the whole pod template.
        if let (Some(spec), Some(desired_spec)) = (existing.spec.as_mut(), desired.spec.as_ref()) {
            spec.template = desired_spec.template.clone();
        }
        return Some("pod template");
    }
    let current = container_mut(existing)?;

    let current_env = current.env.clone().unwrap_or_default();
    let wanted_env = wanted.env.clone().unwrap_or_default();
    if env_differs(&current_env, &wanted_env) {
        current.env = wanted.env;
        return Some("environment");
    }
    if current.readiness_probe != wanted.readiness_probe {
        current.readiness_probe = wanted.readiness_probe;
        return Some("readiness probe");
    }
    if current.liveness_probe != wanted.liveness_probe {
        current.liveness_probe = wanted.liveness_probe;
        return Some("liveness probe");
    }

    if merge_labels(existing.labels_mut(), desired.labels()) {
        return Some("labels");
    }
    None
}

/// Group the workload's name by rollout state; the first matching rule wins.
///
/// A workload scaled to zero, or with no observed replicas yet, lands in no bucket.
#[must_use]
pub fn workload_buckets(deployment: &Deployment) -> WorkloadStatus {
    let mut buckets = WorkloadStatus::default();
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let status = deployment.status.clone().unwrap_or_default();
    let replicas = status.replicas.unwrap_or(0);
    if desired == 0 || replicas == 0 {
        return buckets;
    }

    let name = deployment.name_any();
    if replicas > status.updated_replicas.unwrap_or(0) {
        buckets.updating.push(name);
    } else if replicas == status.ready_replicas.unwrap_or(0) {
        buckets.ready.push(name);
    } else if replicas == status.available_replicas.unwrap_or(0) {
        buckets.available.push(name);
    } else if replicas == status.unavailable_replicas.unwrap_or(0) {
        buckets.unavailable.push(name);
    }
    buckets
}

/// Check the workload's rollout state.
///
/// # Errors
///
/// `ResourceInvalid` on a `ReplicaFailure` condition, `ResourceWaiting` while
/// no replica is ready or available.
pub fn check_rollout(deployment: &Deployment) -> Result<(), Error> {
    let status = deployment.status.clone().unwrap_or_default();
    let key = format!(
        "{}/{}",
        deployment.namespace().unwrap_or_default(),
        deployment.name_any()
    );

    if let Some(failure) = status
        .conditions
        .as_ref()
        .and_then(|conditions| {
            conditions
                .iter()
                .find(|c| c.type_ == REPLICA_FAILURE && c.status == "True")
        })
    {
        return Err(Error::new(
            ErrorReason::ResourceInvalid,
            format!(
                "deployment {key} replica failure: {}",
                failure.message.as_deref().unwrap_or("no message")
            ),
        ));
    }

    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    if desired > 0
        && status.ready_replicas.unwrap_or(0) == 0
        && status.available_replicas.unwrap_or(0) == 0
    {
        return Err(Error::new(
            ErrorReason::ResourceWaiting,
            format!("waiting for deployment {key} to become available"),
        ));
    }
    Ok(())
}

/// Ensure the workload exists, matches the spec and is rolling out cleanly.
///
/// Records the rollout buckets in the status.
///
/// # Errors
///
/// `ResourceCreate`/`ResourceUpdate` after a write, `ResourceInvalid` or
/// `ResourceWaiting` from the rollout state, or a store error.
pub async fn reconcile_workload<S: ClusterStore>(
    ctx: &Context<S>,
    instance: &SonarQube,
    deps: &WorkloadDependencies,
    status: &mut SonarQubeStatusUpdater,
) -> Result<Deployment, Error> {
    let desired = build_deployment(instance, deps, &ctx.image);
    let mut deployment = fetch_or_create(&ctx.store, &desired).await?;

    let buckets = workload_buckets(&deployment);
    debug!(buckets = ?buckets, "Workload rollout state");
    status.set_workload_status(buckets);

    if let Some(field) = deployment_drift(&mut deployment, &desired) {
        return Err(correct_drift(&ctx.store, &deployment, field).await);
    }

    check_rollout(&deployment)?;
    Ok(deployment)
}

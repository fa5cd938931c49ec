// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster-internal network endpoint (Service).

use super::resources::{correct_drift, fetch_or_create, merge_labels};
use super::status::SonarQubeStatusUpdater;
use crate::context::Context;
use crate::crd::SonarQube;
use crate::errors::Error;
use crate::sonarqube_resources::build_service;
use crate::store::ClusterStore;
use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;

/// Copy the first drifted field of `desired` into `existing` and name it.
///
/// Checked in order: selector, ports, type, labels.
pub fn service_drift(existing: &mut Service, desired: &Service) -> Option<&'static str> {
    let desired_spec = desired.spec.clone().unwrap_or_default();
    let spec = existing.spec.get_or_insert_with(Default::default);

    if spec.selector != desired_spec.selector {
        spec.selector = desired_spec.selector;
        return Some("selector");
    }
    if spec.ports != desired_spec.ports {
        spec.ports = desired_spec.ports;
        return Some("ports");
    }
    if spec.type_ != desired_spec.type_ {
        spec.type_ = desired_spec.type_;
        return Some("type");
    }
    if merge_labels(existing.labels_mut(), desired.labels()) {
        return Some("labels");
    }
    None
}

/// Ensure the Service exists and matches the role's port set.
///
/// Records the Service name in the status.
///
/// # Errors
///
/// `ResourceCreate` or `ResourceUpdate` after a write, or a store error.
pub async fn reconcile_endpoint<S: ClusterStore>(
    ctx: &Context<S>,
    instance: &SonarQube,
    status: &mut SonarQubeStatusUpdater,
) -> Result<Service, Error> {
    let desired = build_service(instance);
    let mut service = fetch_or_create(&ctx.store, &desired).await?;
    status.set_service(&service.name_any());

    if let Some(field) = service_drift(&mut service, &desired) {
        return Err(correct_drift(&ctx.store, &service, field).await);
    }
    Ok(service)
}

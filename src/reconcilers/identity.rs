// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service account the workload runs as.
//!
//! Named by `spec.serviceAccountRef`, else after the instance. Only existence
//! is reconciled.

use super::resources::fetch_or_create;
use crate::context::Context;
use crate::crd::SonarQube;
use crate::errors::Error;
use crate::sonarqube_resources::build_service_account;
use crate::store::ClusterStore;
use k8s_openapi::api::core::v1::ServiceAccount;

/// Ensure the instance's service account exists.
///
/// # Errors
///
/// `ResourceCreate` when the account was just created, or a store error.
pub async fn reconcile_identity<S: ClusterStore>(
    ctx: &Context<S>,
    instance: &SonarQube,
) -> Result<ServiceAccount, Error> {
    fetch_or_create(&ctx.store, &build_service_account(instance)).await
}

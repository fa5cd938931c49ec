// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Persistent storage claim for data, logs and extensions.
//!
//! Size and storage class are fixed at creation; resizing is not reconciled.

use super::resources::fetch_or_create;
use crate::context::Context;
use crate::crd::SonarQube;
use crate::errors::{Error, ErrorReason};
use crate::sonarqube_resources::{build_storage_claim, is_valid_quantity};
use crate::store::ClusterStore;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;

/// Ensure the instance's storage claim exists.
///
/// # Errors
///
/// `SpecInvalid` if `spec.storageSize` is not a resource quantity,
/// `ResourceCreate` when the claim was just created, or a store error.
pub async fn reconcile_storage<S: ClusterStore>(
    ctx: &Context<S>,
    instance: &SonarQube,
) -> Result<PersistentVolumeClaim, Error> {
    let size = instance.spec.storage_size_or_default();
    if !is_valid_quantity(size) {
        return Err(Error::new(
            ErrorReason::SpecInvalid,
            format!("storageSize '{size}' is not a valid quantity"),
        ));
    }

    fetch_or_create(&ctx.store, &build_storage_claim(instance)).await
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Credential bundle reconciliation.
//!
//! The bundle is the only child resource several instances may share. An
//! instance that did not create the bundle never takes ownership of it; it
//! appends its own name to the bundle's reverse-reference annotation so that
//! changes to the bundle trigger it as well (see [`crate::credential_refs`]).
//! The annotation only ever grows, so concurrent writers can at worst cause a
//! conflict and a retry, never a lost reference.

use super::resources::{correct_drift, fetch_or_create};
use crate::context::Context;
use crate::credential_refs::append_reference;
use crate::crd::SonarQube;
use crate::errors::{Error, ErrorReason};
use crate::labels::CREDENTIAL_REFERENCES_ANNOTATION;
use crate::sonarqube_resources::{
    build_credential_bundle, default_credential_bundle_name, is_owned_by,
};
use crate::store::ClusterStore;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use tracing::info;

/// Ensure the instance has a named credential bundle that references it.
///
/// An instance without `spec.credentialRef` first gets `{name}-config`
/// written into its spec, and nothing else happens in that cycle.
///
/// # Errors
///
/// - `SpecUpdate` after assigning `credentialRef`
/// - `ResourceCreate` after creating the bundle
/// - `ResourceUpdate` after recording this instance on a shared bundle
/// - a store error otherwise
pub async fn reconcile_credentials<S: ClusterStore>(
    ctx: &Context<S>,
    instance: &mut SonarQube,
) -> Result<Secret, Error> {
    let Some(bundle_name) = instance.spec.credential_ref.clone() else {
        let bundle_name = default_credential_bundle_name(instance);
        instance.spec.credential_ref = Some(bundle_name.clone());
        *instance = ctx.store.replace(&*instance).await?;
        info!(
            "Assigned credential bundle {} to SonarQube {}/{}",
            bundle_name,
            instance.namespace().unwrap_or_default(),
            instance.name_any()
        );
        return Err(Error::new(
            ErrorReason::SpecUpdate,
            format!("set credentialRef to {bundle_name}"),
        ));
    };

    let mut bundle =
        fetch_or_create(&ctx.store, &build_credential_bundle(instance, &bundle_name)).await?;

    if is_owned_by(&bundle.metadata, instance) {
        return Ok(bundle);
    }

    let existing = bundle
        .annotations()
        .get(CREDENTIAL_REFERENCES_ANNOTATION)
        .map(String::as_str);
    if let Some(references) = append_reference(existing, &instance.name_any()) {
        bundle
            .annotations_mut()
            .insert(CREDENTIAL_REFERENCES_ANNOTATION.to_string(), references);
        return Err(correct_drift(&ctx.store, &bundle, "credential references").await);
    }

    Ok(bundle)
}

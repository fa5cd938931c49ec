// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reverse references from a shared credential bundle to its instances.
//!
//! Several `SonarQube` instances in a namespace may mount the same credential
//! bundle. Each instance that uses a bundle records its name in the bundle's
//! [`CREDENTIAL_REFERENCES_ANNOTATION`]. Entries are appended and never removed
//! or duplicated.
//!
//! The annotation is a secondary index `bundle -> {instance}`. The controller
//! watches bundles and maps each change to the referencing instances with
//! [`referencing_instances`].

use crate::crd::SonarQube;
use crate::labels::{CREDENTIAL_REFERENCES_ANNOTATION, CREDENTIAL_REFERENCES_SEPARATOR};
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use std::collections::BTreeSet;

/// Parses a reference list into the set of instance names it names.
#[must_use]
pub fn parse_references(value: &str) -> BTreeSet<String> {
    value
        .split(CREDENTIAL_REFERENCES_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Returns the reference list with `instance` appended, or `None` if it is already listed.
///
/// Existing entries keep their order; membership is an exact name match.
#[must_use]
pub fn append_reference(existing: Option<&str>, instance: &str) -> Option<String> {
    match existing.filter(|value| !value.trim().is_empty()) {
        None => Some(instance.to_string()),
        Some(value) if parse_references(value).contains(instance) => None,
        Some(value) => Some(format!(
            "{value}{CREDENTIAL_REFERENCES_SEPARATOR}{instance}"
        )),
    }
}

/// Names of the instances recorded on a credential bundle.
#[must_use]
pub fn bundle_references(secret: &Secret) -> BTreeSet<String> {
    secret
        .annotations()
        .get(CREDENTIAL_REFERENCES_ANNOTATION)
        .map(|value| parse_references(value))
        .unwrap_or_default()
}

/// Maps a changed credential bundle to the instances that reference it.
///
/// Used as the trigger mapper for the `Secret` watch.
#[must_use]
pub fn referencing_instances(secret: Secret) -> Vec<ObjectRef<SonarQube>> {
    let namespace = secret.namespace().unwrap_or_default();
    bundle_references(&secret)
        .into_iter()
        .map(|name| ObjectRef::new(&name).within(&namespace))
        .collect()
}

#[cfg(test)]
#[path = "credential_refs_tests.rs"]
mod credential_refs_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Remote health verification and version locking.
//!
//! Once the workload is available, the controller talks to the server's
//! system API through the endpoint (or `spec.externalURL`):
//!
//! 1. `ping` must answer `pong`, else the server is still coming up.
//! 2. `status` lifecycle is classified; anything but `UP` stops the chain.
//! 3. A server that has not reported its version yet is still waiting.
//! 4. The first reported version is locked into `spec.version` (with the
//!    edition defaulted), and never overwritten afterwards.
//! 5. Available upgrades are split by plugin compatibility into the status.

use super::status::SonarQubeStatusUpdater;
use crate::constants::WEB_PORT;
use crate::context::Context;
use crate::crd::{SonarQube, UpgradeReport};
use crate::errors::{Error, ErrorReason};
use crate::server_api::{Lifecycle, RemoteStatus, UpgradesResponse};
use crate::store::ClusterStore;
use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;
use tracing::{debug, info};

/// Base URL of the server's web API.
///
/// `spec.externalURL` wins; otherwise the endpoint's cluster IP and first
/// port, or its in-cluster DNS name when no cluster IP is assigned.
#[must_use]
pub fn server_url(instance: &SonarQube, service: &Service) -> String {
    if let Some(url) = instance
        .spec
        .external_url
        .as_deref()
        .filter(|url| !url.is_empty())
    {
        return url.to_string();
    }

    let spec = service.spec.clone().unwrap_or_default();
    let port = spec
        .ports
        .as_ref()
        .and_then(|ports| ports.first())
        .map_or(WEB_PORT, |p| p.port);

    match spec
        .cluster_ip
        .filter(|ip| !ip.is_empty() && *ip != "None")
    {
        Some(ip) => format!("http://{ip}:{port}"),
        None => format!(
            "http://{}.{}.svc:{port}",
            service.name_any(),
            service.namespace().unwrap_or_default()
        ),
    }
}

/// Classify the reported lifecycle; only `UP` passes.
///
/// # Errors
///
/// `ServerDown` for `DOWN`, `ServerWaiting` for every other state.
pub fn classify_lifecycle(status: &RemoteStatus) -> Result<(), Error> {
    match status.lifecycle {
        Lifecycle::Up => Ok(()),
        Lifecycle::Down => Err(Error::new(
            ErrorReason::ServerDown,
            format!("server {} reports status DOWN", status.id),
        )),
        Lifecycle::Starting
        | Lifecycle::Restarting
        | Lifecycle::DbMigrationNeeded
        | Lifecycle::DbMigrationRunning => Err(Error::new(
            ErrorReason::ServerWaiting,
            format!("waiting for server status {}", status.lifecycle.as_str()),
        )),
        Lifecycle::Unknown => Err(Error::new(
            ErrorReason::ServerWaiting,
            "waiting for server status to report",
        )),
    }
}

/// Split upgrades by whether any installed plugin would become incompatible.
#[must_use]
pub fn classify_upgrades(response: &UpgradesResponse) -> UpgradeReport {
    let mut report = UpgradeReport::default();
    for upgrade in &response.upgrades {
        let version = upgrade.version.major_minor_patch();
        if upgrade.plugins.incompatible.is_empty() {
            report.compatible.push(version);
        } else {
            report.incompatible.push(version);
        }
    }
    report
}

/// Verify the running server and lock its version into the spec.
///
/// # Errors
///
/// - `ServerWaiting` while the API does not answer, the server is not `UP`,
///   or its version is not reported yet
/// - `ServerDown` when the server reports `DOWN`
/// - `SpecUpdate` after locking the version
/// - `SpecInvalid` when `spec.externalURL` is not a URL
/// - a store or server API error otherwise
pub async fn reconcile_server<S: ClusterStore>(
    ctx: &Context<S>,
    instance: &mut SonarQube,
    service: &Service,
    status: &mut SonarQubeStatusUpdater,
) -> Result<(), Error> {
    let url = server_url(instance, service);
    let api = ctx.server_api.connect(&url).map_err(|e| {
        let external = instance.spec.external_url.as_deref();
        if external.filter(|url| !url.is_empty()).is_some() {
            Error::new(ErrorReason::SpecInvalid, format!("externalURL: {e}"))
        } else {
            e.into()
        }
    })?;

    if let Err(e) = api.ping().await {
        debug!(url = %url, error = %e, "Server API not answering");
        return Err(Error::new(
            ErrorReason::ServerWaiting,
            "waiting for api to respond",
        ));
    }

    let remote = api.status().await?;
    classify_lifecycle(&remote)?;

    if remote.version.is_unset() {
        return Err(Error::new(
            ErrorReason::ServerWaiting,
            "waiting for server version to report",
        ));
    }

    if instance.spec.version.is_none() {
        let version = remote.version.major_minor_patch();
        instance.spec.version = Some(version.clone());
        instance.spec.edition.get_or_insert_with(Default::default);
        *instance = ctx.store.replace(&*instance).await?;
        info!(
            "Locked SonarQube {}/{} to version {}",
            instance.namespace().unwrap_or_default(),
            instance.name_any(),
            version
        );
        return Err(Error::new(
            ErrorReason::SpecUpdate,
            format!("locked version to {version}"),
        ));
    }

    status.set_observed_version(&remote.version.to_string());

    let upgrades = api.upgrades().await?;
    status.set_upgrades(classify_upgrades(&upgrades));
    Ok(())
}

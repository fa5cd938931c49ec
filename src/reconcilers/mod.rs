// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of `SonarQube` instances.
//!
//! [`reconcile_sonarqube`] is invoked once per trigger. It runs the steps in
//! dependency order and stops at the first error:
//!
//! 1. [`credentials`] - assign `credentialRef`, ensure the bundle, record references
//! 2. [`identity`] - service account
//! 3. [`endpoint`] - Service with the role's ports
//! 4. [`storage`] - persistent volume claim
//! 5. [`workload`] - Deployment, wired to everything above
//! 6. shut-down instances stop here with `ResourceShutdown`
//! 7. [`server`] - remote health and version locking (not for search nodes)
//!
//! Every step is an idempotent create-or-converge, so the chain is safe to
//! re-run from the top after any partial failure. Nothing retries in-process;
//! the [`status::aggregate`] directive tells the controller runtime when to
//! come back, and the collected status is written once at the end.

pub mod credentials;
pub mod endpoint;
pub mod identity;
pub mod resources;
pub mod server;
pub mod status;
pub mod storage;
pub mod workload;

#[cfg(test)]
mod fixtures;

pub use status::RetryDirective;

use crate::context::Context;
use crate::crd::{ServerRole, SonarQube};
use crate::errors::{Error, ErrorReason};
use crate::metrics::{record_error, record_reconcile, ReconcileOutcome};
use crate::sonarqube_resources::{revision_hash, WorkloadDependencies};
use crate::store::ClusterStore;
use kube::ResourceExt;
use status::{aggregate, SonarQubeStatusUpdater};
use std::time::Instant;
use tracing::{debug, info_span, Instrument};

/// Reconcile one `SonarQube` instance and write its status.
///
/// The caller's object is never mutated; spec writes made along the way
/// (credential reference, version lock) go straight to the store and are
/// seen by the next cycle.
///
/// # Errors
///
/// Returns the chain's error when its reason is `Unknown` (store or network
/// failures), or a failure to write the status.
pub async fn reconcile_sonarqube<S: ClusterStore>(
    ctx: &Context<S>,
    instance: &SonarQube,
) -> Result<RetryDirective, Error> {
    let span = info_span!(
        "reconcile",
        namespace = %instance.namespace().unwrap_or_default(),
        name = %instance.name_any()
    );

    async move {
        let start = Instant::now();
        let mut working = instance.clone();
        let mut status = SonarQubeStatusUpdater::new(&working);

        let outcome = run_chain(ctx, &mut working, &mut status).await;
        let reason = outcome.as_ref().err().map(Error::reason);
        if let Some(reason) = reason {
            record_error(reason);
        }

        let directive = aggregate(outcome, &mut status);
        status.apply(&ctx.store).await?;

        let recorded = match &directive {
            Ok(RetryDirective::Stop) => ReconcileOutcome::Converged,
            Ok(next) => {
                debug!(directive = ?next, "Requeueing");
                ReconcileOutcome::Requeued
            }
            Err(_) => ReconcileOutcome::Failed,
        };
        record_reconcile(recorded, reason, start.elapsed());
        directive
    }
    .instrument(span)
    .await
}

async fn run_chain<S: ClusterStore>(
    ctx: &Context<S>,
    instance: &mut SonarQube,
    status: &mut SonarQubeStatusUpdater,
) -> Result<(), Error> {
    let revision = revision_hash(&instance.spec)?;
    instance
        .status
        .get_or_insert_with(Default::default)
        .revision = Some(revision.clone());
    status.set_revision(&revision);

    let bundle = credentials::reconcile_credentials(ctx, instance).await?;
    let identity = identity::reconcile_identity(ctx, instance).await?;
    let service = endpoint::reconcile_endpoint(ctx, instance, status).await?;
    let claim = storage::reconcile_storage(ctx, instance).await?;

    let deps = WorkloadDependencies {
        service_account: identity.name_any(),
        credential_bundle: bundle.name_any(),
        storage_claim: claim.name_any(),
        cluster_ip: service.spec.as_ref().and_then(|s| s.cluster_ip.clone()),
    };
    workload::reconcile_workload(ctx, instance, &deps, status).await?;

    if instance.spec.is_shutdown() {
        return Err(Error::new(
            ErrorReason::ResourceShutdown,
            "instance is shut down",
        ));
    }

    if instance.spec.role() == ServerRole::SearchNode {
        debug!("Search nodes have no web API, skipping server checks");
        return Ok(());
    }

    server::reconcile_server(ctx, instance, &service, status).await
}

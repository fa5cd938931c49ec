// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fixtures for reconciler tests.

use crate::context::Context;
use crate::crd::{SonarQube, SonarQubeSpec};
use crate::errors::Error;
use crate::reconcilers::{reconcile_sonarqube, RetryDirective};
use crate::server_api::mock::MockServerApi;
use crate::server_api::Lifecycle;
use crate::store::memory::MemoryStore;
use k8s_openapi::api::apps::v1::Deployment;
use serde_json::json;
use std::sync::Arc;

pub const NAMESPACE: &str = "sonar";

pub fn instance(name: &str, spec: SonarQubeSpec) -> SonarQube {
    let mut sq = SonarQube::new(name, spec);
    sq.metadata.namespace = Some(NAMESPACE.to_string());
    sq
}

/// A store-backed context whose server reports `UP` at 8.3.0.
pub fn context() -> (Context<MemoryStore>, MockServerApi) {
    let api = MockServerApi::with_status("8.3.0", Lifecycle::Up);
    let ctx = Context::new(MemoryStore::new(), Arc::new(api.clone()), "sonarqube");
    (ctx, api)
}

/// Store an instance the way the API server would, returning the stored copy.
pub fn seed(ctx: &Context<MemoryStore>, sq: &SonarQube) -> SonarQube {
    ctx.store.insert(sq).unwrap()
}

pub fn stored(ctx: &Context<MemoryStore>, name: &str) -> SonarQube {
    ctx.store.object(NAMESPACE, name).unwrap()
}

/// Re-read the instance and run one reconcile, as a watch event would.
pub async fn cycle(ctx: &Context<MemoryStore>, name: &str) -> Result<RetryDirective, Error> {
    let current = stored(ctx, name);
    reconcile_sonarqube(ctx, &current).await
}

/// Message of the single `True` condition, if any.
pub fn active_message(ctx: &Context<MemoryStore>, name: &str) -> Option<String> {
    stored(ctx, name)
        .status
        .unwrap_or_default()
        .conditions
        .into_iter()
        .find(|c| c.status == "True")
        .and_then(|c| c.message)
}

/// Mark a Deployment as fully rolled out with one replica.
pub fn mark_available(ctx: &Context<MemoryStore>, name: &str) {
    ctx.store
        .set_status::<Deployment>(
            NAMESPACE,
            name,
            json!({
                "replicas": 1,
                "updatedReplicas": 1,
                "readyReplicas": 1,
                "availableReplicas": 1
            }),
        );
}

/// Run cycles while they ask for an immediate requeue, returning the first other outcome.
pub async fn settle(ctx: &Context<MemoryStore>, name: &str) -> Result<RetryDirective, Error> {
    for _ in 0..32 {
        match cycle(ctx, name).await {
            Ok(RetryDirective::Immediate) => continue,
            other => return other,
        }
    }
    panic!("{name} did not settle");
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `SonarQube` controller.
//!
//! Every reconcile receives an `Arc<Context>` holding:
//! - the cluster store reconcilers read and write through
//! - the server API provider used to reach running servers
//! - the image repository workloads run

use crate::server_api::ServerApiProvider;
use crate::store::{ClusterStore, KubeStore};
use std::sync::Arc;

/// Shared context passed to the reconciler.
#[derive(Clone)]
pub struct Context<S: ClusterStore = KubeStore> {
    /// Cluster store for child resources and the instance itself
    pub store: S,

    /// Connects to a server's system API by base URL
    pub server_api: Arc<dyn ServerApiProvider>,

    /// Image repository, tagged with the instance version and edition
    pub image: String,
}

impl<S: ClusterStore> Context<S> {
    pub fn new(
        store: S,
        server_api: Arc<dyn ServerApiProvider>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            store,
            server_api,
            image: image.into(),
        }
    }
}

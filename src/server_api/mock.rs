// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Scripted in-memory server API for reconciler tests.

use super::{Lifecycle, RemoteStatus, ServerApi, ServerApiProvider, UpgradesResponse};
use crate::errors::ServerApiError;
use crate::version::RemoteVersion;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct MockState {
    ping_fails: bool,
    status: RemoteStatus,
    upgrades: UpgradesResponse,
    connected: Vec<String>,
}

/// A [`ServerApiProvider`] whose every connection answers from shared, mutable state.
#[derive(Clone, Debug, Default)]
pub struct MockServerApi {
    state: Arc<Mutex<MockState>>,
}

impl MockServerApi {
    /// A server reporting `lifecycle` at `version`.
    pub fn with_status(version: &str, lifecycle: Lifecycle) -> Self {
        let mock = Self::default();
        mock.set_status(version, lifecycle);
        mock
    }

    pub fn set_status(&self, version: &str, lifecycle: Lifecycle) {
        let mut state = self.state.lock().unwrap();
        state.status = RemoteStatus {
            id: "mock".into(),
            version: version.parse::<RemoteVersion>().unwrap(),
            lifecycle,
        };
    }

    pub fn set_upgrades(&self, upgrades: UpgradesResponse) {
        self.state.lock().unwrap().upgrades = upgrades;
    }

    pub fn set_ping_fails(&self, fails: bool) {
        self.state.lock().unwrap().ping_fails = fails;
    }

    /// Base URLs handed to `connect`, in call order.
    pub fn connected(&self) -> Vec<String> {
        self.state.lock().unwrap().connected.clone()
    }
}

impl ServerApiProvider for MockServerApi {
    fn connect(&self, base_url: &str) -> Result<Box<dyn ServerApi>, ServerApiError> {
        self.state.lock().unwrap().connected.push(base_url.to_string());
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl ServerApi for MockServerApi {
    async fn ping(&self) -> Result<(), ServerApiError> {
        if self.state.lock().unwrap().ping_fails {
            return Err(ServerApiError::UnexpectedBody {
                url: "mock".into(),
                body: String::new(),
            });
        }
        Ok(())
    }

    async fn status(&self) -> Result<RemoteStatus, ServerApiError> {
        Ok(self.state.lock().unwrap().status.clone())
    }

    async fn upgrades(&self) -> Result<UpgradesResponse, ServerApiError> {
        Ok(self.state.lock().unwrap().upgrades.clone())
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Client for the `SonarQube` server's system API.
//!
//! The controller reads three endpoints from a running server:
//!
//! - `GET /api/system/ping`: liveness, body must be exactly `pong`
//! - `GET /api/system/status`: server id, version and lifecycle state
//! - `GET /api/system/upgrades`: versions offered by the update center
//!
//! Reconcilers talk to the server through the [`ServerApi`] trait, obtained
//! per base URL from a [`ServerApiProvider`]. [`HttpServerApiProvider`] is the
//! reqwest-backed implementation used in production.

pub mod client;
#[cfg(test)]
pub mod mock;

pub use client::{build_base_url, HttpServerApi, HttpServerApiProvider};

use crate::errors::ServerApiError;
use crate::version::RemoteVersion;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Lifecycle state reported by `/api/system/status`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lifecycle {
    Up,
    Down,
    Starting,
    Restarting,
    DbMigrationNeeded,
    DbMigrationRunning,
    /// Any state this controller does not know about
    #[default]
    #[serde(other)]
    Unknown,
}

impl Lifecycle {
    /// Wire name as reported by the server.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Starting => "STARTING",
            Self::Restarting => "RESTARTING",
            Self::DbMigrationNeeded => "DB_MIGRATION_NEEDED",
            Self::DbMigrationRunning => "DB_MIGRATION_RUNNING",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Response of `/api/system/status`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteStatus {
    #[serde(default)]
    pub id: String,

    /// All-zero until the server has determined its version
    #[serde(default)]
    pub version: RemoteVersion,

    #[serde(rename = "status", default)]
    pub lifecycle: Lifecycle,
}

/// A plugin listed against an upgrade.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Plugin {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Installed plugins affected by an upgrade.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePlugins {
    #[serde(default)]
    pub require_update: Vec<Plugin>,

    /// Plugins with no compatible release for the upgrade
    #[serde(default)]
    pub incompatible: Vec<Plugin>,
}

/// One upgrade offered by the update center.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    pub version: RemoteVersion,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub plugins: UpgradePlugins,
}

/// Response of `/api/system/upgrades`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradesResponse {
    #[serde(default)]
    pub upgrades: Vec<Upgrade>,
    #[serde(default)]
    pub update_center_refresh: Option<String>,
}

/// Read access to one server's system API.
#[async_trait]
pub trait ServerApi: Send + Sync {
    /// Succeeds when the server answers `pong` with HTTP 200.
    async fn ping(&self) -> Result<(), ServerApiError>;

    async fn status(&self) -> Result<RemoteStatus, ServerApiError>;

    async fn upgrades(&self) -> Result<UpgradesResponse, ServerApiError>;
}

/// Creates a [`ServerApi`] for a server base URL.
pub trait ServerApiProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    fn connect(&self, base_url: &str) -> Result<Box<dyn ServerApi>, ServerApiError>;
}

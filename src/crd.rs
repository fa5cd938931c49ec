// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for managed `SonarQube` servers.
//!
//! A [`SonarQube`] resource declares one server instance: its role in a
//! cluster (all-in-one, application node or search node), the pinned version
//! and edition, placement constraints and storage. The controller owns every
//! child resource it creates for the instance and records what it observed in
//! [`SonarQubeStatus`].
//!
//! # Example: A minimal all-in-one server
//!
//! ```rust,no_run
//! use sonarqube_operator::crd::{SonarQubeSpec, ServerRole};
//!
//! let spec = SonarQubeSpec {
//!     server_role: Some(ServerRole::AllInOne),
//!     storage_size: Some("10Gi".to_string()),
//!     ..Default::default()
//! };
//! assert_eq!(spec.desired_replicas(), 1);
//! ```

use crate::constants::{DEFAULT_EDITION, DEFAULT_STORAGE_SIZE};
use k8s_openapi::api::core::v1::{NodeAffinity, PodAffinity, PodAntiAffinity, ResourceRequirements};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition: Progressing, Invalid, Shutdown or Unavailable.
    pub r#type: String,

    /// Status of the condition: True or False.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Edition tier of the `SonarQube` distribution.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    #[default]
    Community,
    Developer,
    Enterprise,
}

impl Edition {
    /// Image-tag form of the edition.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Community => DEFAULT_EDITION,
            Self::Developer => "developer",
            Self::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating mode of a `SonarQube` instance.
///
/// The role determines which ports the instance exposes and which clustering
/// environment the container receives.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ServerRole {
    /// Single process running web, compute engine and search.
    #[default]
    #[serde(rename = "aio")]
    AllInOne,

    /// Data Center Edition application node (web + compute engine).
    #[serde(rename = "application")]
    ApplicationNode,

    /// Data Center Edition search node.
    #[serde(rename = "search")]
    SearchNode,
}

impl ServerRole {
    /// Wire form of the role, also used as the component label and node type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllInOne => "aio",
            Self::ApplicationNode => "application",
            Self::SearchNode => "search",
        }
    }

    /// Whether the role joins a Data Center cluster.
    #[must_use]
    pub fn is_clustered(self) -> bool {
        !matches!(self, Self::AllInOne)
    }
}

impl fmt::Display for ServerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pod placement and resource constraints, applied verbatim to the workload.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_affinity: Option<NodeAffinity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_affinity: Option<PodAffinity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_anti_affinity: Option<PodAntiAffinity>,

    /// Priority class name for the server pod.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_class: Option<String>,

    /// Compute resources for the server container.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// `SonarQube` declares a managed SonarQube server instance.
///
/// # Example YAML
///
/// ```yaml
/// apiVersion: sonarqube.firestoned.io/v1alpha1
/// kind: SonarQube
/// metadata:
///   name: sonarqube
///   namespace: quality
/// spec:
///   edition: developer
///   storageSize: 20Gi
///   nodeConfig:
///     resources:
///       requests:
///         memory: 4Gi
/// ```
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "sonarqube.firestoned.io",
    version = "v1alpha1",
    kind = "SonarQube",
    namespaced,
    shortname = "sq",
    doc = "SonarQube represents a managed SonarQube server. The controller creates its service account, credential bundle, storage claim, service and deployment, then tracks the running server's lifecycle and available upgrades.",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Edition","type":"string","jsonPath":".spec.edition"}"#,
    printcolumn = r#"{"name":"Observed","type":"string","jsonPath":".status.observedVersion"}"#
)]
#[kube(status = "SonarQubeStatus")]
#[serde(rename_all = "camelCase")]
pub struct SonarQubeSpec {
    /// Scales the server down to zero replicas when true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<bool>,

    /// Pinned server version (`major.minor.patch`).
    ///
    /// Populated by the controller from the running server when unset; never
    /// overwritten by the controller once set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition: Option<Edition>,

    /// Allow automatic minor-version upgrades.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates_minor: Option<bool>,

    /// Allow automatic major-version upgrades.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates_major: Option<bool>,

    /// Name of the credential bundle (Secret) mounted as the server configuration.
    ///
    /// Defaults to `{name}-config`. Several instances may share one bundle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<String>,

    /// Server role: `aio`, `application` or `search`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub server_role: Option<ServerRole>,

    /// Application node hosts of the cluster.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,

    /// Search node hosts of the cluster.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_hosts: Vec<String>,

    /// Service account the server runs as. Defaults to the instance name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_ref: Option<String>,

    /// Base URL used to reach the server API instead of the in-cluster service.
    #[serde(rename = "externalURL", skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// Requested storage size (Kubernetes quantity). Defaults to `1Gi`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_size: Option<String>,

    #[serde(default)]
    pub node_config: NodeConfig,
}

impl SonarQubeSpec {
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.unwrap_or(false)
    }

    #[must_use]
    pub fn role(&self) -> ServerRole {
        self.server_role.unwrap_or_default()
    }

    /// Desired replica count: 0 when shut down, otherwise 1.
    #[must_use]
    pub fn desired_replicas(&self) -> i32 {
        i32::from(!self.is_shutdown())
    }

    #[must_use]
    pub fn edition_or_default(&self) -> Edition {
        self.edition.unwrap_or_default()
    }

    #[must_use]
    pub fn storage_size_or_default(&self) -> &str {
        self.storage_size.as_deref().unwrap_or(DEFAULT_STORAGE_SIZE)
    }
}

/// Names of the workload grouped by rollout state.
///
/// Empty buckets serialize as `[]` so a status merge patch replaces them.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct WorkloadStatus {
    #[serde(rename = "Ready", default)]
    pub ready: Vec<String>,

    #[serde(rename = "Available", default)]
    pub available: Vec<String>,

    #[serde(rename = "Updating", default)]
    pub updating: Vec<String>,

    #[serde(rename = "Unavailable", default)]
    pub unavailable: Vec<String>,
}

/// Upgrade report from the server's update center.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UpgradeReport {
    /// Versions whose installed plugins are all compatible.
    #[serde(default)]
    pub compatible: Vec<String>,

    /// Versions that would leave at least one installed plugin incompatible.
    #[serde(default)]
    pub incompatible: Vec<String>,
}

/// `SonarQube` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SonarQubeStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Name of the network endpoint (Service).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<WorkloadStatus>,

    /// Digest of the spec the child resources were built from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// Version reported by the running server (`major.minor.patch.build`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrades: Option<UpgradeReport>,
}

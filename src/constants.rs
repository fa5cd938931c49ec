// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the SonarQube operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the `SonarQube` CRD
pub const API_GROUP: &str = "sonarqube.firestoned.io";

/// API version for the `SonarQube` CRD
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "sonarqube.firestoned.io/v1alpha1";

/// Kind name for `SonarQube` resource
pub const KIND_SONARQUBE: &str = "SonarQube";

/// Field manager used for every write the controller makes
pub const FIELD_MANAGER: &str = "sonarqube-operator";

// ============================================================================
// SonarQube Ports
// ============================================================================

/// Web server port (UI and HTTP API)
pub const WEB_PORT: i32 = 9000;

/// Embedded search engine port
pub const SEARCH_PORT: i32 = 9001;

/// Application node inter-cluster port
pub const NODE_PORT: i32 = 9003;

/// Compute engine port
pub const CE_PORT: i32 = 9004;

/// Port name for the web port
pub const WEB_PORT_NAME: &str = "web";

/// Port name for the search port
pub const SEARCH_PORT_NAME: &str = "search";

/// Port name for the node port
pub const NODE_PORT_NAME: &str = "node";

/// Port name for the compute engine port
pub const CE_PORT_NAME: &str = "ce";

// ============================================================================
// Container Layout
// ============================================================================

/// Name of the single `SonarQube` container
pub const CONTAINER_NAME: &str = "sonarqube";

/// Default image repository
pub const DEFAULT_IMAGE: &str = "sonarqube";

/// Default edition used when none is pinned
pub const DEFAULT_EDITION: &str = "community";

/// Default size of the persistent storage claim
pub const DEFAULT_STORAGE_SIZE: &str = "1Gi";

/// Suffix appended to the instance name for the default credential bundle
pub const CREDENTIAL_BUNDLE_SUFFIX: &str = "-config";

/// Volume holding data, logs and extensions
pub const STORAGE_VOLUME: &str = "storage";

/// Ephemeral temp volume
pub const TEMP_VOLUME: &str = "temp";

/// Credential bundle volume
pub const CONFIG_VOLUME: &str = "conf";

pub const DATA_PATH: &str = "/opt/sonarqube/data";
pub const LOGS_PATH: &str = "/opt/sonarqube/logs";
pub const EXTENSIONS_PATH: &str = "/opt/sonarqube/extensions";
pub const TEMP_PATH: &str = "/opt/sonarqube/temp";
pub const CONFIG_PATH: &str = "/opt/sonarqube/conf/";

/// Sub-path on the storage volume for data
pub const DATA_SUB_PATH: &str = "data";

/// Sub-path on the storage volume for logs
pub const LOGS_SUB_PATH: &str = "logs";

/// Sub-path on the storage volume for extensions
pub const EXTENSIONS_SUB_PATH: &str = "extensions";

/// Key of the server properties slot in the credential bundle
pub const SERVER_PROPERTIES_KEY: &str = "sonar.properties";

/// Key of the wrapper properties slot in the credential bundle
pub const WRAPPER_PROPERTIES_KEY: &str = "wrapper.conf";

/// Termination grace period (1 hour), enough for the compute engine to drain
pub const TERMINATION_GRACE_PERIOD_SECS: i64 = 3600;

// ============================================================================
// Health Check Constants
// ============================================================================

/// Readiness probe HTTP path
pub const READINESS_PATH: &str = "/api/system/status";

/// Liveness probe initial delay
pub const LIVENESS_INITIAL_DELAY_SECS: i32 = 60;

/// Probe timeout
pub const PROBE_TIMEOUT_SECS: i32 = 1;

/// Probe period
pub const PROBE_PERIOD_SECS: i32 = 10;

/// Probe success threshold
pub const PROBE_SUCCESS_THRESHOLD: i32 = 1;

/// Probe failure threshold
pub const PROBE_FAILURE_THRESHOLD: i32 = 3;

// ============================================================================
// Remote API Constants
// ============================================================================

/// Remote API connect timeout
pub const SERVER_API_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Remote API end-to-end request timeout
pub const SERVER_API_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Ping endpoint path
pub const PING_PATH: &str = "/api/system/ping";

/// Status endpoint path
pub const STATUS_PATH: &str = "/api/system/status";

/// Upgrades endpoint path
pub const UPGRADES_PATH: &str = "/api/system/upgrades";

/// Body the ping endpoint must return
pub const PING_RESPONSE: &str = "pong";

// ============================================================================
// Controller Timing
// ============================================================================

/// Delay before re-checking a waiting workload or server
pub const WAITING_REQUEUE_SECS: u64 = 5;

/// Requeue interval after an unclassified reconcile error
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Number of hex characters kept from the spec digest
pub const REVISION_LENGTH: usize = 16;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default bind address for the metrics and health server
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

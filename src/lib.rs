// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # SonarQube Operator for Kubernetes
//!
//! A Kubernetes operator that runs `SonarQube` servers from a single
//! `SonarQube` custom resource (`sonarqube.firestoned.io/v1alpha1`).
//!
//! ## Overview
//!
//! For every instance the operator converges a fixed set of child resources
//! (credential bundle, service account, Service, storage claim, Deployment),
//! then checks the running server through its system API and locks the
//! reported version into the spec. Progress and failures are surfaced as
//! mutually exclusive status conditions.
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`reconcilers`] - the reconcile chain and status aggregation
//! - [`sonarqube_resources`] - pure builders for child resources
//! - [`server_api`] - client for the server's system API
//! - [`store`] - cluster store abstraction over the Kubernetes API
//! - [`context`] - explicit reconcile context
//!
//! ## Example
//!
//! ```rust,no_run
//! use sonarqube_operator::crd::{ServerRole, SonarQube, SonarQubeSpec};
//!
//! let instance = SonarQube::new(
//!     "sonar",
//!     SonarQubeSpec {
//!         server_role: Some(ServerRole::AllInOne),
//!         storage_size: Some("10Gi".to_string()),
//!         ..Default::default()
//!     },
//! );
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod credential_refs;
pub mod crd;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod server_api;
pub mod sonarqube_resources;
pub mod status_reasons;
pub mod store;
pub mod version;

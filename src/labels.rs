// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and operator-specific labels/annotations
//! to ensure consistency across all resources created by the controller.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component within the architecture; carries the server role
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the current version of the application; carries the spec revision
pub const K8S_VERSION: &str = "app.kubernetes.io/version";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Application name for every managed resource
pub const APP_NAME_SONARQUBE: &str = "sonarqube";

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_SONARQUBE_OPERATOR: &str = "sonarqube-operator";

// ============================================================================
// Operator-Specific Labels
// ============================================================================

/// Component-type label; its value is the owning `SonarQube` instance name
pub const SONARQUBE_INSTANCE_LABEL: &str = "sonarqube.firestoned.io/sonarqube";

// ============================================================================
// Operator-Specific Annotations
// ============================================================================

/// Reverse-reference list on a credential bundle: comma-joined names of every
/// `SonarQube` instance in the namespace that uses it
pub const CREDENTIAL_REFERENCES_ANNOTATION: &str = "sonarqube.firestoned.io/referenced-by";

/// Separator used inside [`CREDENTIAL_REFERENCES_ANNOTATION`]
pub const CREDENTIAL_REFERENCES_SEPARATOR: char = ',';

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition types and reasons for `SonarQube` resources.
//!
//! At most one condition type is `True` at a time. The aggregator sets the
//! type matching the reconcile outcome and flips every other type to `False`.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: Progressing
//!       status: "True"
//!       reason: CreatingResources
//!       message: "ResourceCreate: created Service quality/sonarqube"
//!     - type: Invalid
//!       status: "False"
//!       reason: Reconciled
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// The controller is still converging the instance.
pub const CONDITION_TYPE_PROGRESSING: &str = "Progressing";

/// The spec or a child resource needs user action.
pub const CONDITION_TYPE_INVALID: &str = "Invalid";

/// The instance is shut down.
pub const CONDITION_TYPE_SHUTDOWN: &str = "Shutdown";

/// The server reports itself as down.
pub const CONDITION_TYPE_UNAVAILABLE: &str = "Unavailable";

/// Every condition type the aggregator manages.
pub const CONDITION_TYPES: [&str; 4] = [
    CONDITION_TYPE_PROGRESSING,
    CONDITION_TYPE_INVALID,
    CONDITION_TYPE_SHUTDOWN,
    CONDITION_TYPE_UNAVAILABLE,
];

pub const CONDITION_STATUS_TRUE: &str = "True";
pub const CONDITION_STATUS_FALSE: &str = "False";

// ============================================================================
// Reasons
// ============================================================================

/// The spec was updated by the controller, or the instance was configured for shutdown.
pub const REASON_CONFIGURED: &str = "Configured";

/// A child resource was created.
pub const REASON_CREATING_RESOURCES: &str = "CreatingResources";

/// A child resource was corrected or is rolling out.
pub const REASON_RESOURCES_UPDATING: &str = "ResourcesUpdating";

/// A child resource reports a failure.
pub const REASON_RESOURCES_INVALID: &str = "ResourcesInvalid";

/// The spec cannot be converged.
pub const REASON_SPEC_INVALID: &str = "SpecInvalid";

/// The server is starting, restarting or migrating its database.
pub const REASON_SERVER_WAITING: &str = "ServerWaiting";

/// The server reports status `DOWN`.
pub const REASON_SERVER_DOWN: &str = "ServerDown";

/// Condition cleared after a reconcile that found nothing to do.
pub const REASON_RECONCILED: &str = "Reconciled";

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status conditions and the retry state machine.
//!
//! Reconcile steps never touch the status subresource directly. They record
//! observations (service name, workload buckets, remote version, upgrades) on
//! a [`SonarQubeStatusUpdater`], and the orchestrator hands the first error of
//! the chain to [`aggregate`], the only place that turns an
//! [`ErrorReason`] into conditions and a [`RetryDirective`].
//!
//! | Reason | Condition set | Retry |
//! |---|---|---|
//! | `SpecUpdate`, `ResourceCreate`, `ResourceUpdate` | `Progressing=True` | immediate |
//! | `ResourceWaiting`, `ServerWaiting` | `Progressing=True` | after 5s |
//! | `SpecInvalid`, `ResourceInvalid` | `Invalid=True` | none |
//! | `ResourceShutdown` | `Shutdown=True` | none |
//! | `ServerDown` | `Unavailable=True` | after 5s |
//! | `Unknown` | unchanged | error propagated |
//! | no error | all `False` | none |
//!
//! Setting one condition `True` sets every other condition type `False`, so
//! at most one is active at a time.
//!
//! # Condition Format
//!
//! - `type`: one of `Progressing`, `Invalid`, `Shutdown`, `Unavailable`
//! - `status`: "True" or "False"
//! - `reason`: a programmatic identifier (`CamelCase`)
//! - `message`: the blocking error verbatim
//! - `lastTransitionTime`: RFC3339 timestamp of the last status flip

use crate::constants::WAITING_REQUEUE_SECS;
use crate::crd::{Condition, SonarQube, SonarQubeStatus, UpgradeReport, WorkloadStatus};
use crate::errors::{Error, ErrorReason, StoreError};
use crate::metrics::{forget_instance, record_condition};
use crate::status_reasons::{
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPES, CONDITION_TYPE_INVALID,
    CONDITION_TYPE_PROGRESSING, CONDITION_TYPE_SHUTDOWN, CONDITION_TYPE_UNAVAILABLE,
    REASON_CONFIGURED, REASON_CREATING_RESOURCES, REASON_RECONCILED, REASON_RESOURCES_INVALID,
    REASON_RESOURCES_UPDATING, REASON_SERVER_DOWN, REASON_SERVER_WAITING, REASON_SPEC_INVALID,
};
use crate::store::ClusterStore;
use chrono::Utc;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Create a new condition stamped with the current time.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in place (no API call).
///
/// `lastTransitionTime` is preserved unless the status flips.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        find_condition(current, &new_cond.r#type).is_some_and(|curr_cond| {
            curr_cond.status == new_cond.status
                && curr_cond.reason == new_cond.reason
                && curr_cond.message == new_cond.message
        })
    })
}

/// What the controller runtime should do after a reconcile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDirective {
    /// Run the chain again right away
    Immediate,
    /// Run the chain again after a delay
    After(Duration),
    /// Wait for the next watch event
    Stop,
}

impl RetryDirective {
    #[must_use]
    pub fn into_action(self) -> Action {
        match self {
            Self::Immediate => Action::requeue(Duration::ZERO),
            Self::After(delay) => Action::requeue(delay),
            Self::Stop => Action::await_change(),
        }
    }
}

/// Retry directive for a reason; `None` for `Unknown`, which is left to the error policy.
#[must_use]
pub fn retry_directive(reason: ErrorReason) -> Option<RetryDirective> {
    let waiting = RetryDirective::After(Duration::from_secs(WAITING_REQUEUE_SECS));
    match reason {
        ErrorReason::SpecUpdate | ErrorReason::ResourceCreate | ErrorReason::ResourceUpdate => {
            Some(RetryDirective::Immediate)
        }
        ErrorReason::ResourceWaiting | ErrorReason::ServerWaiting | ErrorReason::ServerDown => {
            Some(waiting)
        }
        ErrorReason::SpecInvalid | ErrorReason::ResourceInvalid | ErrorReason::ResourceShutdown => {
            Some(RetryDirective::Stop)
        }
        ErrorReason::Unknown => None,
    }
}

/// Condition type and reason reported for an error reason.
#[must_use]
pub fn condition_for(reason: ErrorReason) -> Option<(&'static str, &'static str)> {
    match reason {
        ErrorReason::SpecUpdate => Some((CONDITION_TYPE_PROGRESSING, REASON_CONFIGURED)),
        ErrorReason::ResourceCreate => Some((CONDITION_TYPE_PROGRESSING, REASON_CREATING_RESOURCES)),
        ErrorReason::ResourceUpdate | ErrorReason::ResourceWaiting => {
            Some((CONDITION_TYPE_PROGRESSING, REASON_RESOURCES_UPDATING))
        }
        ErrorReason::ServerWaiting => Some((CONDITION_TYPE_PROGRESSING, REASON_SERVER_WAITING)),
        ErrorReason::SpecInvalid => Some((CONDITION_TYPE_INVALID, REASON_SPEC_INVALID)),
        ErrorReason::ResourceInvalid => Some((CONDITION_TYPE_INVALID, REASON_RESOURCES_INVALID)),
        ErrorReason::ResourceShutdown => Some((CONDITION_TYPE_SHUTDOWN, REASON_CONFIGURED)),
        ErrorReason::ServerDown => Some((CONDITION_TYPE_UNAVAILABLE, REASON_SERVER_DOWN)),
        ErrorReason::Unknown => None,
    }
}

/// Collects status changes during one reconcile and writes them in one patch.
///
/// A single write per reconcile keeps the controller from re-triggering itself
/// with a burst of status events.
pub struct SonarQubeStatusUpdater {
    namespace: String,
    name: String,
    current_status: Option<SonarQubeStatus>,
    new_status: SonarQubeStatus,
}

impl SonarQubeStatusUpdater {
    #[must_use]
    pub fn new(instance: &SonarQube) -> Self {
        let current_status = instance.status.clone();
        let new_status = current_status.clone().unwrap_or_default();

        Self {
            namespace: instance.namespace().unwrap_or_default(),
            name: instance.name_any(),
            current_status,
            new_status,
        }
    }

    /// Set one condition `True` and every other condition type `False`.
    pub fn set_active_condition(&mut self, condition_type: &str, reason: &str, message: &str) {
        for other in CONDITION_TYPES {
            if other != condition_type {
                self.set_condition(other, CONDITION_STATUS_FALSE, REASON_RECONCILED, "");
            }
        }
        self.set_condition(condition_type, CONDITION_STATUS_TRUE, reason, message);
    }

    /// Set every condition type `False`.
    pub fn clear_conditions(&mut self) {
        for condition_type in CONDITION_TYPES {
            self.set_condition(condition_type, CONDITION_STATUS_FALSE, REASON_RECONCILED, "");
        }
    }

    pub fn set_condition(
        &mut self,
        condition_type: &str,
        status: &str,
        reason: &str,
        message: &str,
    ) {
        update_condition_in_memory(
            &mut self.new_status.conditions,
            condition_type,
            status,
            reason,
            message,
        );
    }

    pub fn set_service(&mut self, service: &str) {
        self.new_status.service = Some(service.to_string());
    }

    pub fn set_workload_status(&mut self, workload: WorkloadStatus) {
        self.new_status.deployment = Some(workload);
    }

    pub fn set_revision(&mut self, revision: &str) {
        self.new_status.revision = Some(revision.to_string());
    }

    pub fn set_observed_version(&mut self, version: &str) {
        self.new_status.observed_version = Some(version.to_string());
    }

    pub fn set_upgrades(&mut self, upgrades: UpgradeReport) {
        self.new_status.upgrades = Some(upgrades);
    }

    #[must_use]
    pub fn status(&self) -> &SonarQubeStatus {
        &self.new_status
    }

    /// True when the collected status differs from what was read.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.current_status {
            None => true,
            Some(current) => {
                !conditions_equal(&current.conditions, &self.new_status.conditions)
                    || current.service != self.new_status.service
                    || current.deployment != self.new_status.deployment
                    || current.revision != self.new_status.revision
                    || current.observed_version != self.new_status.observed_version
                    || current.upgrades != self.new_status.upgrades
            }
        }
    }

    /// Write the collected status as one merge patch, skipping no-op writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be serialized or the patch fails.
    pub async fn apply<S: ClusterStore>(&self, store: &S) -> Result<(), StoreError> {
        for condition in &self.new_status.conditions {
            record_condition(
                &self.namespace,
                &self.name,
                &condition.r#type,
                condition.status == CONDITION_STATUS_TRUE,
            );
        }

        if !self.has_changes() {
            debug!(
                "SonarQube {}/{} status unchanged, skipping update",
                self.namespace, self.name
            );
            return Ok(());
        }

        let mut patch = serde_json::to_value(&self.new_status)?;
        // Merge patches keep fields that are absent; null removes them.
        if let Value::Object(map) = &mut patch {
            for key in [
                "service",
                "deployment",
                "revision",
                "observedVersion",
                "upgrades",
            ] {
                map.entry(key).or_insert(Value::Null);
            }
        }

        if let Err(e) = store
            .patch_status::<SonarQube>(&self.namespace, &self.name, &patch)
            .await
        {
            if matches!(e, StoreError::NotFound { .. }) {
                forget_instance(&self.namespace, &self.name);
            }
            return Err(e);
        }

        debug!(
            "Updated SonarQube {}/{} status: {} condition(s)",
            self.namespace,
            self.name,
            self.new_status.conditions.len()
        );
        Ok(())
    }
}

/// Translate the chain's outcome into conditions and a retry directive.
///
/// # Errors
///
/// `Unknown` errors are returned unchanged, with conditions left as they were.
pub fn aggregate(
    outcome: Result<(), Error>,
    status: &mut SonarQubeStatusUpdater,
) -> Result<RetryDirective, Error> {
    let error = match outcome {
        Ok(()) => {
            status.clear_conditions();
            return Ok(RetryDirective::Stop);
        }
        Err(error) => error,
    };

    let reason = error.reason();
    let (Some((condition_type, condition_reason)), Some(directive)) =
        (condition_for(reason), retry_directive(reason))
    else {
        warn!(
            "SonarQube {}/{} reconcile failed: {}",
            status.namespace, status.name, error
        );
        return Err(error);
    };

    debug!(
        reason = %reason,
        directive = ?directive,
        "SonarQube {}/{}: {}",
        status.namespace,
        status.name,
        error
    );
    status.set_active_condition(condition_type, condition_reason, &error.to_string());
    Ok(directive)
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;

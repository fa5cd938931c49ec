// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the `SonarQube` operator.
//!
//! Every metric is prefixed `sonarqube_firestoned_io_` and registered in
//! [`METRICS_REGISTRY`], which `/metrics` renders via [`gather_metrics`].
//!
//! | Metric | Labels |
//! |---|---|
//! | `reconciliations_total` | `outcome` |
//! | `reconciliation_duration_seconds` | `outcome` |
//! | `requeues_total` | `reason` |
//! | `errors_total` | `reason` |
//! | `children_created_total` | `kind` |
//! | `drift_corrections_total` | `kind`, `field` |
//! | `instance_condition` | `namespace`, `name`, `condition` |

use crate::errors::ErrorReason;
use crate::status_reasons::CONDITION_TYPES;
use prometheus::core::Collector;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

const METRICS_NAMESPACE: &str = "sonarqube_firestoned_io";

/// Process-wide registry served on `/metrics`.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn registered<C: Collector + Clone + 'static>(collector: C) -> C {
    METRICS_REGISTRY
        .register(Box::new(collector.clone()))
        .unwrap();
    collector
}

fn counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    registered(CounterVec::new(opts, labels).unwrap())
}

/// How a reconcile cycle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Chain completed; nothing left to do until the next change
    Converged,
    /// Chain stopped early and asked to run again
    Requeued,
    /// Unclassified failure handed to the error policy
    Failed,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::Requeued => "requeued",
            Self::Failed => "failed",
        }
    }
}

pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "reconciliations_total",
        "Reconcile cycles by outcome",
        &["outcome"],
    )
});

pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Wall time of one reconcile cycle, status write included",
    )
    .buckets(vec![0.005, 0.025, 0.1, 0.5, 1.0, 5.0, 15.0]);
    registered(HistogramVec::new(opts, &["outcome"]).unwrap())
});

/// Requeues keyed by the reason that stopped the chain (`none` for a clean pass).
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "requeues_total",
        "Requeued reconcile cycles by stopping reason",
        &["reason"],
    )
});

pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "errors_total",
        "Reconcile chain errors by taxonomy reason",
        &["reason"],
    )
});

pub static CHILDREN_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "children_created_total",
        "Child resources created by kind",
        &["kind"],
    )
});

pub static DRIFT_CORRECTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "drift_corrections_total",
        "Child resources rewritten to undo drift, by kind and corrected field",
        &["kind", "field"],
    )
});

/// 1 while the condition is `True` on the instance, 0 otherwise.
pub static INSTANCE_CONDITION: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_instance_condition"),
        "Condition state per instance (1 = True, 0 = False)",
    );
    registered(GaugeVec::new(opts, &["namespace", "name", "condition"]).unwrap())
});

/// Record the end of a reconcile cycle.
///
/// `stopped_by` is the reason that ended the chain early, if any; it is only
/// counted for requeued cycles.
pub fn record_reconcile(
    outcome: ReconcileOutcome,
    stopped_by: Option<ErrorReason>,
    duration: Duration,
) {
    let label = outcome.as_str();
    RECONCILIATION_TOTAL.with_label_values(&[label]).inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[label])
        .observe(duration.as_secs_f64());

    if outcome == ReconcileOutcome::Requeued {
        let reason = stopped_by.map_or("none", ErrorReason::as_str);
        REQUEUE_TOTAL.with_label_values(&[reason]).inc();
    }
}

pub fn record_error(reason: ErrorReason) {
    ERRORS_TOTAL.with_label_values(&[reason.as_str()]).inc();
}

pub fn record_child_created(kind: &str) {
    CHILDREN_CREATED_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_drift_corrected(kind: &str, field: &str) {
    DRIFT_CORRECTIONS_TOTAL
        .with_label_values(&[kind, field])
        .inc();
}

pub fn record_condition(namespace: &str, name: &str, condition: &str, active: bool) {
    INSTANCE_CONDITION
        .with_label_values(&[namespace, name, condition])
        .set(if active { 1.0 } else { 0.0 });
}

/// Drop the condition series of an instance that no longer exists.
pub fn forget_instance(namespace: &str, name: &str) {
    for condition in CONDITION_TYPES {
        // Missing series are fine; the instance may never have been recorded
        let _ = INSTANCE_CONDITION.remove_label_values(&[namespace, name, condition]);
    }
}

/// Render the registry in Prometheus text exposition format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&METRICS_REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converged_cycle_recorded() {
        record_reconcile(ReconcileOutcome::Converged, None, Duration::from_millis(5));

        assert!(RECONCILIATION_TOTAL.with_label_values(&["converged"]).get() > 0.0);
        assert!(
            RECONCILIATION_DURATION_SECONDS
                .with_label_values(&["converged"])
                .get_sample_count()
                > 0
        );
    }

    #[test]
    fn test_requeue_counted_by_reason() {
        record_reconcile(
            ReconcileOutcome::Requeued,
            Some(ErrorReason::ServerWaiting),
            Duration::from_millis(5),
        );
        assert!(REQUEUE_TOTAL.with_label_values(&["ServerWaiting"]).get() > 0.0);
    }

    #[test]
    fn test_drift_counted_by_field() {
        record_drift_corrected("Deployment", "replicas");
        assert!(
            DRIFT_CORRECTIONS_TOTAL
                .with_label_values(&["Deployment", "replicas"])
                .get()
                > 0.0
        );
    }

    #[test]
    fn test_record_condition_toggles() {
        record_condition("metrics-test", "toggle", "Progressing", true);
        let gauge =
            INSTANCE_CONDITION.with_label_values(&["metrics-test", "toggle", "Progressing"]);
        assert!((gauge.get() - 1.0).abs() < f64::EPSILON);

        record_condition("metrics-test", "toggle", "Progressing", false);
        assert!(gauge.get().abs() < f64::EPSILON);
    }

    #[test]
    fn test_forget_instance_drops_series() {
        record_condition("metrics-test", "deleted", "Progressing", true);
        record_condition("metrics-test", "deleted", "Invalid", false);
        assert!(gather_metrics().unwrap().contains("name=\"deleted\""));

        forget_instance("metrics-test", "deleted");
        assert!(!gather_metrics().unwrap().contains("name=\"deleted\""));

        // Forgetting twice is harmless
        forget_instance("metrics-test", "deleted");
    }

    #[test]
    fn test_gather_metrics_uses_prefix() {
        record_error(ErrorReason::SpecInvalid);
        let text = gather_metrics().unwrap();
        assert!(text.contains("sonarqube_firestoned_io_errors_total"));
        assert!(text.contains("reason=\"SpecInvalid\""));
    }
}

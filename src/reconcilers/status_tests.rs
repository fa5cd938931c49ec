// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for status conditions and the retry state machine

#[cfg(test)]
mod tests {
    use crate::crd::{SonarQube, SonarQubeSpec, SonarQubeStatus, WorkloadStatus};
    use crate::errors::{Error, ErrorReason, StoreError};
    use crate::reconcilers::status::{
        aggregate, condition_for, conditions_equal, create_condition, find_condition,
        retry_directive, update_condition_in_memory, RetryDirective, SonarQubeStatusUpdater,
    };
    use crate::status_reasons::{
        CONDITION_TYPES, CONDITION_TYPE_INVALID, CONDITION_TYPE_PROGRESSING,
        CONDITION_TYPE_SHUTDOWN, CONDITION_TYPE_UNAVAILABLE, REASON_CREATING_RESOURCES,
        REASON_RECONCILED, REASON_SERVER_DOWN, REASON_SERVER_WAITING,
    };
    use crate::store::memory::MemoryStore;
    use kube::runtime::controller::Action;
    use std::time::Duration;

    fn instance() -> SonarQube {
        let mut sq = SonarQube::new("sq", SonarQubeSpec::default());
        sq.metadata.namespace = Some("sonar".into());
        sq
    }

    fn active(updater: &SonarQubeStatusUpdater) -> Vec<String> {
        updater
            .status()
            .conditions
            .iter()
            .filter(|c| c.status == "True")
            .map(|c| c.r#type.clone())
            .collect()
    }

    #[test]
    fn test_create_condition() {
        let condition = create_condition("Progressing", "True", "Configured", "working");
        assert_eq!(condition.r#type, "Progressing");
        assert_eq!(condition.status, "True");
        assert_eq!(condition.reason.as_deref(), Some("Configured"));
        assert!(condition.last_transition_time.is_some());
    }

    #[test]
    fn test_update_condition_preserves_transition_time() {
        let mut conditions = vec![create_condition("Invalid", "False", "Reconciled", "")];
        conditions[0].last_transition_time = Some("2025-01-01T00:00:00+00:00".into());

        update_condition_in_memory(&mut conditions, "Invalid", "False", "Reconciled", "again");
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );

        update_condition_in_memory(&mut conditions, "Invalid", "True", "SpecInvalid", "bad");
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
        assert_eq!(conditions.len(), 1);
    }

    #[test]
    fn test_conditions_equal_ignores_timestamps() {
        let a = vec![create_condition("Shutdown", "True", "Configured", "m")];
        let mut b = a.clone();
        b[0].last_transition_time = None;
        assert!(conditions_equal(&a, &b));

        b[0].message = Some("other".into());
        assert!(!conditions_equal(&a, &b));
        assert!(!conditions_equal(&a, &[]));
    }

    #[test]
    fn test_retry_directives() {
        let waiting = Some(RetryDirective::After(Duration::from_secs(5)));
        assert_eq!(
            retry_directive(ErrorReason::SpecUpdate),
            Some(RetryDirective::Immediate)
        );
        assert_eq!(
            retry_directive(ErrorReason::ResourceCreate),
            Some(RetryDirective::Immediate)
        );
        assert_eq!(
            retry_directive(ErrorReason::ResourceUpdate),
            Some(RetryDirective::Immediate)
        );
        assert_eq!(retry_directive(ErrorReason::ResourceWaiting), waiting);
        assert_eq!(retry_directive(ErrorReason::ServerWaiting), waiting);
        assert_eq!(retry_directive(ErrorReason::ServerDown), waiting);
        assert_eq!(
            retry_directive(ErrorReason::SpecInvalid),
            Some(RetryDirective::Stop)
        );
        assert_eq!(
            retry_directive(ErrorReason::ResourceInvalid),
            Some(RetryDirective::Stop)
        );
        assert_eq!(
            retry_directive(ErrorReason::ResourceShutdown),
            Some(RetryDirective::Stop)
        );
        assert_eq!(retry_directive(ErrorReason::Unknown), None);
    }

    #[test]
    fn test_condition_types_per_reason() {
        assert_eq!(
            condition_for(ErrorReason::ResourceCreate),
            Some((CONDITION_TYPE_PROGRESSING, REASON_CREATING_RESOURCES))
        );
        assert_eq!(
            condition_for(ErrorReason::ServerWaiting),
            Some((CONDITION_TYPE_PROGRESSING, REASON_SERVER_WAITING))
        );
        assert_eq!(
            condition_for(ErrorReason::SpecInvalid).map(|c| c.0),
            Some(CONDITION_TYPE_INVALID)
        );
        assert_eq!(
            condition_for(ErrorReason::ResourceShutdown).map(|c| c.0),
            Some(CONDITION_TYPE_SHUTDOWN)
        );
        assert_eq!(
            condition_for(ErrorReason::ServerDown),
            Some((CONDITION_TYPE_UNAVAILABLE, REASON_SERVER_DOWN))
        );
        assert_eq!(condition_for(ErrorReason::Unknown), None);
    }

    #[test]
    fn test_directive_into_action() {
        assert_eq!(
            RetryDirective::Immediate.into_action(),
            Action::requeue(Duration::ZERO)
        );
        assert_eq!(
            RetryDirective::After(Duration::from_secs(5)).into_action(),
            Action::requeue(Duration::from_secs(5))
        );
        assert_eq!(RetryDirective::Stop.into_action(), Action::await_change());
    }

    #[test]
    fn test_aggregate_sets_single_active_condition() {
        let mut updater = SonarQubeStatusUpdater::new(&instance());

        let directive = aggregate(
            Err(Error::new(ErrorReason::SpecInvalid, "bad size")),
            &mut updater,
        )
        .unwrap();
        assert_eq!(directive, RetryDirective::Stop);
        assert_eq!(active(&updater), vec![CONDITION_TYPE_INVALID.to_string()]);
        assert_eq!(updater.status().conditions.len(), CONDITION_TYPES.len());

        let invalid = find_condition(&updater.status().conditions, CONDITION_TYPE_INVALID).unwrap();
        assert_eq!(invalid.message.as_deref(), Some("SpecInvalid: bad size"));

        aggregate(
            Err(Error::new(ErrorReason::ServerWaiting, "starting")),
            &mut updater,
        )
        .unwrap();
        assert_eq!(
            active(&updater),
            vec![CONDITION_TYPE_PROGRESSING.to_string()]
        );
    }

    #[test]
    fn test_aggregate_success_clears_all() {
        let mut updater = SonarQubeStatusUpdater::new(&instance());
        aggregate(
            Err(Error::new(ErrorReason::ResourceShutdown, "shut down")),
            &mut updater,
        )
        .unwrap();

        assert_eq!(aggregate(Ok(()), &mut updater).unwrap(), RetryDirective::Stop);
        assert!(active(&updater).is_empty());
        assert!(updater
            .status()
            .conditions
            .iter()
            .all(|c| c.reason.as_deref() == Some(REASON_RECONCILED)));
    }

    #[test]
    fn test_aggregate_unknown_propagates() {
        let mut updater = SonarQubeStatusUpdater::new(&instance());
        let err = StoreError::NotFound {
            kind: "Secret".into(),
            namespace: "sonar".into(),
            name: "x".into(),
        };

        let result = aggregate(Err(err.into()), &mut updater);
        assert!(matches!(result, Err(Error::Store(_))));
        assert!(updater.status().conditions.is_empty());
    }

    #[test]
    fn test_has_changes() {
        let mut sq = instance();
        sq.status = Some(SonarQubeStatus::default());
        let mut updater = SonarQubeStatusUpdater::new(&sq);
        assert!(!updater.has_changes());

        updater.set_workload_status(WorkloadStatus::default());
        assert!(updater.has_changes());
    }

    #[tokio::test]
    async fn test_apply_patches_status() {
        let store = MemoryStore::new();
        let stored = store.insert(&instance()).unwrap();

        let mut updater = SonarQubeStatusUpdater::new(&stored);
        updater.set_service("sq");
        updater.set_revision("0123456789abcdef");
        aggregate(
            Err(Error::new(ErrorReason::ResourceCreate, "created")),
            &mut updater,
        )
        .unwrap();
        updater.apply(&store).await.unwrap();

        let persisted: SonarQube = store.object("sonar", "sq").unwrap();
        let status = persisted.status.unwrap();
        assert_eq!(status.service.as_deref(), Some("sq"));
        assert_eq!(status.revision.as_deref(), Some("0123456789abcdef"));
        assert_eq!(status.conditions.len(), 4);
        assert!(status.deployment.is_none());
    }

    #[tokio::test]
    async fn test_apply_to_deleted_instance_forgets_metrics() {
        let store = MemoryStore::new();
        let mut sq = instance();
        sq.metadata.name = Some("deleted-sq".into());

        let mut updater = SonarQubeStatusUpdater::new(&sq);
        aggregate(
            Err(Error::new(ErrorReason::ResourceCreate, "created")),
            &mut updater,
        )
        .unwrap();

        let result = updater.apply(&store).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        let text = crate::metrics::gather_metrics().unwrap();
        assert!(!text.contains("name=\"deleted-sq\""));
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `resources.rs`

#[cfg(test)]
mod tests {
    use crate::errors::{Error, ErrorReason};
    use crate::reconcilers::resources::{correct_drift, fetch_or_create, merge_labels};
    use crate::store::memory::MemoryStore;
    use crate::store::ClusterStore;
    use k8s_openapi::api::core::v1::ServiceAccount;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn account(name: &str) -> ServiceAccount {
        ServiceAccount {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("sonar".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_or_create_creates_then_fetches() {
        let store = MemoryStore::new();

        let err = fetch_or_create(&store, &account("sq")).await.unwrap_err();
        assert_eq!(err.reason(), ErrorReason::ResourceCreate);
        assert_eq!(
            err.to_string(),
            "ResourceCreate: created ServiceAccount sonar/sq"
        );

        let existing = fetch_or_create(&store, &account("sq")).await.unwrap();
        assert!(existing.metadata.uid.is_some());
        assert_eq!(store.count::<ServiceAccount>(), 1);
    }

    #[tokio::test]
    async fn test_fetch_or_create_requires_name() {
        let store = MemoryStore::new();
        let mut desired = account("sq");
        desired.metadata.name = None;

        let err = fetch_or_create(&store, &desired).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(err.reason(), ErrorReason::Unknown);
    }

    #[tokio::test]
    async fn test_correct_drift_reports_resource_update() {
        let store = MemoryStore::new();
        let mut existing = store.create(&account("sq")).await.unwrap();
        existing.automount_service_account_token = Some(false);

        let err = correct_drift(&store, &existing, "token mount").await;
        assert_eq!(err.reason(), ErrorReason::ResourceUpdate);
        assert!(err.to_string().contains("token mount"));

        let stored: ServiceAccount = store.object("sonar", "sq").unwrap();
        assert_eq!(stored.automount_service_account_token, Some(false));
    }

    #[tokio::test]
    async fn test_correct_drift_stale_write_is_unknown() {
        let store = MemoryStore::new();
        let created = store.create(&account("sq")).await.unwrap();
        store.replace(&created).await.unwrap();

        let err = correct_drift(&store, &created, "labels").await;
        assert_eq!(err.reason(), ErrorReason::Unknown);
    }

    #[test]
    fn test_merge_labels_keeps_foreign_keys() {
        let mut existing = BTreeMap::from([
            ("team".to_string(), "qa".to_string()),
            ("app".to_string(), "old".to_string()),
        ]);
        let desired = BTreeMap::from([("app".to_string(), "sonarqube".to_string())]);

        assert!(merge_labels(&mut existing, &desired));
        assert_eq!(existing["app"], "sonarqube");
        assert_eq!(existing["team"], "qa");

        assert!(!merge_labels(&mut existing, &desired));
    }
}

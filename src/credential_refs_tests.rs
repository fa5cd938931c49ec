// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `credential_refs.rs`

#[cfg(test)]
mod tests {
    use crate::credential_refs::*;
    use crate::labels::CREDENTIAL_REFERENCES_ANNOTATION;
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn bundle(annotation: Option<&str>) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("shared".into()),
                namespace: Some("quality".into()),
                annotations: annotation.map(|value| {
                    BTreeMap::from([(
                        CREDENTIAL_REFERENCES_ANNOTATION.to_string(),
                        value.to_string(),
                    )])
                }),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_append_to_missing_annotation() {
        assert_eq!(append_reference(None, "sq"), Some("sq".into()));
        assert_eq!(append_reference(Some(""), "sq"), Some("sq".into()));
    }

    #[test]
    fn test_append_keeps_existing_order() {
        assert_eq!(
            append_reference(Some("b,a"), "c"),
            Some("b,a,c".to_string())
        );
    }

    #[test]
    fn test_append_never_duplicates() {
        assert_eq!(append_reference(Some("a,sq"), "sq"), None);
        assert_eq!(append_reference(Some("sq"), "sq"), None);
    }

    #[test]
    fn test_append_matches_exact_names() {
        assert_eq!(append_reference(Some("sq2"), "sq"), Some("sq2,sq".into()));
        assert_eq!(append_reference(Some("sq"), "sq2"), Some("sq,sq2".into()));
    }

    #[test]
    fn test_parse_ignores_blanks() {
        let names = parse_references(" a, ,b,");
        assert_eq!(names.len(), 2);
        assert!(names.contains("a"));
        assert!(names.contains("b"));
    }

    #[test]
    fn test_referencing_instances() {
        let refs = referencing_instances(bundle(Some("alpha,beta")));
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "alpha");
        assert_eq!(refs[0].namespace.as_deref(), Some("quality"));
        assert_eq!(refs[1].name, "beta");
    }

    #[test]
    fn test_unreferenced_bundle_triggers_nothing() {
        assert!(referencing_instances(bundle(None)).is_empty());
        assert!(bundle_references(&bundle(None)).is_empty());
    }
}

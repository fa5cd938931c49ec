// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status_reasons` module

#[cfg(test)]
mod tests {
    use crate::status_reasons::*;
    use std::collections::BTreeSet;

    const ALL_REASONS: [&str; 8] = [
        REASON_CONFIGURED,
        REASON_CREATING_RESOURCES,
        REASON_RESOURCES_UPDATING,
        REASON_RESOURCES_INVALID,
        REASON_SPEC_INVALID,
        REASON_SERVER_WAITING,
        REASON_SERVER_DOWN,
        REASON_RECONCILED,
    ];

    #[test]
    fn test_condition_types_are_distinct() {
        let unique: BTreeSet<_> = CONDITION_TYPES.iter().collect();
        assert_eq!(unique.len(), CONDITION_TYPES.len());
    }

    #[test]
    fn test_reasons_are_camel_case() {
        for reason in ALL_REASONS {
            assert!(
                reason.chars().next().is_some_and(char::is_uppercase),
                "{reason} should start uppercase"
            );
            assert!(
                reason.chars().all(char::is_alphanumeric),
                "{reason} should be CamelCase"
            );
        }
    }

    #[test]
    fn test_reasons_are_distinct() {
        let unique: BTreeSet<_> = ALL_REASONS.iter().collect();
        assert_eq!(unique.len(), ALL_REASONS.len());
    }
}

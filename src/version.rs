// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Version numbers reported by the `SonarQube` server API.
//!
//! The server reports versions as dot-joined strings with two to four numeric
//! components (`"9.9"`, `"10.4.1"`, `"9.9.0.65466"`). [`RemoteVersion`] parses
//! any of these, filling in a missing patch or build with `0`, and always
//! encodes all four components.
//!
//! Ordering follows semantic-version rules over `v{major}.{minor}.{patch}-{build}`:
//! numeric components compare numerically and the build compares as a
//! pre-release identifier.
//!
//! # Example
//!
//! ```rust
//! use sonarqube_operator::version::RemoteVersion;
//!
//! let version: RemoteVersion = "8.3".parse().unwrap();
//! assert_eq!(version.to_string(), "8.3.0.0");
//! assert_eq!(version.major_minor_patch(), "8.3.0");
//! ```

use crate::errors::VersionParseError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A `major.minor.patch.build` version reported by the server.
#[derive(Clone, Debug)]
pub struct RemoteVersion {
    pub major: i64,
    pub minor: i64,
    pub patch: i64,
    pub build: String,
}

impl Default for RemoteVersion {
    fn default() -> Self {
        Self {
            major: 0,
            minor: 0,
            patch: 0,
            build: "0".to_string(),
        }
    }
}

impl RemoteVersion {
    /// `major.minor.patch` form, as pinned into the spec.
    #[must_use]
    pub fn major_minor_patch(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    /// Semantic-version form used for ordering.
    #[must_use]
    pub fn semver(&self) -> String {
        format!("v{}-{}", self.major_minor_patch(), self.build)
    }

    /// True for the all-zero sentinel a server returns before it knows its version.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.patch == 0
    }
}

impl FromStr for RemoteVersion {
    type Err = VersionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().trim_matches('"');
        let parts: Vec<&str> = trimmed.split('.').collect();

        if parts.len() < 2 {
            return Err(VersionParseError::TooFewComponents {
                value: value.to_string(),
            });
        }
        if parts.len() > 4 {
            return Err(VersionParseError::TooManyComponents {
                value: value.to_string(),
            });
        }

        let numeric = |part: &str| {
            part.parse::<i64>()
                .map_err(|_| VersionParseError::InvalidComponent {
                    value: value.to_string(),
                    component: part.to_string(),
                })
        };

        let build = match parts.get(3) {
            Some(build) if !build.is_empty() => (*build).to_string(),
            Some(_) => {
                return Err(VersionParseError::InvalidComponent {
                    value: value.to_string(),
                    component: String::new(),
                })
            }
            None => "0".to_string(),
        };

        Ok(Self {
            major: numeric(parts[0])?,
            minor: numeric(parts[1])?,
            patch: parts.get(2).map_or(Ok(0), |p| numeric(p))?,
            build,
        })
    }
}

impl fmt::Display for RemoteVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

impl Serialize for RemoteVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RemoteVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Compares two pre-release identifiers the way semantic versioning does:
/// numeric identifiers numerically, numeric below alphanumeric, the rest in ASCII order.
fn compare_build(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => l.cmp(r),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

impl Ord for RemoteVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| compare_build(&self.build, &other.build))
    }
}

impl PartialOrd for RemoteVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RemoteVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RemoteVersion {}

#[cfg(test)]
#[path = "version_tests.rs"]
mod version_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the SonarQube operator.
//!
//! This module provides:
//! - [`ErrorReason`]: the closed taxonomy every reconcile step reports through
//! - [`Error`]: the error returned by reconcilers, tagged with one reason
//! - [`StoreError`]: cluster store failures
//! - [`ServerApiError`]: remote `SonarQube` API failures
//! - [`VersionParseError`]: malformed version strings
//!
//! A reconciler never retries on its own. It returns the first blocking condition
//! as an [`Error`], and the status aggregator turns the error's reason into
//! conditions and a retry directive.

use std::fmt;
use thiserror::Error;

/// Why a reconcile step stopped the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorReason {
    /// The controller wrote to the spec; the next cycle sees the new spec.
    SpecUpdate,
    /// The spec cannot be converged until the user edits it.
    SpecInvalid,
    /// A child resource was created.
    ResourceCreate,
    /// A drifted child resource was corrected.
    ResourceUpdate,
    /// A child resource exists but is not ready yet.
    ResourceWaiting,
    /// A child resource reports a failure that needs user action.
    ResourceInvalid,
    /// The instance is shut down and its workload has scaled to zero.
    ResourceShutdown,
    /// The server is reachable but not yet operational.
    ServerWaiting,
    /// The server reports itself as down.
    ServerDown,
    /// Anything the taxonomy does not classify (store or network failures).
    Unknown,
}

impl ErrorReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SpecUpdate => "SpecUpdate",
            Self::SpecInvalid => "SpecInvalid",
            Self::ResourceCreate => "ResourceCreate",
            Self::ResourceUpdate => "ResourceUpdate",
            Self::ResourceWaiting => "ResourceWaiting",
            Self::ResourceInvalid => "ResourceInvalid",
            Self::ResourceShutdown => "ResourceShutdown",
            Self::ServerWaiting => "ServerWaiting",
            Self::ServerDown => "ServerDown",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while reconciling a `SonarQube` instance.
#[derive(Error, Debug)]
pub enum Error {
    /// A classified reconcile outcome.
    #[error("{reason}: {message}")]
    Reconcile {
        /// Taxonomy entry driving conditions and retry
        reason: ErrorReason,
        /// Human-readable detail, surfaced verbatim in the status condition
        message: String,
    },

    #[error("cluster store error: {0}")]
    Store(#[from] StoreError),

    #[error("server API error: {0}")]
    ServerApi(#[from] ServerApiError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a classified reconcile error.
    pub fn new(reason: ErrorReason, message: impl Into<String>) -> Self {
        Self::Reconcile {
            reason,
            message: message.into(),
        }
    }

    /// The taxonomy entry for this error; infrastructure failures are `Unknown`.
    #[must_use]
    pub fn reason(&self) -> ErrorReason {
        match self {
            Self::Reconcile { reason, .. } => *reason,
            Self::Store(_) | Self::ServerApi(_) | Self::Serialization(_) => ErrorReason::Unknown,
        }
    }
}

/// Errors from the cluster store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Optimistic-concurrency check failed (HTTP 409 on update)
    #[error("{kind} {namespace}/{name} was modified concurrently")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: String,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// The object handed to the store has no name or namespace
    #[error("{kind} is missing metadata.{field}")]
    MissingMetadata { kind: String, field: &'static str },

    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the remote `SonarQube` HTTP API.
#[derive(Error, Debug)]
pub enum ServerApiError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid server URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Connection, timeout or decoding failure
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("{url} returned unexpected body '{body}'")]
    UnexpectedBody { url: String, body: String },
}

/// Errors parsing a dot-joined version string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("version '{value}' needs at least major.minor")]
    TooFewComponents { value: String },

    #[error("version '{value}' has more than four components")]
    TooManyComponents { value: String },

    #[error("version '{value}' has invalid component '{component}'")]
    InvalidComponent { value: String, component: String },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;

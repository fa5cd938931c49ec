// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line and environment configuration for the operator binary.
//!
//! Every flag can also be set from the environment, which is how the
//! in-cluster Deployment configures the controller:
//!
//! | Flag             | Environment       | Default        |
//! |------------------|-------------------|----------------|
//! | `--metrics-addr` | `METRICS_ADDR`    | `0.0.0.0:8080` |
//! | `--image`        | `SONARQUBE_IMAGE` | `sonarqube`    |
//! | `--namespace`    | `WATCH_NAMESPACE` | all namespaces |
//! | `--log-format`   | `RUST_LOG_FORMAT` | `text`         |
//!
//! Log levels come from `RUST_LOG` and are handled by `tracing-subscriber`.

use crate::constants::{DEFAULT_IMAGE, DEFAULT_METRICS_ADDR};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;

/// Output format of the tracing subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable lines with ANSI colors
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// SonarQube operator - reconciles `SonarQube` custom resources
#[derive(Parser, Clone, Debug)]
#[command(name = "sonarqube-operator", version, about, long_about = None)]
pub struct OperatorConfig {
    /// Address serving `/metrics` and `/healthz`
    #[arg(long, env = "METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: SocketAddr,

    /// Image repository for server workloads
    #[arg(long, env = "SONARQUBE_IMAGE", default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Restrict the watch to one namespace
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    #[arg(
        long,
        env = "RUST_LOG_FORMAT",
        value_enum,
        ignore_case = true,
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Secret, Service, ServiceAccount};
use k8s_openapi::NamespaceResourceScope;
use kube::{
    runtime::{
        controller::{self, Action},
        watcher::Config,
        Controller,
    },
    Api, Client, Resource, ResourceExt,
};
use sonarqube_operator::{
    config::{LogFormat, OperatorConfig},
    constants::{ERROR_REQUEUE_DURATION_SECS, TOKIO_WORKER_THREADS},
    context::Context,
    credential_refs::referencing_instances,
    crd::SonarQube,
    errors::Error,
    metrics::{forget_instance, gather_metrics},
    reconcilers::reconcile_sonarqube,
    server_api::HttpServerApiProvider,
    store::KubeStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let config = OperatorConfig::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("sonarqube-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

fn init_tracing(format: LogFormat) {
    // Format: timestamp file:line LEVEL message
    // Respects RUST_LOG if set, otherwise defaults to INFO level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    init_tracing(config.log_format);

    info!("Starting SonarQube Controller");
    debug!(?config, "Configuration loaded");

    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let server_api = Arc::new(HttpServerApiProvider::new()?);
    let ctx = Arc::new(Context::new(
        KubeStore::new(client.clone()),
        server_api,
        config.image.clone(),
    ));

    tokio::select! {
        result = run_sonarqube_controller(client, ctx, config.namespace.clone()) => {
            error!("CRITICAL: SonarQube controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("SonarQube controller exited unexpectedly without error")
        }
        result = run_metrics_server(config.metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = shutdown_signal() => {
            result?;
            info!("Graceful shutdown completed successfully");
            Ok(())
        }
    }
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received SIGINT, initiating graceful shutdown...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received SIGINT, initiating graceful shutdown...");
    }
    Ok(())
}

/// Namespaced API when a watch namespace is configured, cluster-wide otherwise.
fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the `SonarQube` controller
async fn run_sonarqube_controller(
    client: Client,
    ctx: Arc<Context>,
    namespace: Option<String>,
) -> Result<()> {
    info!(namespace = ?namespace, "Starting SonarQube controller");

    let ns = namespace.as_deref();
    let secrets: Api<Secret> = scoped_api(&client, ns);

    Controller::new(scoped_api::<SonarQube>(&client, ns), Config::default())
        .owns(scoped_api::<Deployment>(&client, ns), Config::default())
        .owns(scoped_api::<Service>(&client, ns), Config::default())
        .owns(scoped_api::<PersistentVolumeClaim>(&client, ns), Config::default())
        .owns(scoped_api::<ServiceAccount>(&client, ns), Config::default())
        .owns(secrets.clone(), Config::default())
        // Shared bundles are not owned by every instance that mounts them
        .watches(secrets, Config::default(), referencing_instances)
        .run(reconcile_sonarqube_wrapper, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, action)) => debug!(instance = %object.name, ?action, "Reconciled"),
                // Deleted instances surface here once their queued reconcile fires
                Err(controller::Error::ObjectNotFound(object)) => {
                    debug!(instance = %object.name, "SonarQube gone, dropping its metrics");
                    let namespace = object.namespace.as_deref().unwrap_or_default();
                    forget_instance(namespace, &object.name);
                }
                Err(e) => warn!(error = %e, "SonarQube reconciliation failed"),
            }
        })
        .await;

    Ok(())
}

/// Reconcile wrapper for `SonarQube`
async fn reconcile_sonarqube_wrapper(
    instance: Arc<SonarQube>,
    ctx: Arc<Context>,
) -> Result<Action, Error> {
    debug!(
        name = %instance.name_any(),
        namespace = ?instance.namespace(),
        "Reconcile wrapper called for SonarQube"
    );

    match reconcile_sonarqube(ctx.as_ref(), instance.as_ref()).await {
        Ok(directive) => Ok(directive.into_action()),
        Err(e) => {
            error!(
                "Failed to reconcile SonarQube {}/{}: {}",
                instance.namespace().unwrap_or_default(),
                instance.name_any(),
                e
            );
            Err(e)
        }
    }
}

/// Error policy for controller
fn error_policy(_resource: Arc<SonarQube>, _err: &Error, _ctx: Arc<Context>) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Routes served on the metrics address.
fn metrics_routes() -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }))
}

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Serving /metrics and /healthz");
    axum::serve(listener, metrics_routes()).await?;
    Ok(())
}

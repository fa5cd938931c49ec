// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes resource builders for `SonarQube` instances.
//!
//! Every function here is pure: it computes the desired form of a child
//! resource from a [`SonarQube`] and nothing else. The reconcilers fetch or
//! create these objects and compare the fields they own against them.
//!
//! | Builder | Child resource |
//! |---|---|
//! | [`build_service_account`] | `ServiceAccount` |
//! | [`build_credential_bundle`] | `Secret` (credential bundle) |
//! | [`build_storage_claim`] | `PersistentVolumeClaim` |
//! | [`build_service`] | `Service` (network endpoint) |
//! | [`build_deployment`] | `Deployment` (workload) |

use crate::constants::{
    API_GROUP_VERSION, CE_PORT, CE_PORT_NAME, CONFIG_PATH, CONFIG_VOLUME, CONTAINER_NAME,
    CREDENTIAL_BUNDLE_SUFFIX, DATA_PATH, DATA_SUB_PATH, EXTENSIONS_PATH, EXTENSIONS_SUB_PATH,
    KIND_SONARQUBE, LIVENESS_INITIAL_DELAY_SECS, LOGS_PATH, LOGS_SUB_PATH, NODE_PORT,
    NODE_PORT_NAME, PROBE_FAILURE_THRESHOLD, PROBE_PERIOD_SECS, PROBE_SUCCESS_THRESHOLD,
    PROBE_TIMEOUT_SECS, READINESS_PATH, REVISION_LENGTH, SEARCH_PORT, SEARCH_PORT_NAME,
    SERVER_PROPERTIES_KEY, STORAGE_VOLUME, TEMP_PATH, TEMP_VOLUME, TERMINATION_GRACE_PERIOD_SECS,
    WEB_PORT, WEB_PORT_NAME, WRAPPER_PROPERTIES_KEY,
};
use crate::crd::{ServerRole, SonarQube, SonarQubeSpec};
use crate::labels::{
    APP_NAME_SONARQUBE, CREDENTIAL_REFERENCES_ANNOTATION, K8S_COMPONENT, K8S_INSTANCE,
    K8S_MANAGED_BY, K8S_NAME, K8S_VERSION, MANAGED_BY_SONARQUBE_OPERATOR, SONARQUBE_INSTANCE_LABEL,
};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy};
use k8s_openapi::api::core::v1::{
    Affinity, Container, ContainerPort, EmptyDirVolumeSource, EnvVar, EnvVarSource,
    HTTPGetAction, ObjectFieldSelector, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, Probe, Secret,
    SecretVolumeSource, Service, ServiceAccount, ServicePort, ServiceSpec, TCPSocketAction,
    Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Child resources the workload is wired to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkloadDependencies {
    /// Service account the pod runs as
    pub service_account: String,
    /// Credential bundle mounted as configuration
    pub credential_bundle: String,
    /// Storage claim holding data, logs and extensions
    pub storage_claim: String,
    /// Cluster address of the network endpoint, if assigned
    pub cluster_ip: Option<String>,
}

// ============================================================================
// Identity and labels
// ============================================================================

/// Computes the revision digest of a spec: the leading hex characters of its SHA-256.
///
/// # Errors
///
/// Returns an error if the spec cannot be serialized.
pub fn revision_hash(spec: &SonarQubeSpec) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(spec)?;
    let digest = format!("{:x}", Sha256::digest(&bytes));
    Ok(digest[..REVISION_LENGTH].to_string())
}

/// Builds the full label set for every child resource of an instance.
///
/// User labels on the instance are copied first; controller-owned keys win on
/// collision. The revision label is present once the orchestrator has stamped
/// `status.revision`.
#[must_use]
pub fn build_labels(instance: &SonarQube) -> BTreeMap<String, String> {
    let name = instance.name_any();
    let mut labels = instance.labels().clone();

    labels.insert(SONARQUBE_INSTANCE_LABEL.into(), name.clone());
    labels.insert(K8S_NAME.into(), APP_NAME_SONARQUBE.into());
    labels.insert(K8S_INSTANCE.into(), name);
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_SONARQUBE_OPERATOR.into());
    labels.insert(K8S_COMPONENT.into(), instance.spec.role().as_str().into());

    if let Some(revision) = instance
        .status
        .as_ref()
        .and_then(|status| status.revision.as_ref())
    {
        labels.insert(K8S_VERSION.into(), revision.clone());
    }

    labels
}

/// Builds the pod-selector labels: instance name plus role.
///
/// These never change for the life of an instance, so they are safe as an
/// immutable `Deployment` selector.
#[must_use]
pub fn build_selector_labels(instance: &SonarQube) -> BTreeMap<String, String> {
    BTreeMap::from([
        (K8S_INSTANCE.to_string(), instance.name_any()),
        (
            K8S_COMPONENT.to_string(),
            instance.spec.role().as_str().to_string(),
        ),
    ])
}

/// Builds owner references pointing at the instance, marking it as controller.
#[must_use]
pub fn build_owner_references(instance: &SonarQube) -> Vec<OwnerReference> {
    vec![OwnerReference {
        api_version: API_GROUP_VERSION.to_string(),
        kind: KIND_SONARQUBE.to_string(),
        name: instance.name_any(),
        uid: instance.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }]
}

/// Returns true when `metadata` lists the instance (by uid) as an owner.
#[must_use]
pub fn is_owned_by(metadata: &ObjectMeta, instance: &SonarQube) -> bool {
    let Some(uid) = instance.metadata.uid.as_deref() else {
        return false;
    };
    metadata
        .owner_references
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|owner| owner.uid == uid))
}

fn child_metadata(instance: &SonarQube, name: String) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: instance.namespace(),
        labels: Some(build_labels(instance)),
        owner_references: Some(build_owner_references(instance)),
        ..Default::default()
    }
}

// ============================================================================
// Ports
// ============================================================================

/// Named ports exposed by each role, in exposure order.
#[must_use]
pub fn role_ports(role: ServerRole) -> Vec<(&'static str, i32)> {
    match role {
        ServerRole::AllInOne => vec![(WEB_PORT_NAME, WEB_PORT)],
        ServerRole::ApplicationNode => vec![
            (WEB_PORT_NAME, WEB_PORT),
            (NODE_PORT_NAME, NODE_PORT),
            (CE_PORT_NAME, CE_PORT),
        ],
        ServerRole::SearchNode => vec![(SEARCH_PORT_NAME, SEARCH_PORT)],
    }
}

// ============================================================================
// Identity, credential bundle, storage
// ============================================================================

/// Name of the service account an instance runs as.
#[must_use]
pub fn service_account_name(instance: &SonarQube) -> String {
    instance
        .spec
        .service_account_ref
        .clone()
        .unwrap_or_else(|| instance.name_any())
}

/// Default credential bundle name for an instance: `{name}-config`.
#[must_use]
pub fn default_credential_bundle_name(instance: &SonarQube) -> String {
    format!("{}{CREDENTIAL_BUNDLE_SUFFIX}", instance.name_any())
}

#[must_use]
pub fn build_service_account(instance: &SonarQube) -> ServiceAccount {
    ServiceAccount {
        metadata: child_metadata(instance, service_account_name(instance)),
        ..Default::default()
    }
}

/// Builds the credential bundle with empty server and wrapper property slots.
///
/// The creating instance is recorded as controller owner and as the first
/// entry of the reverse-reference annotation.
#[must_use]
pub fn build_credential_bundle(instance: &SonarQube, name: &str) -> Secret {
    let mut metadata = child_metadata(instance, name.to_string());
    metadata.annotations = Some(BTreeMap::from([(
        CREDENTIAL_REFERENCES_ANNOTATION.to_string(),
        instance.name_any(),
    )]));

    Secret {
        metadata,
        type_: Some("Opaque".into()),
        string_data: Some(BTreeMap::from([
            (SERVER_PROPERTIES_KEY.to_string(), String::new()),
            (WRAPPER_PROPERTIES_KEY.to_string(), String::new()),
        ])),
        ..Default::default()
    }
}

/// Builds the read-write-once storage claim, named after the instance.
#[must_use]
pub fn build_storage_claim(instance: &SonarQube) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: child_metadata(instance, instance.name_any()),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".into()]),
            volume_mode: Some("Filesystem".into()),
            storage_class_name: instance.spec.storage_class.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(instance.spec.storage_size_or_default().to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Checks that `value` is a Kubernetes resource quantity such as `10Gi`, `500M` or `1.5e3`.
#[must_use]
pub fn is_valid_quantity(value: &str) -> bool {
    const SUFFIXES: [&str; 13] = [
        "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "m", "k", "M", "G", "T", "P", "E",
    ];

    let unsigned = value.strip_prefix(['+', '-']).unwrap_or(value);
    let number_end = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_end);

    let digits = number.replace('.', "");
    if digits.is_empty() || number.matches('.').count() > 1 {
        return false;
    }

    if suffix.is_empty() || SUFFIXES.contains(&suffix) {
        return true;
    }

    // Decimal exponent form: e.g. 1e3, 2E-2
    suffix
        .strip_prefix(['e', 'E'])
        .map(|exp| exp.strip_prefix(['+', '-']).unwrap_or(exp))
        .is_some_and(|exp| !exp.is_empty() && exp.chars().all(|c| c.is_ascii_digit()))
}

// ============================================================================
// Network endpoint
// ============================================================================

/// Builds the cluster-internal service exposing the role's ports.
#[must_use]
pub fn build_service(instance: &SonarQube) -> Service {
    let ports = role_ports(instance.spec.role())
        .into_iter()
        .map(|(name, port)| ServicePort {
            name: Some(name.into()),
            port,
            target_port: Some(IntOrString::Int(port)),
            protocol: Some("TCP".into()),
            ..Default::default()
        })
        .collect();

    Service {
        metadata: child_metadata(instance, instance.name_any()),
        spec: Some(ServiceSpec {
            selector: Some(build_selector_labels(instance)),
            ports: Some(ports),
            type_: Some("ClusterIP".into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

// ============================================================================
// Workload
// ============================================================================

/// Container image for an instance: `{repo}:{version}-{edition}`, or
/// `{repo}:{edition}` until a version is pinned.
#[must_use]
pub fn build_image(spec: &SonarQubeSpec, repository: &str) -> String {
    let edition = spec.edition_or_default();
    match spec.version.as_deref() {
        Some(version) => format!("{repository}:{version}-{edition}"),
        None => format!("{repository}:{edition}"),
    }
}

fn env_value(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.into(),
        value: Some(value.into()),
        value_from: None,
    }
}

fn env_pod_ip(name: &str) -> EnvVar {
    EnvVar {
        name: name.into(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                api_version: Some("v1".into()),
                field_path: "status.podIP".into(),
            }),
            ..Default::default()
        }),
    }
}

/// Joins a host list, appending the endpoint's cluster address if it is not listed yet.
#[must_use]
pub fn join_hosts(hosts: &[String], cluster_ip: Option<&str>) -> String {
    let mut joined: Vec<&str> = hosts.iter().map(String::as_str).collect();
    if let Some(ip) = cluster_ip.filter(|ip| !ip.is_empty() && *ip != "None") {
        if !joined.contains(&ip) {
            joined.push(ip);
        }
    }
    joined.join(",")
}

/// Builds the container environment for an instance.
///
/// All roles get the storage layout. Application and search nodes also get
/// the Data Center clustering settings.
#[must_use]
pub fn build_env(instance: &SonarQube, cluster_ip: Option<&str>) -> Vec<EnvVar> {
    let mut env = vec![
        env_value("SONAR_WEB_PORT", WEB_PORT.to_string()),
        env_value("SONAR_PATH_DATA", DATA_PATH),
        env_value("SONAR_PATH_LOGS", LOGS_PATH),
        env_value("SONAR_PATH_TEMP", TEMP_PATH),
        env_value("SONAR_PATH_EXTENSIONS", EXTENSIONS_PATH),
    ];

    let role = instance.spec.role();
    if !role.is_clustered() {
        return env;
    }

    env.push(env_value("SONAR_CLUSTER_ENABLED", "true"));
    env.push(env_value("SONAR_CLUSTER_NODE_TYPE", role.as_str()));
    env.push(env_pod_ip("SONAR_CLUSTER_NODE_HOST"));
    env.push(env_value("SONAR_CLUSTER_NODE_NAME", instance.name_any()));
    env.push(env_value(
        "SONAR_CLUSTER_SEARCH_HOSTS",
        join_hosts(&instance.spec.search_hosts, cluster_ip),
    ));

    match role {
        ServerRole::ApplicationNode => env.push(env_value(
            "SONAR_CLUSTER_HOSTS",
            join_hosts(&instance.spec.hosts, cluster_ip),
        )),
        ServerRole::SearchNode => env.push(env_pod_ip("SONAR_SEARCH_HOST")),
        ServerRole::AllInOne => {}
    }

    env
}

fn probe_timings(probe: Probe) -> Probe {
    Probe {
        timeout_seconds: Some(PROBE_TIMEOUT_SECS),
        period_seconds: Some(PROBE_PERIOD_SECS),
        success_threshold: Some(PROBE_SUCCESS_THRESHOLD),
        failure_threshold: Some(PROBE_FAILURE_THRESHOLD),
        ..probe
    }
}

fn tcp_probe(port: i32) -> Probe {
    Probe {
        tcp_socket: Some(TCPSocketAction {
            port: IntOrString::Int(port),
            host: None,
        }),
        ..Default::default()
    }
}

/// TCP liveness probe on the role's primary port.
#[must_use]
pub fn build_liveness_probe(role: ServerRole) -> Probe {
    let port = if role == ServerRole::SearchNode {
        SEARCH_PORT
    } else {
        WEB_PORT
    };
    probe_timings(Probe {
        initial_delay_seconds: Some(LIVENESS_INITIAL_DELAY_SECS),
        ..tcp_probe(port)
    })
}

/// HTTP readiness probe on the status path, or TCP on the search port for search nodes.
#[must_use]
pub fn build_readiness_probe(role: ServerRole) -> Probe {
    if role == ServerRole::SearchNode {
        return probe_timings(tcp_probe(SEARCH_PORT));
    }
    probe_timings(Probe {
        http_get: Some(HTTPGetAction {
            path: Some(READINESS_PATH.into()),
            port: IntOrString::Int(WEB_PORT),
            scheme: Some("HTTP".into()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn build_volumes(deps: &WorkloadDependencies) -> Vec<Volume> {
    vec![
        Volume {
            name: TEMP_VOLUME.into(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        },
        Volume {
            name: CONFIG_VOLUME.into(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(deps.credential_bundle.clone()),
                optional: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: STORAGE_VOLUME.into(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: deps.storage_claim.clone(),
                read_only: None,
            }),
            ..Default::default()
        },
    ]
}

fn mount(volume: &str, path: &str, sub_path: Option<&str>, read_only: bool) -> VolumeMount {
    VolumeMount {
        name: volume.into(),
        mount_path: path.into(),
        sub_path: sub_path.map(Into::into),
        read_only: read_only.then_some(true),
        ..Default::default()
    }
}

fn build_volume_mounts() -> Vec<VolumeMount> {
    vec![
        mount(STORAGE_VOLUME, DATA_PATH, Some(DATA_SUB_PATH), false),
        mount(STORAGE_VOLUME, LOGS_PATH, Some(LOGS_SUB_PATH), false),
        mount(STORAGE_VOLUME, EXTENSIONS_PATH, Some(EXTENSIONS_SUB_PATH), false),
        mount(TEMP_VOLUME, TEMP_PATH, None, false),
        mount(CONFIG_VOLUME, CONFIG_PATH, None, true),
    ]
}

fn build_affinity(instance: &SonarQube) -> Option<Affinity> {
    let node_config = &instance.spec.node_config;
    if node_config.node_affinity.is_none()
        && node_config.pod_affinity.is_none()
        && node_config.pod_anti_affinity.is_none()
    {
        return None;
    }
    Some(Affinity {
        node_affinity: node_config.node_affinity.clone(),
        pod_affinity: node_config.pod_affinity.clone(),
        pod_anti_affinity: node_config.pod_anti_affinity.clone(),
    })
}

/// Builds the single-replica (zero when shut down) `Deployment` for an instance.
///
/// # Arguments
///
/// * `instance` - The `SonarQube` being reconciled
/// * `deps` - Names of the already reconciled child resources
/// * `image_repository` - Image repository, tagged per [`build_image`]
#[must_use]
pub fn build_deployment(
    instance: &SonarQube,
    deps: &WorkloadDependencies,
    image_repository: &str,
) -> Deployment {
    let role = instance.spec.role();
    let selector_labels = build_selector_labels(instance);
    let node_config = &instance.spec.node_config;

    let ports = role_ports(role)
        .into_iter()
        .map(|(name, port)| ContainerPort {
            name: Some(name.into()),
            container_port: port,
            protocol: Some("TCP".into()),
            ..Default::default()
        })
        .collect();

    let container = Container {
        name: CONTAINER_NAME.into(),
        image: Some(build_image(&instance.spec, image_repository)),
        image_pull_policy: Some("Always".into()),
        ports: Some(ports),
        env: Some(build_env(instance, deps.cluster_ip.as_deref())),
        volume_mounts: Some(build_volume_mounts()),
        liveness_probe: Some(build_liveness_probe(role)),
        readiness_probe: Some(build_readiness_probe(role)),
        resources: node_config.resources.clone(),
        ..Default::default()
    };

    Deployment {
        metadata: child_metadata(instance, instance.name_any()),
        spec: Some(DeploymentSpec {
            replicas: Some(instance.spec.desired_replicas()),
            selector: LabelSelector {
                match_labels: Some(selector_labels.clone()),
                ..Default::default()
            },
            strategy: Some(DeploymentStrategy {
                type_: Some("Recreate".into()),
                rolling_update: None,
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector_labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(deps.service_account.clone()),
                    containers: vec![container],
                    volumes: Some(build_volumes(deps)),
                    restart_policy: Some("Always".into()),
                    dns_policy: Some("ClusterFirst".into()),
                    termination_grace_period_seconds: Some(TERMINATION_GRACE_PERIOD_SECS),
                    affinity: build_affinity(instance),
                    node_selector: (!node_config.node_selector.is_empty())
                        .then(|| node_config.node_selector.clone()),
                    priority_class_name: node_config.priority_class.clone(),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "sonarqube_resources_tests.rs"]
mod sonarqube_resources_tests;

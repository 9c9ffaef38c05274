//! Shared types for the RavenDBCluster specification and status.
//!
//! These types are used across the CRD definition, the resource builders,
//! the health evaluator and the admission webhooks.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, PersistentVolumeClaimVolumeSource, SecretVolumeSource,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Certificate provisioning mode for the cluster. Immutable after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ClusterMode {
    /// User-supplied cluster certificate (self-signed or corporate CA).
    None,
    /// Per-node certificates issued through Let's Encrypt.
    LetsEncrypt,
}

impl std::fmt::Display for ClusterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterMode::None => write!(f, "None"),
            ClusterMode::LetsEncrypt => write!(f, "LetsEncrypt"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ImagePullPolicy {
    Always,
    IfNotPresent,
}

impl std::fmt::Display for ImagePullPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImagePullPolicy::Always => write!(f, "Always"),
            ImagePullPolicy::IfNotPresent => write!(f, "IfNotPresent"),
        }
    }
}

/// A single RavenDB node. Node 0 in the spec list is the cluster leader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RavenDBNode {
    /// Cluster node tag, 1-4 characters, unique within the cluster.
    /// Immutable after creation.
    #[schemars(length(min = 1, max = 4))]
    pub tag: String,

    /// Public https URL of the node, `https://<tag>.<domain>:<port>`.
    /// Immutable after creation.
    #[schemars(length(min = 1))]
    pub public_server_url: String,

    /// Public tcp URL of the node, `tcp://<tag>-tcp.<domain>:<port>`.
    /// Immutable after creation.
    #[schemars(length(min = 1))]
    pub public_server_url_tcp: String,

    /// Per-node server certificate secret; required iff mode is LetsEncrypt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_secret_ref: Option<String>,
}

// ---------------------------------------------------------------------------
// external access
// ---------------------------------------------------------------------------

/// Tagged external-access configuration, one of `ingress-controller`,
/// `aws-nlb` or `azure-lb`. Exactly the context matching `type` must be set;
/// the admission webhook rejects everything else. `type` is kept as a raw
/// string on the wire so the webhook can report unknown values instead of
/// failing deserialization.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAccessConfiguration {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_controller_external_access: Option<IngressControllerContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_external_access: Option<AwsExternalAccessContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_external_access: Option<AzureExternalAccessContext>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressControllerContext {
    /// Ingress class to use (nginx, haproxy, traefik).
    pub ingress_class_name: String,

    /// Extra annotations merged onto the generated ingress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_annotations: Option<BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsExternalAccessContext {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_mappings: Vec<AwsNodeMapping>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsNodeMapping {
    pub tag: String,
    pub eip_allocation_id: String,
    pub subnet_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AzureExternalAccessContext {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_mappings: Vec<AzureNodeMapping>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AzureNodeMapping {
    pub tag: String,
    pub ip: String,
}

// ---------------------------------------------------------------------------
// storage
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageSpec {
    /// Data volume claimed per node through the statefulset volume-claim
    /// template.
    pub data: VolumeSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<LogsSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_volumes: Option<Vec<AdditionalVolume>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    /// Requested capacity, e.g. `5Gi`.
    #[schemars(regex(pattern = r"^\d+(Ei|Pi|Ti|Gi|Mi|Ki)$"))]
    pub size: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_modes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_attributes_class_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogsSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ravendb: Option<LogSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit: Option<LogSettings>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogSettings {
    #[serde(flatten)]
    pub volume: VolumeSpec,

    /// Absolute mount path inside the server container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalVolume {
    /// Volume name, unique across all additional volumes.
    pub name: String,

    /// Absolute mount path inside the server container.
    pub mount_path: String,

    /// File name inside the source to mount; no path separators allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,

    /// Exactly one of configMap, secret, persistentVolumeClaim.
    pub volume_source: AdditionalVolumeSource,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalVolumeSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapVolumeSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretVolumeSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<PersistentVolumeClaimVolumeSource>,
}

impl AdditionalVolumeSource {
    /// The set variants, in declaration order, as field names.
    pub fn set_kinds(&self) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        if self.config_map.is_some() {
            kinds.push("configMap");
        }
        if self.secret.is_some() {
            kinds.push("secret");
        }
        if self.persistent_volume_claim.is_some() {
            kinds.push("persistentVolumeClaim");
        }
        kinds
    }
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ClusterPhase {
    #[default]
    Deploying,
    Running,
    Error,
}

impl std::fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterPhase::Deploying => write!(f, "Deploying"),
            ClusterPhase::Running => write!(f, "Running"),
            ClusterPhase::Error => write!(f, "Error"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionStatus::True => write!(f, "True"),
            ConditionStatus::False => write!(f, "False"),
            ConditionStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ClusterConditionType {
    CertificatesReady,
    LicensesValid,
    StorageReady,
    NodesHealthy,
    ExternalAccessReady,
    BootstrapCompleted,
    Progressing,
    Degraded,
    Ready,
}

impl std::fmt::Display for ClusterConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClusterConditionType::CertificatesReady => "CertificatesReady",
            ClusterConditionType::LicensesValid => "LicensesValid",
            ClusterConditionType::StorageReady => "StorageReady",
            ClusterConditionType::NodesHealthy => "NodesHealthy",
            ClusterConditionType::ExternalAccessReady => "ExternalAccessReady",
            ClusterConditionType::BootstrapCompleted => "BootstrapCompleted",
            ClusterConditionType::Progressing => "Progressing",
            ClusterConditionType::Degraded => "Degraded",
            ClusterConditionType::Ready => "Ready",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ClusterConditionReason {
    Completed,
    WaitingForPods,
    PodsNotReady,
    StatefulSetUpdating,
    IngressPendingAddress,
    LoadBalancerPending,
    CertSecretMissing,
    LicenseSecretMissing,
    BootstrapJobRunning,
    BootstrapFailed,
    PVCNotBound,
}

impl std::fmt::Display for ClusterConditionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClusterConditionReason::Completed => "Completed",
            ClusterConditionReason::WaitingForPods => "WaitingForPods",
            ClusterConditionReason::PodsNotReady => "PodsNotReady",
            ClusterConditionReason::StatefulSetUpdating => "StatefulSetUpdating",
            ClusterConditionReason::IngressPendingAddress => "IngressPendingAddress",
            ClusterConditionReason::LoadBalancerPending => "LoadBalancerPending",
            ClusterConditionReason::CertSecretMissing => "CertSecretMissing",
            ClusterConditionReason::LicenseSecretMissing => "LicenseSecretMissing",
            ClusterConditionReason::BootstrapJobRunning => "BootstrapJobRunning",
            ClusterConditionReason::BootstrapFailed => "BootstrapFailed",
            ClusterConditionReason::PVCNotBound => "PVCNotBound",
        };
        write!(f, "{s}")
    }
}

/// One aspect of cluster health. `reason` is a string on the wire: the
/// evaluator stores [`ClusterConditionReason`] values, while the Ready rollup
/// stores the *type name* of the first unsatisfied condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    #[serde(rename = "type")]
    pub type_: ClusterConditionType,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    pub last_transition_time: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum NodeStatusPhase {
    Created,
    Failed,
}

/// Per-node rolling-upgrade record kept in the cluster status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RavenDBNodeStatus {
    pub tag: String,
    pub status: NodeStatusPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempted_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_time: Option<String>,
}

impl RavenDBNodeStatus {
    pub fn created(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            status: NodeStatusPhase::Created,
            last_attempted_image: None,
            last_error: None,
            last_attempt_time: None,
        }
    }
}

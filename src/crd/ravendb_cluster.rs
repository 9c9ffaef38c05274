//! RavenDBCluster Custom Resource Definition
//!
//! The RavenDBCluster CRD declares the desired topology of a managed RavenDB
//! cluster: the pinned server image, certificate mode, per-node public URLs,
//! storage layout and optional external access. The operator drives the live
//! cluster toward this description and reports progress through the status
//! subresource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::{
    ClusterCondition, ClusterMode, ClusterPhase, ExternalAccessConfiguration, ImagePullPolicy,
    RavenDBNode, RavenDBNodeStatus, StorageSpec,
};

#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "ravendb.ravendb.io",
    version = "v1",
    kind = "RavenDBCluster",
    namespaced,
    status = "RavenDBClusterStatus",
    derive = "PartialEq",
    shortname = "rdb",
    printcolumn = r#"{"name":"Mode","type":"string","jsonPath":".spec.mode"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RavenDBClusterSpec {
    /// Pinned server image, e.g. `ravendb/ravendb:7.1.3-ubuntu.22.04-x64`.
    #[schemars(length(min = 1))]
    pub image: String,

    pub image_pull_policy: ImagePullPolicy,

    pub mode: ClusterMode,

    /// Required iff mode is LetsEncrypt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(pattern = r"^[^@\s]+@[^@\s]+\.[^@\s]+$"))]
    pub email: Option<String>,

    /// Secret holding exactly one `.json` license file.
    #[schemars(length(min = 1))]
    pub license_secret_ref: String,

    /// Cluster-wide server certificate secret (one `.pfx` key); required iff
    /// mode is None.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_cert_secret_ref: Option<String>,

    /// Client identity used by the operator for HTTPS probes
    /// (keys `client.pfx` + optional `password`).
    #[schemars(length(min = 1))]
    pub client_cert_secret_ref: String,

    /// CA bundle secret (key `ca.crt`); consulted when mode is None.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert_secret_ref: Option<String>,

    /// Base FQDN all node URLs live under. Immutable after creation.
    #[schemars(length(min = 1))]
    pub domain: String,

    /// Ordered node list; node 0 is the leader.
    pub nodes: Vec<RavenDBNode>,

    /// Additional environment variables for the server containers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_access_configuration: Option<ExternalAccessConfiguration>,

    #[serde(rename = "storage")]
    pub storage_spec: StorageSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RavenDBClusterStatus {
    /// Last spec generation the operator fully processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default)]
    pub phase: ClusterPhase,

    /// Summary of the most significant unsatisfied condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ClusterCondition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<RavenDBNodeStatus>,
}

/// Accessor layer over the optional spec fields. Callers never poke at the
/// raw `Option`s; these keep the null handling in one place.
impl RavenDBCluster {
    pub fn image(&self) -> &str {
        &self.spec.image
    }

    pub fn mode(&self) -> ClusterMode {
        self.spec.mode
    }

    pub fn email(&self) -> &str {
        self.spec.email.as_deref().unwrap_or("")
    }

    pub fn domain(&self) -> &str {
        &self.spec.domain
    }

    pub fn license_secret_ref(&self) -> &str {
        &self.spec.license_secret_ref
    }

    pub fn cluster_cert_secret_ref(&self) -> &str {
        self.spec.cluster_cert_secret_ref.as_deref().unwrap_or("")
    }

    pub fn client_cert_secret_ref(&self) -> &str {
        &self.spec.client_cert_secret_ref
    }

    pub fn ca_cert_secret_ref(&self) -> &str {
        self.spec.ca_cert_secret_ref.as_deref().unwrap_or("")
    }

    pub fn env(&self) -> BTreeMap<String, String> {
        self.spec.env.clone().unwrap_or_default()
    }

    pub fn node_tags(&self) -> Vec<String> {
        self.spec.nodes.iter().map(|n| n.tag.clone()).collect()
    }

    pub fn node_public_urls(&self) -> Vec<String> {
        self.spec
            .nodes
            .iter()
            .map(|n| n.public_server_url.clone())
            .collect()
    }

    pub fn node_tcp_urls(&self) -> Vec<String> {
        self.spec
            .nodes
            .iter()
            .map(|n| n.public_server_url_tcp.clone())
            .collect()
    }

    /// Leader is node 0 by convention.
    pub fn leader_url(&self) -> &str {
        self.spec
            .nodes
            .first()
            .map(|n| n.public_server_url.as_str())
            .unwrap_or("")
    }

    pub fn is_external_access_set(&self) -> bool {
        self.spec.external_access_configuration.is_some()
    }

    pub fn external_access_type(&self) -> &str {
        self.spec
            .external_access_configuration
            .as_ref()
            .map(|ea| ea.type_.as_str())
            .unwrap_or("")
    }

    pub fn is_ingress_context_set(&self) -> bool {
        self.spec
            .external_access_configuration
            .as_ref()
            .is_some_and(|ea| ea.ingress_controller_external_access.is_some())
    }

    pub fn is_aws_context_set(&self) -> bool {
        self.spec
            .external_access_configuration
            .as_ref()
            .is_some_and(|ea| ea.aws_external_access.is_some())
    }

    pub fn is_azure_context_set(&self) -> bool {
        self.spec
            .external_access_configuration
            .as_ref()
            .is_some_and(|ea| ea.azure_external_access.is_some())
    }

    pub fn ingress_class_name(&self) -> &str {
        self.spec
            .external_access_configuration
            .as_ref()
            .and_then(|ea| ea.ingress_controller_external_access.as_ref())
            .map(|ic| ic.ingress_class_name.as_str())
            .unwrap_or("")
    }

    pub fn ingress_annotations(&self) -> BTreeMap<String, String> {
        self.spec
            .external_access_configuration
            .as_ref()
            .and_then(|ea| ea.ingress_controller_external_access.as_ref())
            .and_then(|ic| ic.additional_annotations.clone())
            .unwrap_or_default()
    }

    /// Server certificate secret used by the bootstrap job: the cluster-wide
    /// secret when mode is None, the leader's per-node secret otherwise.
    pub fn server_cert_secret_name(&self) -> &str {
        match self.spec.mode {
            ClusterMode::LetsEncrypt => self
                .spec
                .nodes
                .first()
                .and_then(|n| n.cert_secret_ref.as_deref())
                .unwrap_or(""),
            ClusterMode::None => self.cluster_cert_secret_ref(),
        }
    }
}

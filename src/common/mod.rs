//! Names, labels, annotations and mount paths shared across the operator.

pub mod env;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

use crate::crd::RavenDBCluster;

// paths
pub const CERT_PATH: &str = "/ravendb/certs/server.pfx";
pub const LICENSE_PATH: &str = "/ravendb/license/license.json";
pub const DATA_MOUNT_PATH: &str = "/var/lib/ravendb/data";
pub const CERT_MOUNT_PATH: &str = "/ravendb/certs";
pub const CLIENT_CERT_MOUNT_PATH: &str = "/ravendb/client-certs";
pub const CA_CERT_MOUNT_PATH: &str = "/ravendb/ca";
pub const LICENSE_MOUNT_PATH: &str = "/ravendb/license";
pub const LOGS_MOUNT_PATH: &str = "/var/log/ravendb/logs";
pub const AUDIT_MOUNT_PATH: &str = "/var/log/ravendb/audit";
pub const UPDATE_CERT_SCRIPT_PATH: &str = "/ravendb/scripts/update-cert.sh";
pub const GET_CERT_SCRIPT_PATH: &str = "/ravendb/scripts/get-server-cert.sh";
pub const INIT_CLUSTER_SCRIPT_PATH: &str = "/ravendb/scripts/init-cluster.sh";
pub const CHECK_NODES_SCRIPT_PATH: &str = "/ravendb/scripts/check-nodes-discoverability.sh";

// identifiers
pub const APP: &str = "ravendb";
pub const MANAGER: &str = "ravendb-operator";
pub const PREFIX: &str = "ravendb-";
pub const HTTPS_PORT_NAME: &str = "https";
pub const TCP_PORT_NAME: &str = "tcp";
pub const CERT_VOLUME_NAME: &str = "ravendb-cert";
pub const CLIENT_CERT_VOLUME_NAME: &str = "ravendb-client-cert";
pub const CA_CERT_VOLUME_NAME: &str = "ravendb-ca-cert";
pub const LICENSE_VOLUME_NAME: &str = "ravendb-license";
pub const DATA_VOLUME_NAME: &str = "ravendb-data";
pub const LOGS_VOLUME_NAME: &str = "ravendb-logs";
pub const AUDIT_VOLUME_NAME: &str = "ravendb-audit";
pub const CERT_HOOK_VOLUME_NAME: &str = "ravendb-cert-hook";
pub const BOOTSTRAP_HOOK_VOLUME_NAME: &str = "ravendb-bootstrap-hook";
pub const NODE_SERVICE_ACCOUNT: &str = "ravendb-node";
pub const BOOTSTRAPPER_JOB: &str = "ravendb-bootstrapper";
pub const BOOTSTRAP_HOOK_CONFIGMAP: &str = "ravendb-bootstrap-hook";
pub const CERT_HOOK_CONFIGMAP: &str = "ravendb-cert-hook";

// configmap keys
pub const INIT_CLUSTER_HOOK_KEY: &str = "init-cluster.sh";
pub const CHECK_NODES_HOOK_KEY: &str = "check-nodes-discoverability.sh";
pub const UPDATE_CERT_HOOK_KEY: &str = "update-cert.sh";
pub const GET_CERT_HOOK_KEY: &str = "get-server-cert.sh";

// labels
pub const LABEL_APP_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_NODE_TAG: &str = "nodeTag";

// annotations
pub const INGRESS_SSL_PASSTHROUGH_ANNOTATION: &str = "ingress.kubernetes.io/ssl-passthrough";
pub const NGINX_SSL_PASSTHROUGH_ANNOTATION: &str = "nginx.ingress.kubernetes.io/ssl-passthrough";
pub const HAPROXY_SSL_PASSTHROUGH_ANNOTATION: &str = "haproxy.org/ssl-passthrough";

// intra-operator upgrade signalling
pub const UPGRADE_IMAGE_ANNOTATION: &str = "ravendb.ravendb.io/upgrade-image";
pub const UPGRADE_PRE_WAIT_ANNOTATION: &str = "ravendb.ravendb.io/upgrade-pre-wait";
pub const UPGRADE_POST_WAIT_ANNOTATION: &str = "ravendb.ravendb.io/upgrade-post-wait";
pub const UPGRADE_PING_INTERVAL_ANNOTATION: &str = "ravendb.ravendb.io/upgrade-ping-interval";
pub const UPGRADE_DB_INTERVAL_ANNOTATION: &str = "ravendb.ravendb.io/upgrade-db-interval";

// internal ports and URLs
pub const INTERNAL_HTTPS_PORT: i32 = 443;
pub const INTERNAL_TCP_PORT: i32 = 38888;
pub const INTERNAL_HTTPS_URL: &str = "https://0.0.0.0:443";
pub const INTERNAL_TCP_URL: &str = "tcp://0.0.0.0:38888";

// other
pub const NUM_OF_REPLICAS: i32 = 1;
pub const CONFIGMAP_EXEC_MODE: i32 = 0o755;
pub const CERT_EXEC_TIMEOUT: &str = "60";
pub const CLUSTER_FQDN_SUFFIX: &str = ".ravendb.svc.cluster.local";
pub const PROTOCOL_TCP: &str = "tcp://";

/// Per-node object name, `ravendb-<lowercased tag>`.
pub fn statefulset_name(tag: &str) -> String {
    format!("{PREFIX}{}", tag.to_lowercase())
}

pub fn cluster_labels(cluster: &RavenDBCluster) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(LABEL_APP_NAME.to_string(), APP.to_string());
    labels.insert(LABEL_MANAGED_BY.to_string(), MANAGER.to_string());
    labels.insert(LABEL_INSTANCE.to_string(), cluster.name_any());
    labels
}

pub fn node_labels(cluster: &RavenDBCluster, tag: &str) -> BTreeMap<String, String> {
    let mut labels = cluster_labels(cluster);
    labels.insert(LABEL_NODE_TAG.to_string(), tag.to_string());
    labels
}

/// Controller owner reference so children are garbage-collected with the CR.
pub fn owner_reference(cluster: &RavenDBCluster) -> OwnerReference {
    OwnerReference {
        api_version: RavenDBCluster::api_version(&()).to_string(),
        kind: RavenDBCluster::kind(&()).to_string(),
        name: cluster.name_any(),
        uid: cluster.uid().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

//! Cluster fixtures shared by the unit tests.

use kube::core::ObjectMeta;
use std::collections::BTreeMap;

use super::ravendb_cluster::{RavenDBCluster, RavenDBClusterSpec};
use super::types::{
    ClusterMode, ImagePullPolicy, RavenDBNode, StorageSpec, VolumeSpec,
};

fn meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some("ravendb".to_string()),
        uid: Some(format!("uid-{name}")),
        generation: Some(1),
        ..Default::default()
    }
}

fn storage() -> StorageSpec {
    StorageSpec {
        data: VolumeSpec {
            size: "5Gi".to_string(),
            ..Default::default()
        },
        logs: None,
        additional_volumes: None,
    }
}

/// Single-node cluster in mode None with a user-supplied cluster cert.
pub fn base_cluster(name: &str) -> RavenDBCluster {
    RavenDBCluster {
        metadata: meta(name),
        spec: RavenDBClusterSpec {
            image: "ravendb/ravendb:7.1.3-ubuntu.22.04-x64".to_string(),
            image_pull_policy: ImagePullPolicy::IfNotPresent,
            mode: ClusterMode::None,
            email: None,
            license_secret_ref: "license".to_string(),
            cluster_cert_secret_ref: Some("cert".to_string()),
            client_cert_secret_ref: "client-cert".to_string(),
            ca_cert_secret_ref: Some("ca".to_string()),
            domain: "example.com".to_string(),
            nodes: vec![RavenDBNode {
                tag: "A".to_string(),
                public_server_url: "https://a.example.com:443".to_string(),
                public_server_url_tcp: "tcp://a-tcp.example.com:443".to_string(),
                cert_secret_ref: None,
            }],
            env: None,
            external_access_configuration: None,
            storage_spec: storage(),
        },
        status: None,
    }
}

/// Three-node LetsEncrypt cluster with per-node certificates.
pub fn base_cluster_lets_encrypt(name: &str) -> RavenDBCluster {
    let node = |tag: &str, cert: &str| RavenDBNode {
        tag: tag.to_string(),
        public_server_url: format!("https://{}.example.com:443", tag.to_lowercase()),
        public_server_url_tcp: format!("tcp://{}-tcp.example.com:443", tag.to_lowercase()),
        cert_secret_ref: Some(cert.to_string()),
    };

    RavenDBCluster {
        metadata: meta(name),
        spec: RavenDBClusterSpec {
            image: "ravendb/ravendb:6.2.9-ubuntu.22.04-x64".to_string(),
            image_pull_policy: ImagePullPolicy::Always,
            mode: ClusterMode::LetsEncrypt,
            email: Some("me@example.com".to_string()),
            license_secret_ref: "license".to_string(),
            cluster_cert_secret_ref: None,
            client_cert_secret_ref: "client-cert".to_string(),
            ca_cert_secret_ref: None,
            domain: "example.com".to_string(),
            nodes: vec![
                node("A", "cert-a"),
                node("B", "cert-b"),
                node("C", "cert-c"),
            ],
            env: None,
            external_access_configuration: None,
            storage_spec: storage(),
        },
        status: None,
    }
}

/// Env map helper for fixtures that need extra RAVEN_ variables.
pub fn env_of(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

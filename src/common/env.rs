//! Environment variable sets injected into the server and bootstrap
//! containers. The `RAVEN_*` names are the server's own configuration keys.

use k8s_openapi::api::core::v1::EnvVar;

use crate::common;
use crate::crd::{ClusterMode, RavenDBCluster, RavenDBNode};

fn env(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        value_from: None,
    }
}

pub fn build_common_env_vars(cluster: &RavenDBCluster, node: &RavenDBNode) -> Vec<EnvVar> {
    // in-cluster tcp endpoint of this node, used by peers behind the ingress
    let node_tcp_endpoint = format!(
        "{}{}{}:{}",
        common::PROTOCOL_TCP,
        common::statefulset_name(&node.tag),
        common::CLUSTER_FQDN_SUFFIX,
        common::INTERNAL_TCP_PORT
    );

    vec![
        env("RAVEN_Setup_Mode", cluster.mode().to_string()),
        env("RAVEN_License_Path", common::LICENSE_PATH),
        env("RAVEN_License_Eula_Accepted", "true"),
        env("RAVEN_PublicServerUrl", &node.public_server_url),
        env("RAVEN_PublicTcpUrl", &node.public_server_url_tcp),
        env("RAVEN_ServerUrl", common::INTERNAL_HTTPS_URL),
        env("RAVEN_ServerUrl_Tcp", common::INTERNAL_TCP_URL),
        env("RAVEN_PublicServerUrl_Tcp_Cluster", node_tcp_endpoint),
        env("NODE_TAG", &node.tag),
    ]
}

pub fn build_secure_env_vars(cluster: &RavenDBCluster) -> Vec<EnvVar> {
    let mut vars = vec![
        env(
            "RAVEN_Security_Certificate_Load_Exec",
            common::GET_CERT_SCRIPT_PATH,
        ),
        env(
            "RAVEN_Security_Certificate_Change_Exec",
            common::UPDATE_CERT_SCRIPT_PATH,
        ),
        env(
            "RAVEN_Security_Certificate_Exec_TimeoutInSec",
            common::CERT_EXEC_TIMEOUT,
        ),
    ];

    if cluster.mode() == ClusterMode::LetsEncrypt {
        vars.push(env(
            "RAVEN_Security_Certificate_LetsEncrypt_Email",
            cluster.email(),
        ));
    }

    vars
}

pub fn build_additional_env_vars(cluster: &RavenDBCluster) -> Vec<EnvVar> {
    cluster
        .env()
        .iter()
        .map(|(k, v)| env(k, v.clone()))
        .collect()
}

/// Inputs the bootstrap job needs to join the nodes into one logical cluster.
pub fn build_bootstrapper_env_vars(cluster: &RavenDBCluster) -> Vec<EnvVar> {
    let leader_url = cluster.leader_url().to_string();

    let mut member_urls = Vec::new();
    let mut tcp_hosts = Vec::new();
    for (i, node) in cluster.spec.nodes.iter().enumerate() {
        if let Some(host) = node.public_server_url_tcp.strip_prefix(common::PROTOCOL_TCP) {
            tcp_hosts.push(host.to_string());
        }
        if i > 0 {
            member_urls.push(node.public_server_url.clone());
        }
    }

    let all_urls = cluster.node_public_urls();
    let all_tags = cluster.node_tags();

    vec![
        env("LEADER_URL", leader_url),
        env("MEMBER_URLS", member_urls.join(" ")),
        env("URLS", all_urls.join(" ")),
        env("TAGS", all_tags.join(" ")),
        env("TCP_HOSTS", tcp_hosts.join(" ")),
    ]
}

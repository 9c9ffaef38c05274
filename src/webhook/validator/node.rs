//! Node topology checks: unique tags and URLs, port consistency, URL
//! grammar and per-node certificate secrets.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::crd::{ClusterMode, RavenDBCluster};

use super::{cluster_namespace, ClusterValidator, SecretSource};

pub struct NodeValidator {
    secrets: Arc<dyn SecretSource>,
}

impl NodeValidator {
    pub fn new(secrets: Arc<dyn SecretSource>) -> Self {
        Self { secrets }
    }
}

#[async_trait]
impl ClusterValidator for NodeValidator {
    fn name(&self) -> &'static str {
        "node-validator"
    }

    async fn validate_create(&self, cluster: &RavenDBCluster) -> Vec<String> {
        let namespace = cluster_namespace(cluster);
        let tags = cluster.node_tags();
        let public_urls = cluster.node_public_urls();
        let tcp_urls = cluster.node_tcp_urls();

        let mut errors = Vec::new();
        errors.extend(validate_nodes_not_empty(&tags));
        errors.extend(validate_unique_tags(&tags));
        errors.extend(validate_unique_urls(&public_urls, &tcp_urls));
        errors.extend(validate_ports_consistency(
            &public_urls,
            &tcp_urls,
            cluster.external_access_type(),
        ));

        for node in &cluster.spec.nodes {
            errors.extend(validate_node_url(
                &node.tag,
                &node.public_server_url,
                cluster.domain(),
                "https",
                "publicServerUrl",
                &format!("{}.", node.tag.to_lowercase()),
            ));
            errors.extend(validate_node_url(
                &node.tag,
                &node.public_server_url_tcp,
                cluster.domain(),
                "tcp",
                "publicServerUrlTcp",
                &format!("{}-tcp.", node.tag.to_lowercase()),
            ));
            errors.extend(
                validate_node_cert_secret(
                    self.secrets.as_ref(),
                    &namespace,
                    cluster.mode(),
                    &node.tag,
                    node.cert_secret_ref.as_deref().unwrap_or(""),
                )
                .await,
            );
        }

        errors
    }
}

pub fn validate_nodes_not_empty(tags: &[String]) -> Vec<String> {
    if tags.is_empty() {
        vec!["spec.nodes must contain at least one node".to_string()]
    } else {
        Vec::new()
    }
}

pub fn validate_unique_tags(tags: &[String]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashMap::new();

    for tag in tags {
        if seen.insert(tag.clone(), ()).is_some() {
            errors.push(format!("spec.nodes: duplicate tag '{tag}'"));
        }
    }

    errors
}

/// URLs must be unique across both URL fields of every node.
pub fn validate_unique_urls(public_urls: &[String], tcp_urls: &[String]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen: HashMap<&str, String> = HashMap::new();

    for (i, url) in public_urls.iter().enumerate() {
        let label = format!("spec.nodes[{i}].publicServerUrl");
        match seen.get(url.as_str()) {
            Some(first) => errors.push(format!("{label} duplicates URL already used in {first}")),
            None => {
                seen.insert(url, label);
            }
        }
    }

    for (i, url) in tcp_urls.iter().enumerate() {
        let label = format!("spec.nodes[{i}].publicServerUrlTcp");
        match seen.get(url.as_str()) {
            Some(first) => errors.push(format!("{label} duplicates URL already used in {first}")),
            None => {
                seen.insert(url, label);
            }
        }
    }

    errors
}

/// Every node's https and tcp port must match; behind an ingress controller
/// all nodes additionally share one port.
pub fn validate_ports_consistency(
    public_urls: &[String],
    tcp_urls: &[String],
    external_access_type: &str,
) -> Vec<String> {
    let mut expected_port = String::new();

    for (i, (public, tcp)) in public_urls.iter().zip(tcp_urls).enumerate() {
        let public_port = extract_port(public);
        let tcp_port = extract_port(tcp);

        if public_port != tcp_port {
            return vec![
                "spec.nodes: publicServerUrl and publicServerUrlTcp ports must match".to_string(),
            ];
        }

        if external_access_type != "ingress-controller" {
            continue;
        }

        if i == 0 {
            expected_port = public_port;
        } else if public_port != expected_port {
            return vec!["spec.nodes: ports must be consistent across all nodes".to_string()];
        }
    }

    Vec::new()
}

pub fn validate_node_url(
    tag: &str,
    raw_url: &str,
    domain: &str,
    expected_scheme: &str,
    field: &str,
    expected_host_prefix: &str,
) -> Vec<String> {
    let label = format!("spec.nodes[{tag}].{field}");
    let mut errors = Vec::new();

    let Ok(url) = Url::parse(raw_url) else {
        return vec![format!("{label}: invalid URL format")];
    };

    if url.scheme() != expected_scheme {
        errors.push(format!("{label}: scheme must be '{expected_scheme}'"));
    }

    let host = url.host_str().unwrap_or("");
    if !host.starts_with(expected_host_prefix) {
        errors.push(format!(
            "{label}: hostname must start with '{expected_host_prefix}'"
        ));
    }
    if !host.ends_with(domain) {
        errors.push(format!("{label}: hostname must be subdomain of '{domain}'"));
    }

    if extract_port(raw_url).is_empty() {
        errors.push(format!("{label}: must include a port"));
    }

    let path = url.path();
    if !path.is_empty() && path != "/" {
        errors.push(format!("{label}: must not contain path"));
    }
    if url.query().is_some() {
        errors.push(format!("{label}: must not contain query"));
    }
    if url.fragment().is_some() {
        errors.push(format!("{label}: must not contain fragment"));
    }

    errors
}

pub async fn validate_node_cert_secret(
    secrets: &dyn SecretSource,
    namespace: &str,
    mode: ClusterMode,
    tag: &str,
    secret_name: &str,
) -> Vec<String> {
    let label = format!("spec.nodes[tag={tag}].certSecretRef");
    let mut errors = Vec::new();

    if mode == ClusterMode::LetsEncrypt && secret_name.is_empty() {
        errors.push(format!("{label} is required when mode is LetsEncrypt"));
    }
    if mode == ClusterMode::None && !secret_name.is_empty() {
        errors.push(format!("{label} must not be set when mode is None"));
    }

    if secret_name.is_empty() {
        return errors;
    }

    let keys = match secrets.secret_keys(namespace, secret_name).await {
        Err(e) => {
            errors.push(format!("{label}: failed to read secret '{secret_name}': {e}"));
            return errors;
        }
        Ok(None) => {
            errors.push(format!("{label}: secret '{secret_name}' not found"));
            return errors;
        }
        Ok(Some(keys)) => keys,
    };

    if keys.len() != 1 {
        errors.push(format!("{label}: must contain exactly one .pfx file"));
        return errors;
    }

    if !keys[0].ends_with(".pfx") {
        errors.push(format!("{label}: file '{}' must end with .pfx", keys[0]));
    }

    errors
}

/// Port portion of the URL authority as written; empty when absent. A plain
/// `Url::port()` would hide default ports, and an explicit `:443` must still
/// count as "includes a port".
fn extract_port(raw_url: &str) -> String {
    let Some(rest) = raw_url.split_once("://").map(|(_, rest)| rest) else {
        return String::new();
    };
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("");
    match authority.rsplit_once(':') {
        Some((_, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            port.to_string()
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::MapSecretSource;
    use super::*;
    use crate::crd::test_fixtures::{base_cluster, base_cluster_lets_encrypt};

    #[test]
    fn empty_node_list_is_rejected() {
        let errors = validate_nodes_not_empty(&[]);
        assert!(errors[0].contains("spec.nodes must contain at least one node"));
        assert!(validate_nodes_not_empty(&["A".to_string()]).is_empty());
    }

    #[test]
    fn duplicate_tags_are_rejected() {
        let errors = validate_unique_tags(&["A".to_string(), "A".to_string()]);
        assert!(errors[0].contains("spec.nodes: duplicate tag 'A'"));
        assert!(validate_unique_tags(&["A".to_string(), "B".to_string()]).is_empty());
    }

    #[test]
    fn duplicate_urls_are_rejected_across_both_fields() {
        let public = vec![
            "https://a.example.com:443".to_string(),
            "https://a.example.com:443".to_string(),
        ];
        let tcp = vec![
            "tcp://a-tcp.example.com:443".to_string(),
            "tcp://b-tcp.example.com:443".to_string(),
        ];
        let errors = validate_unique_urls(&public, &tcp);
        assert!(errors[0].contains(
            "spec.nodes[1].publicServerUrl duplicates URL already used in spec.nodes[0].publicServerUrl"
        ));

        let public = vec![
            "https://a.example.com:443".to_string(),
            "https://b.example.com:443".to_string(),
        ];
        let tcp = vec![
            "tcp://a-tcp.example.com:443".to_string(),
            "https://a.example.com:443".to_string(),
        ];
        let errors = validate_unique_urls(&public, &tcp);
        assert!(errors[0].contains(
            "spec.nodes[1].publicServerUrlTcp duplicates URL already used in spec.nodes[0].publicServerUrl"
        ));
    }

    #[test]
    fn per_node_port_mismatch_is_rejected() {
        let errors = validate_ports_consistency(
            &["https://a.example.com:443".to_string()],
            &["tcp://a-tcp.example.com:38888".to_string()],
            "ingress-controller",
        );
        assert!(errors[0].contains("publicServerUrl and publicServerUrlTcp ports must match"));
    }

    #[test]
    fn cross_node_port_consistency_only_behind_ingress() {
        let public = vec![
            "https://a.example.com:443".to_string(),
            "https://b.example.com:1234".to_string(),
        ];
        let tcp = vec![
            "tcp://a-tcp.example.com:443".to_string(),
            "tcp://b-tcp.example.com:1234".to_string(),
        ];

        let errors = validate_ports_consistency(&public, &tcp, "ingress-controller");
        assert!(errors[0].contains("ports must be consistent across all nodes"));

        assert!(validate_ports_consistency(&public, &tcp, "aws-nlb").is_empty());
    }

    #[test]
    fn node_url_grammar() {
        let ok = validate_node_url(
            "A",
            "https://a.example.com:443",
            "example.com",
            "https",
            "publicServerUrl",
            "a.",
        );
        assert!(ok.is_empty(), "{ok:?}");

        let scheme = validate_node_url(
            "A",
            "http://a.example.com:443",
            "example.com",
            "https",
            "publicServerUrl",
            "a.",
        );
        assert!(scheme[0].contains("scheme must be 'https'"));

        let prefix = validate_node_url(
            "A",
            "https://wrong.example.com:443",
            "example.com",
            "https",
            "publicServerUrl",
            "a.",
        );
        assert!(prefix[0].contains("hostname must start with 'a.'"));

        let subdomain = validate_node_url(
            "A",
            "https://a.other.com:443",
            "example.com",
            "https",
            "publicServerUrl",
            "a.",
        );
        assert!(subdomain[0].contains("hostname must be subdomain of 'example.com'"));

        let port = validate_node_url(
            "A",
            "https://a.example.com",
            "example.com",
            "https",
            "publicServerUrl",
            "a.",
        );
        assert!(port[0].contains("must include a port"));

        let path = validate_node_url(
            "A",
            "https://a.example.com:443/path",
            "example.com",
            "https",
            "publicServerUrl",
            "a.",
        );
        assert!(path[0].contains("must not contain path"));

        let query = validate_node_url(
            "A",
            "https://a.example.com:443?q=x",
            "example.com",
            "https",
            "publicServerUrl",
            "a.",
        );
        assert!(query[0].contains("must not contain query"));

        let fragment = validate_node_url(
            "A",
            "https://a.example.com:443#frag",
            "example.com",
            "https",
            "publicServerUrl",
            "a.",
        );
        assert!(fragment[0].contains("must not contain fragment"));
    }

    #[tokio::test]
    async fn node_cert_secret_is_mode_dependent() {
        let secrets = MapSecretSource::new()
            .with_secret("ravendb", "valid-cert", &["node.pfx"])
            .with_secret("ravendb", "non-pfx-cert", &["cert.pem"])
            .with_secret("ravendb", "multi-key-cert", &["one.pfx", "two.pfx"]);

        let required =
            validate_node_cert_secret(&secrets, "ravendb", ClusterMode::LetsEncrypt, "A", "").await;
        assert!(required[0].contains("is required when mode is LetsEncrypt"));

        let rejected =
            validate_node_cert_secret(&secrets, "ravendb", ClusterMode::None, "A", "valid-cert")
                .await;
        assert!(rejected[0].contains("must not be set when mode is None"));

        let missing = validate_node_cert_secret(
            &secrets,
            "ravendb",
            ClusterMode::LetsEncrypt,
            "A",
            "non-existent",
        )
        .await;
        assert!(missing[0].contains("secret 'non-existent' not found"));

        let non_pfx = validate_node_cert_secret(
            &secrets,
            "ravendb",
            ClusterMode::LetsEncrypt,
            "A",
            "non-pfx-cert",
        )
        .await;
        assert!(non_pfx[0].contains("file 'cert.pem' must end with .pfx"));

        let multi = validate_node_cert_secret(
            &secrets,
            "ravendb",
            ClusterMode::LetsEncrypt,
            "A",
            "multi-key-cert",
        )
        .await;
        assert!(multi[0].contains("must contain exactly one .pfx file"));

        let ok = validate_node_cert_secret(
            &secrets,
            "ravendb",
            ClusterMode::LetsEncrypt,
            "A",
            "valid-cert",
        )
        .await;
        assert!(ok.is_empty());
    }

    #[tokio::test]
    async fn whole_validator_accepts_the_base_fixtures() {
        let secrets = Arc::new(
            MapSecretSource::new()
                .with_secret("ravendb", "cert-a", &["a.pfx"])
                .with_secret("ravendb", "cert-b", &["b.pfx"])
                .with_secret("ravendb", "cert-c", &["c.pfx"]),
        );
        let validator = NodeValidator::new(secrets);

        let cluster = base_cluster_lets_encrypt("node-ok");
        let errors = validator.validate_create(&cluster).await;
        assert!(errors.is_empty(), "{errors:?}");

        let cluster = base_cluster("node-ok-none");
        let errors = validator.validate_create(&cluster).await;
        assert!(errors.is_empty(), "{errors:?}");
    }
}

//! Cross-field spec checks: mode/email coherence, referenced secret shapes,
//! domain syntax and extra environment variables.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::crd::{ClusterMode, RavenDBCluster};

use super::{check_single_key_secret, cluster_namespace, ClusterValidator, SecretSource};

pub struct GeneralValidator {
    secrets: Arc<dyn SecretSource>,
}

impl GeneralValidator {
    pub fn new(secrets: Arc<dyn SecretSource>) -> Self {
        Self { secrets }
    }
}

#[async_trait]
impl ClusterValidator for GeneralValidator {
    fn name(&self) -> &'static str {
        "general-validator"
    }

    async fn validate_create(&self, cluster: &RavenDBCluster) -> Vec<String> {
        let namespace = cluster_namespace(cluster);
        let mut errors = Vec::new();

        errors.extend(validate_email(cluster.mode(), cluster.email()));
        errors.extend(
            check_single_key_secret(
                self.secrets.as_ref(),
                &namespace,
                "spec.licenseSecretRef",
                cluster.license_secret_ref(),
                ".json",
            )
            .await,
        );
        errors.extend(
            validate_cluster_cert_secret(
                self.secrets.as_ref(),
                &namespace,
                cluster.mode(),
                cluster.cluster_cert_secret_ref(),
            )
            .await,
        );
        errors.extend(validate_domain(cluster.domain()));
        errors.extend(validate_env(cluster));

        errors
    }
}

pub fn validate_email(mode: ClusterMode, email: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if mode == ClusterMode::LetsEncrypt && email.is_empty() {
        errors.push("spec.email is required when mode is LetsEncrypt".to_string());
    }
    if mode == ClusterMode::None && !email.is_empty() {
        errors.push("spec.email must not be set when mode is None".to_string());
    }

    errors
}

pub async fn validate_cluster_cert_secret(
    secrets: &dyn SecretSource,
    namespace: &str,
    mode: ClusterMode,
    cluster_cert: &str,
) -> Vec<String> {
    if mode == ClusterMode::LetsEncrypt {
        if !cluster_cert.is_empty() {
            return vec!["spec.clusterCertSecretRef must not be set when mode is LetsEncrypt".to_string()];
        }
        return Vec::new();
    }

    if cluster_cert.is_empty() {
        return vec!["spec.clusterCertSecretRef is required when mode is None".to_string()];
    }

    check_single_key_secret(secrets, namespace, "spec.clusterCertSecretRef", cluster_cert, ".pfx")
        .await
}

pub fn validate_domain(domain: &str) -> Vec<String> {
    if is_valid_fqdn(domain) {
        Vec::new()
    } else {
        vec![format!("spec.domain '{domain}' must be a valid FQDN")]
    }
}

fn is_valid_fqdn(s: &str) -> bool {
    if s.contains('_') || s == "localhost" {
        return false;
    }
    s.parse::<IpAddr>().is_err()
}

pub fn validate_env(cluster: &RavenDBCluster) -> Vec<String> {
    cluster
        .env()
        .keys()
        .filter(|name| !name.starts_with("RAVEN_"))
        .map(|name| format!("spec.env: environment variable '{name}' must start with 'RAVEN_'"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::{base_cluster, base_cluster_lets_encrypt, env_of};
    use super::super::MapSecretSource;

    fn sources() -> MapSecretSource {
        MapSecretSource::new()
            .with_secret("ravendb", "license", &["license.json"])
            .with_secret("ravendb", "non-json-key-license", &["license.txt"])
            .with_secret("ravendb", "invalid-license-multi-keys", &["one.json", "two.json"])
            .with_secret("ravendb", "valid-cluster-cert", &["cluster.pfx"])
            .with_secret("ravendb", "non-pfx-cluster-cert", &["cert.pem"])
            .with_secret("ravendb", "multi-key-cluster-cert", &["one.pfx", "two.pfx"])
    }

    #[test]
    fn email_required_iff_lets_encrypt() {
        assert!(validate_email(ClusterMode::LetsEncrypt, "")[0]
            .contains("spec.email is required when mode is LetsEncrypt"));
        assert!(validate_email(ClusterMode::LetsEncrypt, "me@example.com").is_empty());
        assert!(validate_email(ClusterMode::None, "me@example.com")[0]
            .contains("spec.email must not be set when mode is None"));
        assert!(validate_email(ClusterMode::None, "").is_empty());
    }

    #[tokio::test]
    async fn license_secret_shape_is_enforced() {
        let secrets = sources();

        let ok = check_single_key_secret(&secrets, "ravendb", "spec.licenseSecretRef", "license", ".json")
            .await;
        assert!(ok.is_empty());

        let missing = check_single_key_secret(
            &secrets,
            "ravendb",
            "spec.licenseSecretRef",
            "non-existing-secret",
            ".json",
        )
        .await;
        assert!(missing[0].contains("secret 'non-existing-secret' not found"));

        let bad_key = check_single_key_secret(
            &secrets,
            "ravendb",
            "spec.licenseSecretRef",
            "non-json-key-license",
            ".json",
        )
        .await;
        assert!(bad_key[0]
            .contains("secret 'non-json-key-license' must contain a file ending with '.json'"));

        let multi = check_single_key_secret(
            &secrets,
            "ravendb",
            "spec.licenseSecretRef",
            "invalid-license-multi-keys",
            ".json",
        )
        .await;
        assert!(multi[0]
            .contains("secret 'invalid-license-multi-keys' must contain exactly one '.json' file"));
    }

    #[tokio::test]
    async fn cluster_cert_is_mode_dependent() {
        let secrets = sources();

        let rejected = validate_cluster_cert_secret(
            &secrets,
            "ravendb",
            ClusterMode::LetsEncrypt,
            "valid-cluster-cert",
        )
        .await;
        assert!(rejected[0].contains("must not be set when mode is LetsEncrypt"));

        let required =
            validate_cluster_cert_secret(&secrets, "ravendb", ClusterMode::None, "").await;
        assert!(required[0].contains("spec.clusterCertSecretRef is required when mode is None"));

        let missing =
            validate_cluster_cert_secret(&secrets, "ravendb", ClusterMode::None, "non-existent")
                .await;
        assert!(missing[0].contains("secret 'non-existent' not found"));

        let non_pfx = validate_cluster_cert_secret(
            &secrets,
            "ravendb",
            ClusterMode::None,
            "non-pfx-cluster-cert",
        )
        .await;
        assert!(non_pfx[0].contains("must contain a file ending with '.pfx'"));

        let multi = validate_cluster_cert_secret(
            &secrets,
            "ravendb",
            ClusterMode::None,
            "multi-key-cluster-cert",
        )
        .await;
        assert!(multi[0].contains("must contain exactly one '.pfx' file"));

        let ok = validate_cluster_cert_secret(
            &secrets,
            "ravendb",
            ClusterMode::None,
            "valid-cluster-cert",
        )
        .await;
        assert!(ok.is_empty());
    }

    #[test]
    fn domain_must_be_an_fqdn() {
        assert!(validate_domain("bad_domain.com")[0]
            .contains("spec.domain 'bad_domain.com' must be a valid FQDN"));
        assert!(validate_domain("localhost")[0].contains("must be a valid FQDN"));
        assert!(validate_domain("127.0.0.1")[0].contains("must be a valid FQDN"));
        assert!(validate_domain("example.com").is_empty());
        assert!(validate_domain("local").is_empty());
    }

    #[test]
    fn env_vars_must_carry_the_raven_prefix() {
        let mut cluster = base_cluster("env-prefix");
        cluster.spec.env = Some(env_of(&[("RAVEN_Setup_Mode", "None"), ("RAVEN_Port", "8080")]));
        assert!(validate_env(&cluster).is_empty());

        cluster.spec.env = Some(env_of(&[("DEBUG", "true")]));
        assert!(validate_env(&cluster)[0]
            .contains("environment variable 'DEBUG' must start with 'RAVEN_'"));
    }

    #[tokio::test]
    async fn whole_validator_aggregates_all_checks() {
        let secrets = Arc::new(sources());
        let validator = GeneralValidator::new(secrets);

        let mut cluster = base_cluster_lets_encrypt("general-all");
        cluster.spec.email = None;
        cluster.spec.domain = "bad_domain".to_string();

        let errors = validator.validate_create(&cluster).await;
        assert!(errors.iter().any(|e| e.contains("spec.email is required")));
        assert!(errors.iter().any(|e| e.contains("must be a valid FQDN")));
    }
}

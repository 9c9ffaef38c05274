//! Admission-time validation pipeline.
//!
//! Validators are composed explicitly (no process-wide registry): the
//! operator wires [`ValidatorPipeline::with_defaults`] at startup, tests
//! build their own chains with in-memory secret sources.

mod external_access;
mod general;
mod image;
mod immutable;
mod node;
mod storage;

pub use external_access::ExternalAccessValidator;
pub use general::GeneralValidator;
pub use image::ImageValidator;
pub use immutable::ImmutableFieldsValidator;
pub use node::NodeValidator;
pub use storage::StorageValidator;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::storage::v1alpha1::VolumeAttributesClass;
use kube::api::Api;
use kube::Client;

use crate::crd::RavenDBCluster;
use crate::error::{Error, Result};

/// Read access to secrets for content-shape checks. Tests provide an
/// in-memory map; the operator uses the API-backed implementation.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Key names of the secret, or None when the secret does not exist.
    async fn secret_keys(&self, namespace: &str, name: &str) -> Result<Option<Vec<String>>>;
}

pub struct ApiSecretSource {
    client: Client,
}

impl ApiSecretSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretSource for ApiSecretSource {
    async fn secret_keys(&self, namespace: &str, name: &str) -> Result<Option<Vec<String>>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api.get_opt(name).await?;
        Ok(secret.map(|s| s.data.unwrap_or_default().keys().cloned().collect()))
    }
}

/// In-memory secret source for tests: namespace/name -> key names.
pub struct MapSecretSource {
    secrets: BTreeMap<(String, String), Vec<String>>,
}

impl MapSecretSource {
    pub fn new() -> Self {
        Self {
            secrets: BTreeMap::new(),
        }
    }

    pub fn with_secret(mut self, namespace: &str, name: &str, keys: &[&str]) -> Self {
        self.secrets.insert(
            (namespace.to_string(), name.to_string()),
            keys.iter().map(|k| k.to_string()).collect(),
        );
        self
    }
}

impl Default for MapSecretSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretSource for MapSecretSource {
    async fn secret_keys(&self, namespace: &str, name: &str) -> Result<Option<Vec<String>>> {
        Ok(self
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}

/// Existence check for VolumeAttributesClass references.
#[async_trait]
pub trait VolumeAttributesClassSource: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool>;
}

pub struct ApiVacSource {
    client: Client,
}

impl ApiVacSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VolumeAttributesClassSource for ApiVacSource {
    async fn exists(&self, name: &str) -> Result<bool> {
        let api: Api<VolumeAttributesClass> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?.is_some())
    }
}

/// Test VAC source backed by a name list.
pub struct StaticVacSource {
    names: Vec<String>,
}

impl StaticVacSource {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }
}

#[async_trait]
impl VolumeAttributesClassSource for StaticVacSource {
    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.names.iter().any(|n| n == name))
    }
}

/// One admission validator. Errors are human-readable lines, each carrying
/// the offending field path.
#[async_trait]
pub trait ClusterValidator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn validate_create(&self, cluster: &RavenDBCluster) -> Vec<String>;

    async fn validate_update(
        &self,
        _old: &RavenDBCluster,
        new: &RavenDBCluster,
    ) -> Vec<String> {
        self.validate_create(new).await
    }
}

pub struct ValidatorPipeline {
    validators: Vec<Box<dyn ClusterValidator>>,
}

impl ValidatorPipeline {
    pub fn new(validators: Vec<Box<dyn ClusterValidator>>) -> Self {
        Self { validators }
    }

    /// The full production chain.
    pub fn with_defaults(
        secrets: Arc<dyn SecretSource>,
        vacs: Arc<dyn VolumeAttributesClassSource>,
    ) -> Self {
        Self::new(vec![
            Box::new(ImageValidator),
            Box::new(GeneralValidator::new(secrets.clone())),
            Box::new(NodeValidator::new(secrets)),
            Box::new(ExternalAccessValidator),
            Box::new(StorageValidator::new(vacs)),
            Box::new(ImmutableFieldsValidator),
        ])
    }

    pub async fn run_create(&self, cluster: &RavenDBCluster) -> Result<()> {
        let mut errors = Vec::new();
        for validator in &self.validators {
            for line in validator.validate_create(cluster).await {
                errors.push(format!("[{}] {line}", validator.name()));
            }
        }
        aggregate(errors)
    }

    pub async fn run_update(&self, old: &RavenDBCluster, new: &RavenDBCluster) -> Result<()> {
        let mut errors = Vec::new();
        for validator in &self.validators {
            for line in validator.validate_update(old, new).await {
                errors.push(format!("[{}] {line}", validator.name()));
            }
        }
        aggregate(errors)
    }
}

fn aggregate(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::ValidationError(errors))
    }
}

/// Shared secret-shape check: the secret must exist and hold exactly one
/// key with the given suffix.
pub(crate) async fn check_single_key_secret(
    secrets: &dyn SecretSource,
    namespace: &str,
    field: &str,
    secret_name: &str,
    suffix: &str,
) -> Vec<String> {
    let keys = match secrets.secret_keys(namespace, secret_name).await {
        Err(e) => return vec![format!("{field}: failed to read secret '{secret_name}': {e}")],
        Ok(None) => return vec![format!("{field}: secret '{secret_name}' not found")],
        Ok(Some(keys)) => keys,
    };

    if keys.len() != 1 {
        return vec![format!(
            "{field}: secret '{secret_name}' must contain exactly one '{suffix}' file"
        )];
    }

    if !keys[0].ends_with(suffix) {
        return vec![format!(
            "{field}: secret '{secret_name}' must contain a file ending with '{suffix}', got '{}' instead",
            keys[0]
        )];
    }

    Vec::new()
}

pub(crate) fn cluster_namespace(cluster: &RavenDBCluster) -> String {
    cluster
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| "default".to_string())
}

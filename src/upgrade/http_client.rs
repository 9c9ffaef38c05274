//! Mutually-authenticated HTTPS client for the gate probes, assembled once
//! per reconcile from the cluster's referenced secrets.

use std::time::Duration;

use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::{Client, ResourceExt};
use reqwest::{Certificate, Identity};

use crate::crd::{ClusterMode, RavenDBCluster};
use crate::error::{Error, Result};

const CLIENT_PFX_KEY: &str = "client.pfx";
const CLIENT_PASSWORD_KEY: &str = "password";
const CA_CRT_KEY: &str = "ca.crt";

/// Build the probe client: the PKCS#12 client identity always, plus the CA
/// pool when the cluster runs on its own certificates (mode None).
/// LetsEncrypt chains validate against the system trust store.
pub async fn build_https_client(
    client: &Client,
    cluster: &RavenDBCluster,
) -> Result<reqwest::Client> {
    let namespace = cluster.namespace().unwrap_or_else(|| "default".to_string());
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &namespace);

    let client_secret = secrets
        .get_opt(cluster.client_cert_secret_ref())
        .await?
        .ok_or_else(|| {
            Error::ConfigError(format!(
                "client cert secret {:?} not found",
                cluster.client_cert_secret_ref()
            ))
        })?;
    let identity = load_client_identity(&namespace, &client_secret)?;

    let mut builder = reqwest::Client::builder()
        .identity(identity)
        .min_tls_version(reqwest::tls::Version::TLS_1_2)
        .timeout(Duration::from_secs(30));

    if needs_ca(cluster) {
        builder = builder.add_root_certificate(load_ca(&secrets, cluster, &namespace).await?);
    }

    Ok(builder.build()?)
}

fn needs_ca(cluster: &RavenDBCluster) -> bool {
    // self-signed chains need the CA pool; LetsEncrypt is publicly trusted
    cluster.mode() == ClusterMode::None
}

fn load_client_identity(namespace: &str, secret: &Secret) -> Result<Identity> {
    let data = secret.data.clone().unwrap_or_default();

    let pfx = data
        .get(CLIENT_PFX_KEY)
        .filter(|b| !b.0.is_empty())
        .ok_or_else(|| Error::SecretKeyMissing {
            namespace: namespace.to_string(),
            name: secret.name_any(),
            key: CLIENT_PFX_KEY,
        })?;

    // empty password is allowed
    let password = data
        .get(CLIENT_PASSWORD_KEY)
        .map(|b| String::from_utf8_lossy(&b.0).to_string())
        .unwrap_or_default();

    Identity::from_pkcs12_der(&pfx.0, &password)
        .map_err(|e| Error::ConfigError(format!("decode {CLIENT_PFX_KEY}: {e}")))
}

async fn load_ca(
    secrets: &Api<Secret>,
    cluster: &RavenDBCluster,
    namespace: &str,
) -> Result<Certificate> {
    let ca_name = cluster.ca_cert_secret_ref().trim().to_string();

    let ca_secret = secrets.get_opt(&ca_name).await?.ok_or_else(|| {
        Error::ConfigError(format!("CA secret {ca_name:?} not found"))
    })?;

    let pem = ca_secret
        .data
        .clone()
        .unwrap_or_default()
        .get(CA_CRT_KEY)
        .filter(|b| !b.0.is_empty())
        .cloned()
        .ok_or_else(|| Error::SecretKeyMissing {
            namespace: namespace.to_string(),
            name: ca_name.clone(),
            key: CA_CRT_KEY,
        })?;

    Certificate::from_pem(&pem.0)
        .map_err(|e| Error::ConfigError(format!("parse {CA_CRT_KEY} from {ca_name:?}: {e}")))
}

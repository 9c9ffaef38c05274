//! Hook configmap actor: publishes the embedded bootstrap and certificate
//! shell hooks so the job and server pods can mount them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::Api;
use kube::core::ObjectMeta;
use kube::{Client, ResourceExt};

use crate::assets;
use crate::common;
use crate::crd::RavenDBCluster;
use crate::error::{Error, Result};

use super::{apply_ssa, PerClusterActor};

pub struct HooksActor;

#[async_trait]
impl PerClusterActor for HooksActor {
    fn name(&self) -> &'static str {
        "HooksActor"
    }

    async fn act(&self, client: &Client, cluster: &RavenDBCluster) -> Result<bool> {
        let namespace = cluster.namespace().unwrap_or_else(|| "default".to_string());
        let api: Api<ConfigMap> = Api::namespaced(client.clone(), &namespace);

        let mut bootstrap_data = BTreeMap::new();
        bootstrap_data.insert(
            common::INIT_CLUSTER_HOOK_KEY.to_string(),
            assets::INIT_CLUSTER_SCRIPT.to_string(),
        );
        bootstrap_data.insert(
            common::CHECK_NODES_HOOK_KEY.to_string(),
            assets::CHECK_NODES_DISCOVERABILITY_SCRIPT.to_string(),
        );
        let bootstrap_cm = build_config_map(cluster, common::BOOTSTRAP_HOOK_CONFIGMAP, bootstrap_data);

        let mut cert_data = BTreeMap::new();
        cert_data.insert(
            common::UPDATE_CERT_HOOK_KEY.to_string(),
            assets::UPDATE_CERT_SCRIPT.to_string(),
        );
        cert_data.insert(
            common::GET_CERT_HOOK_KEY.to_string(),
            assets::GET_SERVER_CERT_SCRIPT.to_string(),
        );
        let cert_cm = build_config_map(cluster, common::CERT_HOOK_CONFIGMAP, cert_data);

        let changed_bootstrap = apply_ssa(&api, &bootstrap_cm, "ravendb-operator/hooks")
            .await
            .map_err(|e| Error::ActorError(self.name(), e.to_string()))?;
        let changed_cert = apply_ssa(&api, &cert_cm, "ravendb-operator/hooks")
            .await
            .map_err(|e| Error::ActorError(self.name(), e.to_string()))?;

        Ok(changed_bootstrap || changed_cert)
    }
}

fn build_config_map(
    cluster: &RavenDBCluster,
    name: &str,
    data: BTreeMap<String, String>,
) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: cluster.namespace(),
            labels: Some(common::cluster_labels(cluster)),
            owner_references: Some(vec![common::owner_reference(cluster)]),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

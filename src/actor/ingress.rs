//! Cluster ingress actor; only runs when external access goes through an
//! ingress controller.

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::Api;
use kube::{Client, ResourceExt};

use crate::crd::RavenDBCluster;
use crate::error::{Error, Result};
use crate::resource::build_ingress;

use super::{apply_ssa, PerClusterActor};

pub struct IngressActor;

#[async_trait]
impl PerClusterActor for IngressActor {
    fn name(&self) -> &'static str {
        "IngressActor"
    }

    fn should_act(&self, cluster: &RavenDBCluster) -> bool {
        cluster.external_access_type() == "ingress-controller"
    }

    async fn act(&self, client: &Client, cluster: &RavenDBCluster) -> Result<bool> {
        let namespace = cluster.namespace().unwrap_or_else(|| "default".to_string());
        let api: Api<Ingress> = Api::namespaced(client.clone(), &namespace);

        let desired =
            build_ingress(cluster).map_err(|e| Error::ActorError(self.name(), e.to_string()))?;

        apply_ssa(&api, &desired, "ravendb-operator/ingress")
            .await
            .map_err(|e| Error::ActorError(self.name(), e.to_string()))
    }
}

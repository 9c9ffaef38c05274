//! Per-node service actor.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::api::Api;
use kube::{Client, ResourceExt};

use crate::crd::{RavenDBCluster, RavenDBNode};
use crate::error::{Error, Result};
use crate::resource::build_service;

use super::{apply_ssa, PerNodeActor};

pub struct ServiceActor;

#[async_trait]
impl PerNodeActor for ServiceActor {
    fn name(&self) -> &'static str {
        "ServiceActor"
    }

    async fn act(
        &self,
        client: &Client,
        cluster: &RavenDBCluster,
        node: &RavenDBNode,
    ) -> Result<bool> {
        let namespace = cluster.namespace().unwrap_or_else(|| "default".to_string());
        let api: Api<Service> = Api::namespaced(client.clone(), &namespace);

        let desired = build_service(cluster, node)
            .map_err(|e| Error::ActorError(self.name(), e.to_string()))?;

        apply_ssa(&api, &desired, "ravendb-operator/service")
            .await
            .map_err(|e| Error::ActorError(self.name(), e.to_string()))
    }
}

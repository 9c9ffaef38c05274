//! Bootstrap job actor. Jobs are immutable, so this actor is create-only:
//! an existing job is left untouched regardless of its state.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};

use crate::common;
use crate::crd::RavenDBCluster;
use crate::error::{Error, Result};
use crate::resource::build_job;

use super::PerClusterActor;

pub struct BootstrapperActor;

#[async_trait]
impl PerClusterActor for BootstrapperActor {
    fn name(&self) -> &'static str {
        "BootstrapperActor"
    }

    fn should_act(&self, cluster: &RavenDBCluster) -> bool {
        !cluster.is_bootstrapped()
    }

    async fn act(&self, client: &Client, cluster: &RavenDBCluster) -> Result<bool> {
        let namespace = cluster.namespace().unwrap_or_else(|| "default".to_string());
        let api: Api<Job> = Api::namespaced(client.clone(), &namespace);

        if api.get_opt(common::BOOTSTRAPPER_JOB).await?.is_some() {
            return Ok(false);
        }

        let job = build_job(cluster).map_err(|e| Error::ActorError(self.name(), e.to_string()))?;
        api.create(&PostParams::default(), &job)
            .await
            .map_err(|e| Error::ActorError(self.name(), e.to_string()))?;

        Ok(true)
    }
}

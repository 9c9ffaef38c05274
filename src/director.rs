//! The director runs the ordered actor lists for one reconcile, skipping
//! gated per-cluster actors, stopping at the first failure and OR-ing the
//! changed flags.

use kube::Client;
use tracing::debug;

use crate::actor::{
    BootstrapperActor, HooksActor, IngressActor, PerClusterActor, PerNodeActor, ServiceActor,
    StatefulSetActor,
};
use crate::crd::{RavenDBCluster, RavenDBNode};
use crate::error::Result;

pub struct Director {
    per_cluster_actors: Vec<Box<dyn PerClusterActor>>,
    per_node_actors: Vec<Box<dyn PerNodeActor>>,
}

impl Default for Director {
    fn default() -> Self {
        Self {
            per_cluster_actors: vec![
                Box::new(HooksActor),
                Box::new(IngressActor),
                Box::new(BootstrapperActor),
            ],
            per_node_actors: vec![Box::new(StatefulSetActor), Box::new(ServiceActor)],
        }
    }
}

impl Director {
    pub async fn execute_per_cluster(
        &self,
        client: &Client,
        cluster: &RavenDBCluster,
    ) -> Result<bool> {
        let mut any_changed = false;
        for actor in &self.per_cluster_actors {
            if !actor.should_act(cluster) {
                debug!(actor = actor.name(), "skipping gated actor");
                continue;
            }
            if actor.act(client, cluster).await? {
                any_changed = true;
            }
        }
        Ok(any_changed)
    }

    pub async fn execute_per_node(
        &self,
        client: &Client,
        cluster: &RavenDBCluster,
        node: &RavenDBNode,
    ) -> Result<bool> {
        let mut any_changed = false;
        for actor in &self.per_node_actors {
            if actor.act(client, cluster, node).await? {
                any_changed = true;
            }
        }
        Ok(any_changed)
    }
}

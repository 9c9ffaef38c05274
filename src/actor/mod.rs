//! Actors build one desired child object each and hand it to the apply
//! layer. Per-cluster actors may decline to run through `should_act`;
//! per-node actors always run for every node they are invoked with.

mod apply;
mod bootstrapper;
mod hooks;
mod ingress;
mod service;
mod statefulset;

pub use apply::apply_ssa;
pub use bootstrapper::BootstrapperActor;
pub use hooks::HooksActor;
pub use ingress::IngressActor;
pub use service::ServiceActor;
pub use statefulset::StatefulSetActor;

use async_trait::async_trait;
use kube::Client;

use crate::crd::{RavenDBCluster, RavenDBNode};
use crate::error::Result;

#[async_trait]
pub trait PerClusterActor: Send + Sync {
    fn name(&self) -> &'static str;

    fn should_act(&self, _cluster: &RavenDBCluster) -> bool {
        true
    }

    /// Returns whether an observable change was applied.
    async fn act(&self, client: &Client, cluster: &RavenDBCluster) -> Result<bool>;
}

#[async_trait]
pub trait PerNodeActor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns whether an observable change was applied.
    async fn act(
        &self,
        client: &Client,
        cluster: &RavenDBCluster,
        node: &RavenDBNode,
    ) -> Result<bool>;
}

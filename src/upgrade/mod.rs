//! Rolling version upgrades: one node per reconcile tick, gated by HTTP
//! health probes against the database control plane before and after the
//! image transition.

mod annotations;
mod gates;
mod http_client;
mod upgrader;
mod wait;

pub use annotations::{read_timing_from_annotations, Timing};
pub use gates::{GateCheck, HealthCheckContext};
pub use http_client::build_https_client;
pub use upgrader::{select_target, StatefulSetView, Upgrader};

use async_trait::async_trait;

use crate::crd::RavenDBCluster;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatePhase {
    PreStep,
    PostStep,
}

impl std::fmt::Display for GatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatePhase::PreStep => write!(f, "pre-step"),
            GatePhase::PostStep => write!(f, "post-step"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateKind {
    NodeAlive,
    ClusterConnectivity,
    DatabasesOnline,
}

impl std::fmt::Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateKind::NodeAlive => write!(f, "node_alive"),
            GateKind::ClusterConnectivity => write!(f, "cluster_connectivity"),
            GateKind::DatabasesOnline => write!(f, "db_groups_available_excluding_target"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    Start,
    Pass,
    Block,
    Timeout,
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateState::Start => write!(f, "start"),
            GateState::Pass => write!(f, "pass"),
            GateState::Block => write!(f, "block"),
            GateState::Timeout => write!(f, "timeout"),
        }
    }
}

/// A gate that did not come up green within its phase budget, or failed hard.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{phase}/{kind} gate failed for node {tag}: {info}")]
pub struct GateError {
    pub phase: GatePhase,
    pub kind: GateKind,
    pub tag: String,
    pub info: String,
}

/// Receives gate lifecycle notifications. The reconciler's implementation
/// turns them into Kubernetes events on the CR and the node's statefulset;
/// tests record them.
#[async_trait]
pub trait GateEventSink: Send + Sync {
    async fn emit(
        &self,
        cluster: &RavenDBCluster,
        state: GateState,
        phase: GatePhase,
        kind: GateKind,
        tag: &str,
        info: &str,
    );
}

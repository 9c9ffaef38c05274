//! One upgrade tick: pick at most one node, gate it, let the per-node actor
//! chain move its image, gate it again, report per-node statuses.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::api::Api;
use kube::{Client, ResourceExt};
use tracing::{info, warn};

use crate::common;
use crate::crd::{NodeStatusPhase, RavenDBCluster, RavenDBNode, RavenDBNodeStatus};
use crate::director::Director;
use crate::error::Error;

use super::annotations::{
    current_sts_image, has_upgrade_annotation, set_upgrade_annotation, Timing,
};
use super::gates::HealthCheckContext;
use super::http_client::build_https_client;
use super::wait::{
    wait_for_gate, ConnectivityProbe, DatabasesOnlineProbe, GateProbe, NodeAliveProbe,
};
use super::{GateError, GateEventSink, GateKind, GatePhase};

/// What the upgrader needs to know about a node's live statefulset.
#[derive(Clone, Debug, Default)]
pub struct StatefulSetView {
    pub image: String,
    pub marked: bool,
}

/// Pick the node to work on this tick, in precedence order: resume the
/// marked in-flight node, then the first node with no statefulset yet, then
/// the first node whose live image differs from the desired one.
pub fn select_target(
    nodes: &[RavenDBNode],
    live: &HashMap<String, StatefulSetView>,
    desired_image: &str,
) -> Option<String> {
    for node in nodes {
        if live
            .get(&normalize_tag(&node.tag))
            .is_some_and(|v| v.marked)
        {
            return Some(normalize_tag(&node.tag));
        }
    }

    for node in nodes {
        if !live.contains_key(&normalize_tag(&node.tag)) {
            return Some(normalize_tag(&node.tag));
        }
    }

    for node in nodes {
        if let Some(view) = live.get(&normalize_tag(&node.tag)) {
            if !view.image.is_empty() && !desired_image.is_empty() && view.image != desired_image {
                return Some(normalize_tag(&node.tag));
            }
        }
    }

    None
}

/// A node counts as upgrading only once its statefulset exists and either
/// carries the marker or disagrees with the desired image. First-time
/// creation is not an upgrade; no gates run for it.
fn is_upgrading(sts_exists: bool, desired_image: &str, current_image: &str, marked: bool) -> bool {
    if !sts_exists || desired_image.is_empty() || current_image.is_empty() {
        return false;
    }
    marked || desired_image != current_image
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_uppercase()
}

fn failed_status(tag: &str, message: &str, desired_image: &str) -> RavenDBNodeStatus {
    RavenDBNodeStatus {
        tag: tag.to_string(),
        status: NodeStatusPhase::Failed,
        last_attempted_image: Some(desired_image.to_string()),
        last_error: Some(message.to_string()),
        last_attempt_time: Some(Utc::now().to_rfc3339()),
    }
}

fn success_status(tag: &str, desired_image: &str) -> RavenDBNodeStatus {
    RavenDBNodeStatus {
        tag: tag.to_string(),
        status: NodeStatusPhase::Created,
        last_attempted_image: Some(desired_image.to_string()),
        last_error: None,
        last_attempt_time: Some(Utc::now().to_rfc3339()),
    }
}

pub struct Upgrader {
    timing: Timing,
    emitter: Option<Arc<dyn GateEventSink>>,
}

impl Upgrader {
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            emitter: None,
        }
    }

    pub fn set_emitter(&mut self, emitter: Arc<dyn GateEventSink>) {
        self.emitter = Some(emitter);
    }

    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }

    /// Perform one upgrade tick and return the status of every node in spec
    /// order. A failure is reported alongside the statuses: the selected
    /// node is marked Failed, the annotation is rolled back, and the next
    /// reconcile re-selects.
    pub async fn run(
        &self,
        client: &Client,
        cluster: &RavenDBCluster,
        director: &Director,
    ) -> (Vec<RavenDBNodeStatus>, Option<Error>) {
        let prev = previous_status_map(cluster);
        let fallback = |prev: &HashMap<String, RavenDBNodeStatus>| {
            cluster
                .spec
                .nodes
                .iter()
                .map(|n| status_or_created(prev, &n.tag))
                .collect::<Vec<_>>()
        };

        let http = match build_https_client(client, cluster).await {
            Ok(http) => http,
            Err(e) => return (fallback(&prev), Some(e)),
        };
        let gates = HealthCheckContext::new(Some(http), cluster);

        let desired_image = cluster.image().to_string();

        let live = match self.load_live_views(client, cluster).await {
            Ok(live) => live,
            Err(e) => return (fallback(&prev), Some(e)),
        };

        let Some(selected) = select_target(&cluster.spec.nodes, &live, &desired_image) else {
            return (fallback(&prev), None);
        };

        info!(node = %selected, image = %desired_image, "upgrade tick targets node");

        let mut statuses = Vec::with_capacity(cluster.spec.nodes.len());
        for (index, node) in cluster.spec.nodes.iter().enumerate() {
            if normalize_tag(&node.tag) != selected {
                statuses.push(status_or_created(&prev, &node.tag));
                continue;
            }

            let view = live.get(&selected);
            let sts_exists = view.is_some();
            let current_image = view.map(|v| v.image.clone()).unwrap_or_default();
            let marked = view.map(|v| v.marked).unwrap_or(false);
            let upgrading = is_upgrading(sts_exists, &desired_image, &current_image, marked);

            if upgrading && !marked {
                if let Err(gate_err) = self.pre_node(cluster, &gates, &node.tag).await {
                    statuses.push(failed_status(&node.tag, &gate_err.to_string(), &desired_image));
                    fill_remaining(&mut statuses, cluster, index + 1, &prev);
                    return (statuses, Some(gate_err.into()));
                }

                // mark upgrade intent with the target image
                if let Err(e) =
                    set_upgrade_annotation(client, cluster, &node.tag, &desired_image).await
                {
                    statuses.push(failed_status(
                        &node.tag,
                        &format!("set upgrade annotation: {e}"),
                        &desired_image,
                    ));
                    let _ = set_upgrade_annotation(client, cluster, &node.tag, "").await;
                    fill_remaining(&mut statuses, cluster, index + 1, &prev);
                    return (statuses, Some(e));
                }
            }

            if let Err(e) = director.execute_per_node(client, cluster, node).await {
                statuses.push(failed_status(&node.tag, &e.to_string(), &desired_image));
                if upgrading {
                    let _ = set_upgrade_annotation(client, cluster, &node.tag, "").await;
                }
                fill_remaining(&mut statuses, cluster, index + 1, &prev);
                return (statuses, Some(e));
            }

            if upgrading {
                if let Err(gate_err) = self.post_node(cluster, &gates, &node.tag).await {
                    statuses.push(failed_status(&node.tag, &gate_err.to_string(), &desired_image));
                    let _ = set_upgrade_annotation(client, cluster, &node.tag, "").await;
                    fill_remaining(&mut statuses, cluster, index + 1, &prev);
                    return (statuses, Some(gate_err.into()));
                }

                if let Err(e) = set_upgrade_annotation(client, cluster, &node.tag, "").await {
                    warn!(node = %node.tag, error = %e, "failed to clear upgrade annotation");
                }
                statuses.push(success_status(&node.tag, &desired_image));
            } else {
                statuses.push(status_or_created(&prev, &node.tag));
            }
        }

        (statuses, None)
    }

    async fn load_live_views(
        &self,
        client: &Client,
        cluster: &RavenDBCluster,
    ) -> Result<HashMap<String, StatefulSetView>, Error> {
        let namespace = cluster.namespace().unwrap_or_else(|| "default".to_string());
        let api: Api<StatefulSet> = Api::namespaced(client.clone(), &namespace);

        let mut live = HashMap::new();
        for node in &cluster.spec.nodes {
            if let Some(sts) = api.get_opt(&common::statefulset_name(&node.tag)).await? {
                live.insert(
                    normalize_tag(&node.tag),
                    StatefulSetView {
                        image: current_sts_image(&sts),
                        marked: has_upgrade_annotation(&sts),
                    },
                );
            }
        }
        Ok(live)
    }

    async fn pre_node(
        &self,
        cluster: &RavenDBCluster,
        gates: &HealthCheckContext,
        tag: &str,
    ) -> Result<(), GateError> {
        self.gate(cluster, gates, GatePhase::PreStep, GateKind::NodeAlive, tag, tag)
            .await?;
        self.gate(
            cluster,
            gates,
            GatePhase::PreStep,
            GateKind::ClusterConnectivity,
            tag,
            tag,
        )
        .await?;
        // the target node is excluded from the quorum check while it is down
        self.gate(
            cluster,
            gates,
            GatePhase::PreStep,
            GateKind::DatabasesOnline,
            tag,
            tag,
        )
        .await
    }

    async fn post_node(
        &self,
        cluster: &RavenDBCluster,
        gates: &HealthCheckContext,
        tag: &str,
    ) -> Result<(), GateError> {
        self.gate(cluster, gates, GatePhase::PostStep, GateKind::NodeAlive, tag, tag)
            .await?;

        // let the server finish bootstrapping before the deeper gates
        tokio::time::sleep(self.timing.grace_after_ready).await;

        self.gate(
            cluster,
            gates,
            GatePhase::PostStep,
            GateKind::ClusterConnectivity,
            tag,
            tag,
        )
        .await?;
        // post gates verify the full cluster, nothing excluded
        self.gate(
            cluster,
            gates,
            GatePhase::PostStep,
            GateKind::DatabasesOnline,
            tag,
            "",
        )
        .await
    }

    async fn gate(
        &self,
        cluster: &RavenDBCluster,
        gates: &HealthCheckContext,
        phase: GatePhase,
        kind: GateKind,
        tag: &str,
        excluded: &str,
    ) -> Result<(), GateError> {
        let (interval, probe): (_, Box<dyn GateProbe + '_>) = match kind {
            GateKind::NodeAlive => (
                self.timing.ping_interval,
                Box::new(NodeAliveProbe {
                    gates,
                    tag: tag.to_string(),
                }),
            ),
            GateKind::ClusterConnectivity => {
                (self.timing.ping_interval, Box::new(ConnectivityProbe { gates }))
            }
            GateKind::DatabasesOnline => (
                self.timing.db_interval,
                Box::new(DatabasesOnlineProbe {
                    gates,
                    excluded: excluded.to_string(),
                }),
            ),
        };

        let max_wait = match phase {
            GatePhase::PreStep => self.timing.pre_max_wait,
            GatePhase::PostStep => self.timing.post_max_wait,
        };

        wait_for_gate(
            self.emitter.as_ref(),
            cluster,
            phase,
            kind,
            tag,
            interval,
            max_wait,
            probe.as_ref(),
        )
        .await
    }
}

fn previous_status_map(cluster: &RavenDBCluster) -> HashMap<String, RavenDBNodeStatus> {
    cluster
        .status
        .as_ref()
        .map(|s| {
            s.nodes
                .iter()
                .map(|n| (normalize_tag(&n.tag), n.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn status_or_created(
    prev: &HashMap<String, RavenDBNodeStatus>,
    tag: &str,
) -> RavenDBNodeStatus {
    prev.get(&normalize_tag(tag))
        .cloned()
        .unwrap_or_else(|| RavenDBNodeStatus::created(tag))
}

fn fill_remaining(
    statuses: &mut Vec<RavenDBNodeStatus>,
    cluster: &RavenDBCluster,
    from: usize,
    prev: &HashMap<String, RavenDBNodeStatus>,
) {
    for node in cluster.spec.nodes.iter().skip(from) {
        statuses.push(status_or_created(prev, &node.tag));
    }
}

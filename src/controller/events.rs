//! Kubernetes event emission: condition transitions on the CR and gate
//! lifecycle events on both the CR and the node's statefulset.

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::api::Api;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource, ResourceExt};
use tracing::warn;

use crate::common;
use crate::crd::{ClusterCondition, ClusterConditionType, ConditionStatus, RavenDBCluster};
use crate::upgrade::{GateEventSink, GateKind, GatePhase, GateState};

pub fn new_recorder(client: Client) -> Recorder {
    Recorder::new(
        client,
        Reporter {
            controller: common::MANAGER.to_string(),
            instance: None,
        },
    )
}

/// Warning for anything unhealthy; Progressing is informational either way.
fn condition_event_type(condition: &ClusterCondition) -> EventType {
    match condition.type_ {
        ClusterConditionType::Ready if condition.status == ConditionStatus::False => {
            EventType::Warning
        }
        ClusterConditionType::Degraded if condition.status == ConditionStatus::True => {
            EventType::Warning
        }
        ClusterConditionType::Progressing => EventType::Normal,
        _ if condition.status == ConditionStatus::False => EventType::Warning,
        _ => EventType::Normal,
    }
}

/// Emit one event per condition whose status, reason or message moved since
/// the snapshot taken at the start of the reconcile.
pub async fn emit_condition_transitions(
    recorder: &Recorder,
    cluster: &RavenDBCluster,
    snapshot: &[ClusterCondition],
) {
    let Some(status) = &cluster.status else {
        return;
    };

    for condition in &status.conditions {
        let previous = snapshot.iter().find(|c| c.type_ == condition.type_);
        let unchanged = previous.is_some_and(|p| {
            p.status == condition.status
                && p.reason == condition.reason
                && p.message == condition.message
        });
        if unchanged {
            continue;
        }

        let event = Event {
            type_: condition_event_type(condition),
            reason: condition.reason.clone(),
            note: Some(format!(
                "Condition {} changed to {} (reason={}): {}",
                condition.type_, condition.status, condition.reason, condition.message
            )),
            action: "ConditionTransition".to_string(),
            secondary: None,
        };

        if let Err(e) = recorder.publish(&event, &cluster.object_ref(&())).await {
            warn!(condition = %condition.type_, error = %e, "failed to publish condition event");
        }
    }
}

/// Gate lifecycle events, published on the CR and best-effort on the node's
/// statefulset.
pub struct KubeGateEventSink {
    client: Client,
    recorder: Recorder,
}

impl KubeGateEventSink {
    pub fn new(client: Client) -> Self {
        let recorder = new_recorder(client.clone());
        Self { client, recorder }
    }
}

#[async_trait]
impl GateEventSink for KubeGateEventSink {
    async fn emit(
        &self,
        cluster: &RavenDBCluster,
        state: GateState,
        phase: GatePhase,
        kind: GateKind,
        tag: &str,
        info: &str,
    ) {
        let display_tag = {
            let t = tag.trim().to_uppercase();
            if t.is_empty() {
                "-".to_string()
            } else {
                t
            }
        };

        let action = format!("{phase}/{kind}");
        let note = match state {
            GateState::Start => format!("node {display_tag} - {action} started"),
            GateState::Pass => format!("node {display_tag} - {action} passed"),
            GateState::Block => format!("node {display_tag} - {action} blocked: {info}"),
            GateState::Timeout => format!("node {display_tag} - {action} timeout: {info}"),
        };

        let event_type = match state {
            GateState::Pass | GateState::Start => EventType::Normal,
            _ => EventType::Warning,
        };

        // keep the reason short to avoid event folding
        let mut reason = format!("RollingUpgrade_node_{phase}_{kind}_{state}_{display_tag}");
        reason.truncate(64);

        let event = Event {
            type_: event_type,
            reason,
            note: Some(note),
            action,
            secondary: None,
        };

        if let Err(e) = self.recorder.publish(&event, &cluster.object_ref(&())).await {
            warn!(error = %e, "failed to publish gate event on cluster");
        }

        if !tag.trim().is_empty() {
            let namespace = cluster.namespace().unwrap_or_else(|| "default".to_string());
            let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), &namespace);
            // the statefulset may not exist yet during initial creation
            if let Ok(Some(sts)) = api.get_opt(&common::statefulset_name(tag)).await {
                if let Err(e) = self.recorder.publish(&event, &sts.object_ref(&())).await {
                    warn!(error = %e, "failed to publish gate event on statefulset");
                }
            }
        }

        // identical timestamps make the event aggregator fold consecutive
        // events into one; space them out
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

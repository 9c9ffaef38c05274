//! Main reconciler for RavenDBCluster resources.
//!
//! Implements the controller pattern using the kube-rs runtime. One pass:
//! per-cluster actors, the rolling upgrader, fact collection, condition
//! evaluation, status patch, condition-transition events.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Service;
use kube::{
    api::{Api, PostParams},
    client::Client,
    runtime::{
        controller::{Action, Controller},
        watcher::Config,
    },
    ResourceExt,
};
use tracing::{error, info, instrument, warn};

use crate::crd::RavenDBCluster;
use crate::director::Director;
use crate::error::{Error, Result};
use crate::health::{collect_resource_facts, Evaluator};
use crate::upgrade::{read_timing_from_annotations, Timing, Upgrader};

use super::events::{emit_condition_transitions, new_recorder, KubeGateEventSink};

/// Shared state for the controller
pub struct ControllerState {
    pub client: Client,
}

/// Main entry point to start the controller
pub async fn run_controller(state: Arc<ControllerState>) -> Result<()> {
    let client = state.client.clone();
    let clusters: Api<RavenDBCluster> = Api::all(client.clone());

    info!("Starting RavenDBCluster controller");

    // Verify CRD exists
    if let Err(e) = clusters.list(&Default::default()).await {
        error!("RavenDBCluster CRD not found. Please install the CRD first: {e:?}");
        return Err(Error::ConfigError(
            "RavenDBCluster CRD not installed".to_string(),
        ));
    }

    Controller::new(clusters, Config::default())
        .owns::<StatefulSet>(Api::all(client.clone()), Config::default())
        .owns::<Service>(Api::all(client.clone()), Config::default())
        .owns::<Job>(Api::all(client.clone()), Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, state)
        .for_each(|res| async move {
            match res {
                Ok(obj) => info!("Reconciled: {obj:?}"),
                Err(e) => error!("Reconcile error: {e:?}"),
            }
        })
        .await;

    Ok(())
}

#[instrument(skip(ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<RavenDBCluster>, ctx: Arc<ControllerState>) -> Result<Action> {
    let client = ctx.client.clone();
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<RavenDBCluster> = Api::namespaced(client.clone(), &namespace);

    // work from a fresh read so the status patch carries a current
    // resource version
    let Some(mut cluster) = api.get_opt(&obj.name_any()).await? else {
        return Ok(Action::await_change());
    };

    info!(
        "Reconciling RavenDBCluster {}/{} (generation {:?})",
        namespace,
        cluster.name_any(),
        cluster.metadata.generation
    );

    let original = cluster.clone();
    let condition_snapshot = original
        .status
        .as_ref()
        .map(|s| s.conditions.clone())
        .unwrap_or_default();

    let director = Director::default();

    let timing = read_timing_from_annotations(&cluster, Timing::default());
    let mut upgrader = Upgrader::new(timing);
    upgrader.set_emitter(Arc::new(KubeGateEventSink::new(client.clone())));

    director.execute_per_cluster(&client, &cluster).await?;

    // the upgrader drives the per-node actors for at most one node; a gate
    // failure still yields a full status vector for this tick
    let (node_statuses, upgrade_error) = upgrader.run(&client, &cluster, &director).await;
    cluster.status.get_or_insert_with(Default::default).nodes = node_statuses;

    let (facts, collect_error) = collect_resource_facts(&client, &cluster).await;
    if let Some(e) = collect_error {
        // evaluate with whatever was gathered
        warn!("resource collection incomplete: {e}");
    }

    Evaluator.evaluate(&mut cluster, &facts, chrono::Utc::now());

    if original.status != cluster.status {
        let payload = serde_json::to_vec(&cluster)?;
        match api
            .replace_status(&cluster.name_any(), &PostParams::default(), payload)
            .await
        {
            Ok(_) => {}
            Err(e) => {
                let err = Error::KubeError(e);
                if err.is_conflict() {
                    // someone moved the object under us; take the next turn
                    return Ok(Action::requeue(Duration::from_secs(1)));
                }
                return Err(err);
            }
        }
    }

    let recorder = new_recorder(client.clone());
    emit_condition_transitions(&recorder, &cluster, &condition_snapshot).await;

    if let Some(e) = upgrade_error {
        // the failed node is recorded in status; let the platform back off
        // before the next attempt
        return Err(e);
    }

    Ok(Action::requeue(Duration::from_secs(30)))
}

/// Error policy determines how to handle reconciliation errors
fn error_policy(cluster: Arc<RavenDBCluster>, error: &Error, _ctx: Arc<ControllerState>) -> Action {
    error!("Reconciliation error for {}: {error:?}", cluster.name_any());

    let retry = if error.is_retriable() {
        Duration::from_secs(15)
    } else {
        Duration::from_secs(60)
    };

    Action::requeue(retry)
}

//! Lists the cluster's live children and projects them into
//! [`ResourceFacts`]. Ownership filtering is transitive: statefulsets owned
//! by the CR, pods owned by those statefulsets, PVCs owned by either or
//! referenced from a kept pod's volumes.
//!
//! Collection is best-effort: on an API failure the facts gathered so far
//! are returned together with the error, and the evaluator works with what
//! it has.

use std::collections::HashSet;

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};

use crate::crd::RavenDBCluster;
use crate::error::Error;

use super::{
    IngressFact, JobFact, PodFact, PvcFact, ResourceFacts, SecretFact, ServiceFact,
    StatefulSetFact,
};

/// Collect facts for one reconcile. Failures are soft: the partial facts
/// are handed back alongside the error.
pub async fn collect_resource_facts(
    client: &Client,
    cluster: &RavenDBCluster,
) -> (ResourceFacts, Option<Error>) {
    let namespace = cluster.namespace().unwrap_or_else(|| "default".to_string());
    let mut facts = ResourceFacts::default();

    let (sts_facts, owned_sts_uids) = match collect_stateful_sets(client, &namespace, cluster).await
    {
        Ok(v) => v,
        Err(e) => return (facts, Some(e)),
    };
    facts.stateful_sets = sts_facts;

    match collect_jobs(client, &namespace, cluster).await {
        Ok(jobs) => facts.jobs = jobs,
        Err(e) => return (facts, Some(e)),
    }

    let (pod_facts, owned_pod_uids, claimed_pvcs) =
        match collect_pods(client, &namespace, &owned_sts_uids).await {
            Ok(v) => v,
            Err(e) => return (facts, Some(e)),
        };
    facts.pods = pod_facts;

    match collect_pvcs(client, &namespace, &owned_sts_uids, &owned_pod_uids, &claimed_pvcs).await {
        Ok(pvcs) => facts.pvcs = pvcs,
        Err(e) => return (facts, Some(e)),
    }

    match collect_services(client, &namespace, cluster).await {
        Ok(services) => facts.services = services,
        Err(e) => return (facts, Some(e)),
    }

    match collect_ingresses(client, &namespace, cluster).await {
        Ok(ingresses) => facts.ingresses = ingresses,
        Err(e) => return (facts, Some(e)),
    }

    match collect_secrets(client, &namespace).await {
        Ok(secrets) => facts.secrets = secrets,
        Err(e) => return (facts, Some(e)),
    }

    (facts, None)
}

fn is_owned_by_cluster(owners: &[OwnerReference], cluster: &RavenDBCluster) -> bool {
    let uid = cluster.uid().unwrap_or_default();
    owners
        .iter()
        .any(|o| o.kind == "RavenDBCluster" && o.uid == uid)
}

fn is_owned_by_any(owners: &[OwnerReference], allowed: &HashSet<String>) -> bool {
    owners.iter().any(|o| allowed.contains(&o.uid))
}

async fn collect_stateful_sets(
    client: &Client,
    namespace: &str,
    cluster: &RavenDBCluster,
) -> Result<(Vec<StatefulSetFact>, HashSet<String>), Error> {
    let api: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await?;

    let mut facts = Vec::with_capacity(list.items.len());
    let mut owned = HashSet::new();

    for sts in &list.items {
        if !is_owned_by_cluster(&sts.owner_references(), cluster) {
            continue;
        }

        let status = sts.status.clone().unwrap_or_default();
        let current = status.current_revision.unwrap_or_default();
        let update = status.update_revision.unwrap_or_default();
        let updating = !current.is_empty() && !update.is_empty() && current != update;

        facts.push(StatefulSetFact {
            name: sts.name_any(),
            namespace: namespace.to_string(),
            replicas: sts.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
            ready_replicas: status.ready_replicas.unwrap_or(0),
            current_revision: current,
            update_revision: update,
            updating,
        });

        if let Some(uid) = sts.uid() {
            owned.insert(uid);
        }
    }

    Ok((facts, owned))
}

async fn collect_jobs(
    client: &Client,
    namespace: &str,
    cluster: &RavenDBCluster,
) -> Result<Vec<JobFact>, Error> {
    let api: Api<Job> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await?;

    let mut facts = Vec::new();
    for job in &list.items {
        if !is_owned_by_cluster(&job.owner_references(), cluster) {
            continue;
        }
        let status = job.status.clone().unwrap_or_default();
        let succeeded = status.succeeded.unwrap_or(0) >= 1;

        facts.push(JobFact {
            name: job.name_any(),
            namespace: namespace.to_string(),
            succeeded,
            active: status.active.unwrap_or(0),
            failed: status.failed.unwrap_or(0),
            completed: succeeded,
        });
    }

    Ok(facts)
}

#[allow(clippy::type_complexity)]
async fn collect_pods(
    client: &Client,
    namespace: &str,
    owned_sts_uids: &HashSet<String>,
) -> Result<(Vec<PodFact>, HashSet<String>, HashSet<String>), Error> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await?;

    let mut facts = Vec::new();
    let mut owned_pod_uids = HashSet::new();
    let mut claimed_pvcs = HashSet::new();

    for pod in &list.items {
        if !is_owned_by_any(&pod.owner_references(), owned_sts_uids) {
            continue;
        }

        if let Some(uid) = pod.uid() {
            owned_pod_uids.insert(uid);
        }

        let status = pod.status.clone().unwrap_or_default();
        let ready = status
            .conditions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|c| c.type_ == "Ready" && c.status == "True");
        let restarts = status
            .container_statuses
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|cs| cs.restart_count)
            .sum();

        facts.push(PodFact {
            name: pod.name_any(),
            namespace: namespace.to_string(),
            phase: status.phase.unwrap_or_default(),
            ready,
            restarts,
        });

        for volume in pod
            .spec
            .as_ref()
            .map(|s| s.volumes.clone().unwrap_or_default())
            .unwrap_or_default()
        {
            if let Some(pvc) = volume.persistent_volume_claim {
                if !pvc.claim_name.is_empty() {
                    claimed_pvcs.insert(pvc.claim_name);
                }
            }
        }
    }

    Ok((facts, owned_pod_uids, claimed_pvcs))
}

async fn collect_pvcs(
    client: &Client,
    namespace: &str,
    owned_sts_uids: &HashSet<String>,
    owned_pod_uids: &HashSet<String>,
    claimed_pvcs: &HashSet<String>,
) -> Result<Vec<PvcFact>, Error> {
    let api: Api<PersistentVolumeClaim> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await?;

    let mut facts = Vec::new();
    for pvc in &list.items {
        let owners = pvc.owner_references();
        let ours = is_owned_by_any(&owners, owned_sts_uids)
            || is_owned_by_any(&owners, owned_pod_uids)
            || claimed_pvcs.contains(&pvc.name_any());
        if !ours {
            continue;
        }

        let phase = pvc
            .status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_default();

        let requested = pvc
            .spec
            .as_ref()
            .and_then(|s| s.resources.as_ref())
            .and_then(|r| r.requests.as_ref())
            .and_then(|r| r.get("storage"))
            .map(|q| q.0.clone())
            .unwrap_or_default();
        let actual = pvc
            .status
            .as_ref()
            .and_then(|s| s.capacity.as_ref())
            .and_then(|c| c.get("storage"))
            .map(|q| q.0.clone())
            .unwrap_or_default();

        facts.push(PvcFact {
            name: pvc.name_any(),
            namespace: namespace.to_string(),
            bound: phase == "Bound",
            phase,
            requested_size: requested,
            actual_size: actual,
        });
    }

    Ok(facts)
}

async fn collect_services(
    client: &Client,
    namespace: &str,
    cluster: &RavenDBCluster,
) -> Result<Vec<ServiceFact>, Error> {
    let api: Api<Service> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await?;

    let mut facts = Vec::new();
    for svc in &list.items {
        if !is_owned_by_cluster(&svc.owner_references(), cluster) {
            continue;
        }

        let spec = svc.spec.clone().unwrap_or_default();
        let cluster_ip = spec.cluster_ip.unwrap_or_default();
        let lb_ready = svc
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .is_some_and(|ingress| !ingress.is_empty());

        facts.push(ServiceFact {
            name: svc.name_any(),
            namespace: namespace.to_string(),
            type_: spec.type_.unwrap_or_default(),
            has_cluster_ip: !cluster_ip.is_empty() && cluster_ip != "None",
            lb_ready,
        });
    }

    Ok(facts)
}

async fn collect_ingresses(
    client: &Client,
    namespace: &str,
    cluster: &RavenDBCluster,
) -> Result<Vec<IngressFact>, Error> {
    let api: Api<Ingress> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await?;

    let mut facts = Vec::new();
    for ing in &list.items {
        if !is_owned_by_cluster(&ing.owner_references(), cluster) {
            continue;
        }
        let lb_ready = ing
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .is_some_and(|ingress| !ingress.is_empty());

        facts.push(IngressFact {
            name: ing.name_any(),
            namespace: namespace.to_string(),
            lb_ready,
        });
    }

    Ok(facts)
}

/// All secrets in the namespace are retained; the evaluator filters by the
/// expected name set.
async fn collect_secrets(client: &Client, namespace: &str) -> Result<Vec<SecretFact>, Error> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await?;

    Ok(list
        .items
        .iter()
        .map(|s| SecretFact {
            name: s.name_any(),
            namespace: namespace.to_string(),
            type_: s.type_.clone().unwrap_or_default(),
        })
        .collect())
}

//! Translates [`ResourceFacts`] into the eight typed conditions and rolls
//! them up into Ready and the cluster phase.

use chrono::{DateTime, Utc};

use crate::crd::{
    ClusterConditionReason, ClusterConditionType, ClusterMode, ConditionStatus, RavenDBCluster,
};

use super::{IngressFact, PodFact, ResourceFacts, SecretFact, ServiceFact};

enum Outcome {
    Skip,
    True(ClusterConditionReason, String),
    False(ClusterConditionReason, String),
}

#[derive(Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn evaluate(
        &self,
        cluster: &mut RavenDBCluster,
        facts: &ResourceFacts,
        now: DateTime<Utc>,
    ) {
        let storage = self.eval_storage(facts);
        self.apply(cluster, ClusterConditionType::StorageReady, storage, now);

        let certificates = self.eval_certificates(cluster, facts);
        self.apply(cluster, ClusterConditionType::CertificatesReady, certificates, now);

        let license = self.eval_license(cluster, facts);
        self.apply(cluster, ClusterConditionType::LicensesValid, license, now);

        let nodes = self.eval_nodes_healthy(facts);
        self.apply(cluster, ClusterConditionType::NodesHealthy, nodes, now);

        let external_access = self.eval_external_access(cluster, facts);
        self.apply(cluster, ClusterConditionType::ExternalAccessReady, external_access, now);

        let bootstrap = self.eval_bootstrap(facts);
        self.apply(cluster, ClusterConditionType::BootstrapCompleted, bootstrap, now);

        let progressing = self.eval_progressing(facts);
        self.apply(cluster, ClusterConditionType::Progressing, progressing, now);

        // reads the BootstrapCompleted condition written just above
        let degraded = self.eval_degraded(cluster, facts);
        self.apply(cluster, ClusterConditionType::Degraded, degraded, now);

        cluster.set_observed_generation(cluster.metadata.generation);
        cluster.compute_ready(now);
        cluster.update_phase_from_conditions();
    }

    fn apply(
        &self,
        cluster: &mut RavenDBCluster,
        type_: ClusterConditionType,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) {
        match outcome {
            Outcome::Skip => {}
            Outcome::True(reason, message) => {
                cluster.set_condition_true(type_, reason, &message, now)
            }
            Outcome::False(reason, message) => {
                cluster.set_condition_false(type_, reason, &message, now)
            }
        }
    }

    fn eval_storage(&self, facts: &ResourceFacts) -> Outcome {
        if facts.pvcs.is_empty() {
            return Outcome::False(
                ClusterConditionReason::PVCNotBound,
                "waiting for PVCs to be created/bound".to_string(),
            );
        }

        let not_bound: Vec<String> = facts
            .pvcs
            .iter()
            .filter(|p| !p.bound)
            .map(|p| format!("{}/{}", p.namespace, p.name))
            .collect();

        if !not_bound.is_empty() {
            return Outcome::False(
                ClusterConditionReason::PVCNotBound,
                format!("PVCs not bound: {}", not_bound.join(", ")),
            );
        }

        Outcome::True(ClusterConditionReason::Completed, "all PVCs bound".to_string())
    }

    // any-completed wins before any-failed, also across multiple jobs
    fn eval_bootstrap(&self, facts: &ResourceFacts) -> Outcome {
        if facts.jobs.is_empty() {
            return Outcome::False(
                ClusterConditionReason::BootstrapJobRunning,
                "bootstrap job not observed yet".to_string(),
            );
        }

        if facts.jobs.iter().any(|j| j.completed) {
            return Outcome::True(
                ClusterConditionReason::Completed,
                "bootstrap job succeeded".to_string(),
            );
        }

        if facts.jobs.iter().any(|j| j.failed > 0) {
            return Outcome::False(
                ClusterConditionReason::BootstrapFailed,
                "bootstrap job failed".to_string(),
            );
        }

        Outcome::False(
            ClusterConditionReason::BootstrapJobRunning,
            "bootstrap job still running".to_string(),
        )
    }

    fn eval_certificates(&self, cluster: &RavenDBCluster, facts: &ResourceFacts) -> Outcome {
        let expected = expected_secret_names(cluster);
        if expected.is_empty() {
            return Outcome::True(
                ClusterConditionReason::Completed,
                "no certificate secrets required".to_string(),
            );
        }

        let namespace = cluster
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string());
        let missing = missing_secrets(&namespace, &expected, &facts.secrets);

        if !missing.is_empty() {
            return Outcome::False(
                ClusterConditionReason::CertSecretMissing,
                format!("missing certificate secrets: {}", missing.join(", ")),
            );
        }

        Outcome::True(
            ClusterConditionReason::Completed,
            "all certificate secrets present".to_string(),
        )
    }

    fn eval_license(&self, cluster: &RavenDBCluster, facts: &ResourceFacts) -> Outcome {
        let license = cluster.license_secret_ref();
        if license.is_empty() {
            return Outcome::True(
                ClusterConditionReason::Completed,
                "no license ref in spec".to_string(),
            );
        }

        if facts.secrets.iter().any(|s| s.name == license) {
            return Outcome::True(
                ClusterConditionReason::Completed,
                "license secret present".to_string(),
            );
        }

        let namespace = cluster
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string());
        Outcome::False(
            ClusterConditionReason::LicenseSecretMissing,
            format!("missing license secret: {namespace}/{license}"),
        )
    }

    fn eval_nodes_healthy(&self, facts: &ResourceFacts) -> Outcome {
        if facts.pods.is_empty() {
            return Outcome::False(
                ClusterConditionReason::WaitingForPods,
                "waiting for pods to be created/scheduled".to_string(),
            );
        }

        let (pending, failed, unknown, not_ready) = bucketize_pods(&facts.pods);

        if !pending.is_empty() {
            return Outcome::False(
                ClusterConditionReason::WaitingForPods,
                format!("pods pending: {}", pending.join(", ")),
            );
        }

        if !failed.is_empty() || !unknown.is_empty() {
            let mut message = String::new();
            if !failed.is_empty() {
                message.push_str(&format!("pods failed: {}", failed.join(", ")));
            }
            if !unknown.is_empty() {
                if !message.is_empty() {
                    message.push_str("; ");
                }
                message.push_str(&format!("pods unknown: {}", unknown.join(", ")));
            }
            return Outcome::False(ClusterConditionReason::PodsNotReady, message);
        }

        if !not_ready.is_empty() {
            return Outcome::False(
                ClusterConditionReason::PodsNotReady,
                format!("pods not ready: {}", not_ready.join(", ")),
            );
        }

        Outcome::True(
            ClusterConditionReason::Completed,
            "all node pods ready".to_string(),
        )
    }

    fn eval_external_access(&self, cluster: &RavenDBCluster, facts: &ResourceFacts) -> Outcome {
        if !cluster.is_external_access_set() {
            return Outcome::Skip;
        }

        let (ingress_observed, ingress_ready) = ingresses_status(&facts.ingresses);
        if ingress_ready {
            return Outcome::True(
                ClusterConditionReason::Completed,
                "ingress load balancer address allocated".to_string(),
            );
        }
        if ingress_observed {
            return Outcome::False(
                ClusterConditionReason::IngressPendingAddress,
                "waiting for ingress load balancer address".to_string(),
            );
        }

        let (svc_observed, svc_ready) = lb_services_status(&facts.services);
        if svc_ready {
            return Outcome::True(
                ClusterConditionReason::Completed,
                "service load balancer address allocated".to_string(),
            );
        }
        if svc_observed {
            return Outcome::False(
                ClusterConditionReason::LoadBalancerPending,
                "waiting for service load balancer address".to_string(),
            );
        }

        Outcome::False(
            ClusterConditionReason::LoadBalancerPending,
            "no ingress/load balancer service observed".to_string(),
        )
    }

    fn eval_progressing(&self, facts: &ResourceFacts) -> Outcome {
        if facts.stateful_sets.iter().any(|s| s.updating)
            || facts.jobs.iter().any(|j| j.active > 0)
        {
            return Outcome::True(
                ClusterConditionReason::StatefulSetUpdating,
                "rollout in progress".to_string(),
            );
        }

        Outcome::False(
            ClusterConditionReason::Completed,
            "no active rollouts".to_string(),
        )
    }

    fn eval_degraded(&self, cluster: &RavenDBCluster, facts: &ResourceFacts) -> Outcome {
        if let Some(bootstrap) = cluster.get_condition(ClusterConditionType::BootstrapCompleted) {
            if bootstrap.status == ConditionStatus::False
                && bootstrap.reason == ClusterConditionReason::BootstrapFailed.to_string()
            {
                return Outcome::True(
                    ClusterConditionReason::BootstrapFailed,
                    "bootstrap job failed".to_string(),
                );
            }
        }

        const RESTART_THRESHOLD: i32 = 5;
        let offenders: Vec<String> = facts
            .pods
            .iter()
            .filter(|p| p.restarts >= RESTART_THRESHOLD)
            .map(|p| format!("{}/{}", p.namespace, p.name))
            .collect();

        if !offenders.is_empty() {
            return Outcome::True(
                ClusterConditionReason::PodsNotReady,
                format!("high restart count: {}", offenders.join(", ")),
            );
        }

        Outcome::False(
            ClusterConditionReason::Completed,
            "no degradation detected".to_string(),
        )
    }
}

/// Secrets the certificate condition expects to observe, derived from the
/// mode and the configured refs.
fn expected_secret_names(cluster: &RavenDBCluster) -> Vec<String> {
    let mut names = Vec::new();

    match cluster.mode() {
        ClusterMode::LetsEncrypt => {
            if !cluster.client_cert_secret_ref().is_empty() {
                names.push(cluster.client_cert_secret_ref().to_string());
            }
            for node in &cluster.spec.nodes {
                if let Some(cert) = &node.cert_secret_ref {
                    names.push(cert.clone());
                }
            }
        }
        ClusterMode::None => {
            if !cluster.client_cert_secret_ref().is_empty() {
                names.push(cluster.client_cert_secret_ref().to_string());
            }
            if !cluster.cluster_cert_secret_ref().is_empty() {
                names.push(cluster.cluster_cert_secret_ref().to_string());
            }
            if !cluster.ca_cert_secret_ref().is_empty() {
                names.push(cluster.ca_cert_secret_ref().to_string());
            }
        }
    }

    names
}

fn missing_secrets(namespace: &str, expected: &[String], observed: &[SecretFact]) -> Vec<String> {
    let mut missing: Vec<String> = expected
        .iter()
        .filter(|name| !observed.iter().any(|s| &s.name == *name))
        .map(|name| format!("{namespace}/{name}"))
        .collect();
    missing.sort();
    missing
}

#[allow(clippy::type_complexity)]
fn bucketize_pods(pods: &[PodFact]) -> (Vec<String>, Vec<String>, Vec<String>, Vec<String>) {
    let mut pending = Vec::new();
    let mut failed = Vec::new();
    let mut unknown = Vec::new();
    let mut not_ready = Vec::new();

    for pod in pods {
        let name = format!("{}/{}", pod.namespace, pod.name);
        match pod.phase.as_str() {
            "Pending" => pending.push(name),
            "Failed" => failed.push(name),
            "Unknown" => unknown.push(name),
            "Running" if !pod.ready => not_ready.push(name),
            _ => {}
        }
    }

    (pending, failed, unknown, not_ready)
}

fn ingresses_status(ingresses: &[IngressFact]) -> (bool, bool) {
    let observed = !ingresses.is_empty();
    let ready = ingresses.iter().any(|i| i.lb_ready);
    (observed, ready)
}

fn lb_services_status(services: &[ServiceFact]) -> (bool, bool) {
    let mut observed = false;
    for svc in services {
        if svc.type_ != "LoadBalancer" {
            continue;
        }
        observed = true;
        if svc.lb_ready {
            return (true, true);
        }
    }
    (observed, false)
}

//! End-to-end status scenarios: facts in, conditions/phase/message out.

use chrono::{DateTime, Utc};
use kube::core::ObjectMeta;

use ravendb_operator::crd::{
    ClusterConditionType, ClusterMode, ClusterPhase, ConditionStatus, ExternalAccessConfiguration,
    ImagePullPolicy, IngressControllerContext, RavenDBCluster, RavenDBClusterSpec, RavenDBNode,
    StorageSpec, VolumeSpec,
};
use ravendb_operator::health::{
    Evaluator, IngressFact, JobFact, PodFact, PvcFact, ResourceFacts, SecretFact,
};

fn now() -> DateTime<Utc> {
    "2025-06-01T12:00:00Z".parse().unwrap()
}

fn three_node_cluster() -> RavenDBCluster {
    let node = |tag: &str, cert: &str| RavenDBNode {
        tag: tag.to_string(),
        public_server_url: format!("https://{}.e2e.dev:443", tag.to_lowercase()),
        public_server_url_tcp: format!("tcp://{}-tcp.e2e.dev:443", tag.to_lowercase()),
        cert_secret_ref: Some(cert.to_string()),
    };

    RavenDBCluster {
        metadata: ObjectMeta {
            name: Some("e2e".to_string()),
            namespace: Some("ravendb".to_string()),
            uid: Some("uid-e2e".to_string()),
            generation: Some(3),
            ..Default::default()
        },
        spec: RavenDBClusterSpec {
            image: "ravendb/ravendb:6.2.9-ubuntu.22.04-x64".to_string(),
            image_pull_policy: ImagePullPolicy::Always,
            mode: ClusterMode::LetsEncrypt,
            email: Some("ops@e2e.dev".to_string()),
            license_secret_ref: "license".to_string(),
            cluster_cert_secret_ref: None,
            client_cert_secret_ref: "client-cert".to_string(),
            ca_cert_secret_ref: None,
            domain: "e2e.dev".to_string(),
            nodes: vec![
                node("A", "cert-a"),
                node("B", "cert-b"),
                node("C", "cert-c"),
            ],
            env: None,
            external_access_configuration: Some(ExternalAccessConfiguration {
                type_: "ingress-controller".to_string(),
                ingress_controller_external_access: Some(IngressControllerContext {
                    ingress_class_name: "nginx".to_string(),
                    additional_annotations: None,
                }),
                ..Default::default()
            }),
            storage_spec: StorageSpec {
                data: VolumeSpec {
                    size: "5Gi".to_string(),
                    ..Default::default()
                },
                logs: None,
                additional_volumes: None,
            },
        },
        status: None,
    }
}

fn healthy_facts() -> ResourceFacts {
    let pod = |name: &str| PodFact {
        name: name.to_string(),
        namespace: "ravendb".to_string(),
        phase: "Running".to_string(),
        ready: true,
        restarts: 0,
    };
    let pvc = |name: &str| PvcFact {
        name: name.to_string(),
        namespace: "ravendb".to_string(),
        bound: true,
        phase: "Bound".to_string(),
        requested_size: "5Gi".to_string(),
        actual_size: "5Gi".to_string(),
    };
    let secret = |name: &str| SecretFact {
        name: name.to_string(),
        namespace: "ravendb".to_string(),
        type_: "Opaque".to_string(),
    };

    ResourceFacts {
        pods: vec![pod("ravendb-a-0"), pod("ravendb-b-0"), pod("ravendb-c-0")],
        pvcs: vec![
            pvc("ravendb-data-ravendb-a-0"),
            pvc("ravendb-data-ravendb-b-0"),
            pvc("ravendb-data-ravendb-c-0"),
        ],
        jobs: vec![JobFact {
            name: "ravendb-bootstrapper".to_string(),
            namespace: "ravendb".to_string(),
            succeeded: true,
            active: 0,
            failed: 0,
            completed: true,
        }],
        secrets: vec![
            secret("client-cert"),
            secret("cert-a"),
            secret("cert-b"),
            secret("cert-c"),
            secret("license"),
        ],
        ingresses: vec![IngressFact {
            name: "ravendb".to_string(),
            namespace: "ravendb".to_string(),
            lb_ready: true,
        }],
        ..Default::default()
    }
}

#[test]
fn healthy_cluster_is_running_and_ready() {
    let mut cluster = three_node_cluster();
    Evaluator.evaluate(&mut cluster, &healthy_facts(), now());

    for type_ in [
        ClusterConditionType::CertificatesReady,
        ClusterConditionType::LicensesValid,
        ClusterConditionType::StorageReady,
        ClusterConditionType::NodesHealthy,
        ClusterConditionType::ExternalAccessReady,
        ClusterConditionType::BootstrapCompleted,
    ] {
        let condition = cluster.get_condition(type_).unwrap();
        assert_eq!(condition.status, ConditionStatus::True, "{type_}");
        assert_eq!(condition.reason, "Completed", "{type_}");
    }

    let status = cluster.status.as_ref().unwrap();
    assert_eq!(status.phase, ClusterPhase::Running);
    assert_eq!(status.message.as_deref(), Some("Cluster is ready"));
    assert_eq!(status.observed_generation, Some(3));
}

#[test]
fn unbound_pvc_keeps_the_cluster_deploying() {
    let mut facts = healthy_facts();
    facts.pvcs = vec![PvcFact {
        name: "pvc-1".to_string(),
        namespace: "ns".to_string(),
        bound: false,
        phase: "Pending".to_string(),
        ..Default::default()
    }];

    let mut cluster = three_node_cluster();
    Evaluator.evaluate(&mut cluster, &facts, now());

    let ready = cluster.get_condition(ClusterConditionType::Ready).unwrap();
    assert_eq!(ready.status, ConditionStatus::False);
    assert_eq!(ready.reason, "StorageReady");
    assert_eq!(ready.message, "PVCNotBound: PVCs not bound: ns/pvc-1");
    assert_eq!(cluster.status.as_ref().unwrap().phase, ClusterPhase::Deploying);
}

#[test]
fn failed_bootstrap_is_an_error_phase() {
    let mut facts = healthy_facts();
    facts.jobs = vec![JobFact {
        name: "ravendb-bootstrapper".to_string(),
        namespace: "ravendb".to_string(),
        succeeded: false,
        active: 0,
        failed: 3,
        completed: false,
    }];

    let mut cluster = three_node_cluster();
    Evaluator.evaluate(&mut cluster, &facts, now());

    assert_eq!(
        cluster
            .get_condition(ClusterConditionType::BootstrapCompleted)
            .unwrap()
            .reason,
        "BootstrapFailed"
    );
    assert!(cluster.is_condition_true(ClusterConditionType::Degraded));
    assert_eq!(cluster.status.as_ref().unwrap().phase, ClusterPhase::Error);
}

#[test]
fn status_does_not_oscillate_under_fixed_inputs() {
    let facts = healthy_facts();
    let mut cluster = three_node_cluster();

    Evaluator.evaluate(&mut cluster, &facts, now());
    let first = cluster.status.clone();

    for _ in 0..3 {
        Evaluator.evaluate(&mut cluster, &facts, now());
        assert_eq!(cluster.status, first);
    }
}

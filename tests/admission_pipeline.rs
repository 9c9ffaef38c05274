//! Admission pipeline end-to-end: the default validator chain against
//! realistic create and update requests.

use std::sync::Arc;

use kube::core::ObjectMeta;

use ravendb_operator::crd::{
    ClusterMode, ImagePullPolicy, RavenDBCluster, RavenDBClusterSpec, RavenDBNode, StorageSpec,
    VolumeSpec,
};
use ravendb_operator::webhook::validator::{MapSecretSource, StaticVacSource};
use ravendb_operator::webhook::ValidatorPipeline;

fn cluster(name: &str, image: &str) -> RavenDBCluster {
    let node = |tag: &str, cert: &str| RavenDBNode {
        tag: tag.to_string(),
        public_server_url: format!("https://{}.example.com:443", tag.to_lowercase()),
        public_server_url_tcp: format!("tcp://{}-tcp.example.com:443", tag.to_lowercase()),
        cert_secret_ref: Some(cert.to_string()),
    };

    RavenDBCluster {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("ravendb".to_string()),
            uid: Some(format!("uid-{name}")),
            generation: Some(1),
            ..Default::default()
        },
        spec: RavenDBClusterSpec {
            image: image.to_string(),
            image_pull_policy: ImagePullPolicy::Always,
            mode: ClusterMode::LetsEncrypt,
            email: Some("ops@example.com".to_string()),
            license_secret_ref: "license".to_string(),
            cluster_cert_secret_ref: None,
            client_cert_secret_ref: "client-cert".to_string(),
            ca_cert_secret_ref: None,
            domain: "example.com".to_string(),
            nodes: vec![node("A", "cert-a"), node("B", "cert-b")],
            env: None,
            external_access_configuration: None,
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

fn pipeline() -> ValidatorPipeline {
    let secrets = MapSecretSource::new()
        .with_secret("ravendb", "license", &["license.json"])
        .with_secret("ravendb", "cert-a", &["a.pfx"])
        .with_secret("ravendb", "cert-b", &["b.pfx"]);

    ValidatorPipeline::with_defaults(Arc::new(secrets), Arc::new(StaticVacSource::new(&[])))
}

#[tokio::test]
async fn valid_cluster_passes_the_whole_chain() {
    let cluster = cluster("ok", "ravendb/ravendb:7.1.3-ubuntu.22.04-x64");
    let verdict = pipeline().run_create(&cluster).await;
    assert!(verdict.is_ok(), "{verdict:?}");
}

#[tokio::test]
async fn image_downgrade_is_rejected_on_update() {
    let old = cluster("old", "ravendb/ravendb:7.1.3-ubuntu.22.04-x64");
    let new = cluster("new", "ravendb/ravendb:7.1.2-ubuntu.22.04-x64");

    let err = pipeline().run_update(&old, &new).await.unwrap_err();
    assert!(err.to_string().contains("downgrade is not allowed"));
}

#[tokio::test]
async fn errors_aggregate_across_validators() {
    let mut bad = cluster("bad", "ravendb/ravendb:latest");
    bad.spec.email = None;
    bad.spec.nodes[1].tag = "A".to_string();

    let err = pipeline().run_create(&bad).await.unwrap_err();
    let message = err.to_string();

    assert!(message.contains("[image-validator]"));
    assert!(message.contains("floating tag"));
    assert!(message.contains("[general-validator]"));
    assert!(message.contains("spec.email is required when mode is LetsEncrypt"));
    assert!(message.contains("[node-validator]"));
    assert!(message.contains("duplicate tag 'A'"));
}

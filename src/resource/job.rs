//! Desired one-shot bootstrap job. Runs once per cluster to join the
//! individual nodes into one logical RavenDB cluster.

use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{PodSpec, PodTemplateSpec, Volume, VolumeMount};
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::common::{self, env};
use crate::crd::RavenDBCluster;
use crate::error::Result;

use super::container::build_bootstrapper_container;
use super::volume::{build_config_map_volume, build_secret_volume, build_volume_mount};

pub fn build_job(cluster: &RavenDBCluster) -> Result<Job> {
    let labels = common::cluster_labels(cluster);

    Ok(Job {
        metadata: ObjectMeta {
            name: Some(common::BOOTSTRAPPER_JOB.to_string()),
            namespace: cluster.namespace(),
            labels: Some(labels.clone()),
            owner_references: Some(vec![common::owner_reference(cluster)]),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(0),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some("OnFailure".to_string()),
                    service_account_name: Some(common::NODE_SERVICE_ACCOUNT.to_string()),
                    volumes: Some(build_volumes(cluster)),
                    containers: vec![build_bootstrapper_container(
                        cluster.image(),
                        build_mounts(cluster),
                        env::build_bootstrapper_env_vars(cluster),
                    )],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    })
}

fn build_volumes(cluster: &RavenDBCluster) -> Vec<Volume> {
    let mut volumes = vec![
        build_secret_volume(
            common::CLIENT_CERT_VOLUME_NAME,
            cluster.client_cert_secret_ref(),
        ),
        build_secret_volume(common::CERT_VOLUME_NAME, cluster.server_cert_secret_name()),
    ];

    if !cluster.ca_cert_secret_ref().is_empty() {
        volumes.push(build_secret_volume(
            common::CA_CERT_VOLUME_NAME,
            cluster.ca_cert_secret_ref(),
        ));
    }

    let mut hook_keys = BTreeMap::new();
    hook_keys.insert(
        common::INIT_CLUSTER_HOOK_KEY.to_string(),
        common::INIT_CLUSTER_HOOK_KEY.to_string(),
    );
    hook_keys.insert(
        common::CHECK_NODES_HOOK_KEY.to_string(),
        common::CHECK_NODES_HOOK_KEY.to_string(),
    );
    volumes.push(build_config_map_volume(
        common::BOOTSTRAP_HOOK_VOLUME_NAME,
        common::BOOTSTRAP_HOOK_CONFIGMAP,
        &hook_keys,
        common::CONFIGMAP_EXEC_MODE,
    ));

    volumes
}

fn build_mounts(cluster: &RavenDBCluster) -> Vec<VolumeMount> {
    let mut mounts = Vec::new();

    let mut client = build_volume_mount(
        common::CLIENT_CERT_VOLUME_NAME,
        common::CLIENT_CERT_MOUNT_PATH,
    );
    client.read_only = Some(true);
    mounts.push(client);

    let mut server = build_volume_mount(common::CERT_VOLUME_NAME, common::CERT_MOUNT_PATH);
    server.read_only = Some(true);
    mounts.push(server);

    if !cluster.ca_cert_secret_ref().is_empty() {
        let mut ca = build_volume_mount(common::CA_CERT_VOLUME_NAME, common::CA_CERT_MOUNT_PATH);
        ca.read_only = Some(true);
        mounts.push(ca);
    }

    let mut init = build_volume_mount(
        common::BOOTSTRAP_HOOK_VOLUME_NAME,
        common::INIT_CLUSTER_SCRIPT_PATH,
    );
    init.sub_path = Some(common::INIT_CLUSTER_HOOK_KEY.to_string());
    init.read_only = Some(true);
    mounts.push(init);

    let mut check = build_volume_mount(
        common::BOOTSTRAP_HOOK_VOLUME_NAME,
        common::CHECK_NODES_SCRIPT_PATH,
    );
    check.sub_path = Some(common::CHECK_NODES_HOOK_KEY.to_string());
    check.read_only = Some(true);
    mounts.push(check);

    mounts
}

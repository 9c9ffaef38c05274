//! Desired per-node statefulset.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    EnvVar, PersistentVolumeClaim, PodSpec, PodTemplateSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::common::{self, env};
use crate::crd::{ClusterMode, RavenDBCluster, RavenDBNode};
use crate::error::{Error, Result};

use super::container::{build_ports, build_ravendb_container};
use super::volume::{
    build_additional_volume_mounts, build_additional_volumes, build_claim_template,
    build_config_map_volume, build_secret_volume, build_volume_mount,
};

pub fn build_statefulset(cluster: &RavenDBCluster, node: &RavenDBNode) -> Result<StatefulSet> {
    let name = common::statefulset_name(&node.tag);
    let labels = common::node_labels(cluster, &node.tag);
    let selector = selector_labels(node);

    let env_vars = build_env_vars(cluster, node);
    let volumes = build_volumes(cluster, node)?;
    let mounts = build_volume_mounts(cluster);
    let claims = build_volume_claims(cluster);

    let container = build_ravendb_container(
        cluster.image(),
        env_vars,
        build_ports(),
        mounts,
        cluster.spec.image_pull_policy,
    );

    Ok(StatefulSet {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: cluster.namespace(),
            labels: Some(labels.clone()),
            annotations: Some(build_annotations()),
            owner_references: Some(vec![common::owner_reference(cluster)]),
            ..Default::default()
        },
        spec: Some(StatefulSetSpec {
            service_name: common::APP.to_string(),
            replicas: Some(common::NUM_OF_REPLICAS),
            selector: LabelSelector {
                match_labels: Some(selector),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: Some(volumes),
                    ..Default::default()
                }),
            },
            volume_claim_templates: Some(claims),
            ..Default::default()
        }),
        status: None,
    })
}

fn selector_labels(node: &RavenDBNode) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(common::LABEL_NODE_TAG.to_string(), node.tag.clone());
    labels
}

fn build_annotations() -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    annotations.insert(
        common::INGRESS_SSL_PASSTHROUGH_ANNOTATION.to_string(),
        "true".to_string(),
    );
    annotations
}

fn build_env_vars(cluster: &RavenDBCluster, node: &RavenDBNode) -> Vec<EnvVar> {
    let mut vars = env::build_common_env_vars(cluster, node);
    vars.extend(env::build_secure_env_vars(cluster));
    vars.extend(env::build_additional_env_vars(cluster));
    vars
}

fn server_cert_secret(cluster: &RavenDBCluster, node: &RavenDBNode) -> Result<String> {
    let name = match cluster.mode() {
        ClusterMode::LetsEncrypt => node.cert_secret_ref.clone().unwrap_or_default(),
        ClusterMode::None => cluster.cluster_cert_secret_ref().to_string(),
    };
    if name.is_empty() {
        return Err(Error::ConfigError(format!(
            "no server certificate secret resolvable for node {}",
            node.tag
        )));
    }
    Ok(name)
}

fn build_volumes(cluster: &RavenDBCluster, node: &RavenDBNode) -> Result<Vec<Volume>> {
    let cert_secret = server_cert_secret(cluster, node)?;

    let mut hook_keys = BTreeMap::new();
    hook_keys.insert(
        common::UPDATE_CERT_HOOK_KEY.to_string(),
        common::UPDATE_CERT_HOOK_KEY.to_string(),
    );
    hook_keys.insert(
        common::GET_CERT_HOOK_KEY.to_string(),
        common::GET_CERT_HOOK_KEY.to_string(),
    );

    let mut volumes = vec![
        build_secret_volume(common::CERT_VOLUME_NAME, &cert_secret),
        build_secret_volume(common::LICENSE_VOLUME_NAME, cluster.license_secret_ref()),
        build_config_map_volume(
            common::CERT_HOOK_VOLUME_NAME,
            common::CERT_HOOK_CONFIGMAP,
            &hook_keys,
            common::CONFIGMAP_EXEC_MODE,
        ),
    ];

    if let Some(additional) = &cluster.spec.storage_spec.additional_volumes {
        volumes.extend(build_additional_volumes(additional));
    }

    Ok(volumes)
}

fn build_volume_mounts(cluster: &RavenDBCluster) -> Vec<VolumeMount> {
    let mut mounts = vec![
        build_volume_mount(common::DATA_VOLUME_NAME, common::DATA_MOUNT_PATH),
        build_volume_mount(common::CERT_VOLUME_NAME, common::CERT_MOUNT_PATH),
        build_volume_mount(common::LICENSE_VOLUME_NAME, common::LICENSE_MOUNT_PATH),
    ];

    let mut update_hook = build_volume_mount(
        common::CERT_HOOK_VOLUME_NAME,
        common::UPDATE_CERT_SCRIPT_PATH,
    );
    update_hook.sub_path = Some(common::UPDATE_CERT_HOOK_KEY.to_string());
    update_hook.read_only = Some(true);

    let mut get_hook =
        build_volume_mount(common::CERT_HOOK_VOLUME_NAME, common::GET_CERT_SCRIPT_PATH);
    get_hook.sub_path = Some(common::GET_CERT_HOOK_KEY.to_string());
    get_hook.read_only = Some(true);

    mounts.push(update_hook);
    mounts.push(get_hook);

    let storage = &cluster.spec.storage_spec;
    if let Some(logs) = &storage.logs {
        if let Some(ravendb) = &logs.ravendb {
            mounts.push(build_volume_mount(
                common::LOGS_VOLUME_NAME,
                ravendb.path.as_deref().unwrap_or(common::LOGS_MOUNT_PATH),
            ));
        }
        if let Some(audit) = &logs.audit {
            mounts.push(build_volume_mount(
                common::AUDIT_VOLUME_NAME,
                audit.path.as_deref().unwrap_or(common::AUDIT_MOUNT_PATH),
            ));
        }
    }

    if let Some(additional) = &storage.additional_volumes {
        mounts.extend(build_additional_volume_mounts(additional));
    }

    mounts
}

fn build_volume_claims(cluster: &RavenDBCluster) -> Vec<PersistentVolumeClaim> {
    let storage = &cluster.spec.storage_spec;
    let mut claims = vec![build_claim_template(common::DATA_VOLUME_NAME, &storage.data)];

    if let Some(logs) = &storage.logs {
        if let Some(ravendb) = &logs.ravendb {
            claims.push(build_claim_template(common::LOGS_VOLUME_NAME, &ravendb.volume));
        }
        if let Some(audit) = &logs.audit {
            claims.push(build_claim_template(common::AUDIT_VOLUME_NAME, &audit.volume));
        }
    }

    claims
}

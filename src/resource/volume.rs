//! Low-level volume, mount and claim-template helpers shared by the
//! statefulset and job builders.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, KeyToPath, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    SecretVolumeSource, Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::core::ObjectMeta;

use crate::crd::{AdditionalVolume, VolumeSpec};

pub fn build_claim_template(name: &str, spec: &VolumeSpec) -> PersistentVolumeClaim {
    let access_modes = spec
        .access_modes
        .clone()
        .unwrap_or_else(|| vec!["ReadWriteOnce".to_string()]);

    let mut requests = BTreeMap::new();
    requests.insert("storage".to_string(), Quantity(spec.size.clone()));

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(access_modes),
            storage_class_name: spec.storage_class_name.clone(),
            volume_attributes_class_name: spec.volume_attributes_class_name.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(requests),
                ..Default::default()
            }),
            ..Default::default()
        }),
        status: None,
    }
}

pub fn build_secret_volume(name: &str, secret_name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Configmap volume with its items sorted by key. The ordering matters:
/// unsorted items make consecutive builds differ, which the apply layer
/// reports as a change and the kubelet answers with container restarts.
pub fn build_config_map_volume(
    name: &str,
    config_map_name: &str,
    key_to_path: &BTreeMap<String, String>,
    mode: i32,
) -> Volume {
    let items: Vec<KeyToPath> = key_to_path
        .iter()
        .map(|(key, path)| KeyToPath {
            key: key.clone(),
            path: path.clone(),
            mode: None,
        })
        .collect();

    Volume {
        name: name.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map_name.to_string(),
            items: Some(items),
            default_mode: Some(mode),
            optional: None,
        }),
        ..Default::default()
    }
}

pub fn build_volume_mount(name: &str, mount_path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: mount_path.to_string(),
        ..Default::default()
    }
}

pub fn build_additional_volumes(additional: &[AdditionalVolume]) -> Vec<Volume> {
    additional
        .iter()
        .map(|av| Volume {
            name: av.name.clone(),
            config_map: av.volume_source.config_map.clone(),
            secret: av.volume_source.secret.clone(),
            persistent_volume_claim: av.volume_source.persistent_volume_claim.clone(),
            ..Default::default()
        })
        .collect()
}

pub fn build_additional_volume_mounts(additional: &[AdditionalVolume]) -> Vec<VolumeMount> {
    additional
        .iter()
        .map(|av| {
            let mut mount = build_volume_mount(&av.name, &av.mount_path);
            mount.sub_path = av.sub_path.clone();
            mount
        })
        .collect()
}

//! Storage layout checks: absolute paths, additional-volume uniqueness and
//! sources, and VolumeAttributesClass references.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::crd::{AdditionalVolume, RavenDBCluster, VolumeSpec};

use super::{ClusterValidator, VolumeAttributesClassSource};

pub struct StorageValidator {
    vacs: Arc<dyn VolumeAttributesClassSource>,
}

impl StorageValidator {
    pub fn new(vacs: Arc<dyn VolumeAttributesClassSource>) -> Self {
        Self { vacs }
    }

    pub async fn validate_volume_spec(&self, field: &str, volume: &VolumeSpec) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(vac) = &volume.volume_attributes_class_name {
            let exists = self.vacs.exists(vac).await.unwrap_or(false);
            if !exists {
                errors.push(format!(
                    "{field}.volumeAttributesClassName '{vac}' does not reference a valid VolumeAttributesClass"
                ));
            }
        }

        errors
    }
}

#[async_trait]
impl ClusterValidator for StorageValidator {
    fn name(&self) -> &'static str {
        "storage-validator"
    }

    async fn validate_create(&self, cluster: &RavenDBCluster) -> Vec<String> {
        let storage = &cluster.spec.storage_spec;
        let mut errors = Vec::new();

        errors.extend(self.validate_volume_spec("spec.storage.data", &storage.data).await);

        if let Some(logs) = &storage.logs {
            if let Some(ravendb) = &logs.ravendb {
                errors.extend(
                    self.validate_volume_spec("spec.storage.logs.ravendb", &ravendb.volume)
                        .await,
                );
                errors.extend(validate_absolute_path(
                    "spec.storage.logs.ravendb.path",
                    ravendb.path.as_deref(),
                ));
            }
            if let Some(audit) = &logs.audit {
                errors.extend(
                    self.validate_volume_spec("spec.storage.logs.audit", &audit.volume)
                        .await,
                );
                errors.extend(validate_absolute_path(
                    "spec.storage.logs.audit.path",
                    audit.path.as_deref(),
                ));
            }
        }

        if let Some(additional) = &storage.additional_volumes {
            errors.extend(validate_additional_volumes(
                "spec.storage.additionalVolumes",
                additional,
            ));
        }

        errors
    }
}

pub fn validate_absolute_path(field: &str, path: Option<&str>) -> Vec<String> {
    match path {
        Some(p) if !p.starts_with('/') => vec![format!("{field} must be an absolute path")],
        _ => Vec::new(),
    }
}

pub fn validate_additional_volumes(field: &str, volumes: &[AdditionalVolume]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen: HashMap<&str, ()> = HashMap::new();

    for (i, volume) in volumes.iter().enumerate() {
        let prefix = format!("{field}[{i}]");

        if seen.insert(&volume.name, ()).is_some() {
            errors.push(format!(
                "{prefix}.name must be unique: '{}' is used more than once",
                volume.name
            ));
        }

        errors.extend(validate_absolute_path(
            &format!("{prefix}.mountPath"),
            Some(&volume.mount_path),
        ));

        if let Some(sub_path) = &volume.sub_path {
            if sub_path.contains('/') || sub_path.contains('\\') {
                errors.push(format!(
                    "{prefix}.subPath must be a file name only (no path separators)"
                ));
            }
        }

        if volume.volume_source.set_kinds().len() != 1 {
            errors.push(format!(
                "{prefix}.volumeSource must have exactly one source (configMap, secret, or persistentVolumeClaim)"
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::super::StaticVacSource;
    use super::*;
    use crate::crd::test_fixtures::base_cluster;
    use crate::crd::{AdditionalVolumeSource, LogSettings, LogsSpec};
    use k8s_openapi::api::core::v1::{ConfigMapVolumeSource, SecretVolumeSource};

    fn validator(vacs: &[&str]) -> StorageValidator {
        StorageValidator::new(Arc::new(StaticVacSource::new(vacs)))
    }

    fn config_map_source() -> AdditionalVolumeSource {
        AdditionalVolumeSource {
            config_map: Some(ConfigMapVolumeSource::default()),
            ..Default::default()
        }
    }

    fn volume(name: &str, mount: &str, sub_path: Option<&str>) -> AdditionalVolume {
        AdditionalVolume {
            name: name.to_string(),
            mount_path: mount.to_string(),
            sub_path: sub_path.map(String::from),
            volume_source: config_map_source(),
        }
    }

    #[tokio::test]
    async fn accepts_valid_vac_and_rejects_unknown() {
        let v = validator(&["standard-attrs"]);

        let mut spec = VolumeSpec {
            size: "5Gi".to_string(),
            storage_class_name: Some("standard".to_string()),
            ..Default::default()
        };
        assert!(v.validate_volume_spec("spec.storage.data", &spec).await.is_empty());

        spec.volume_attributes_class_name = Some("standard-attrs".to_string());
        assert!(v.validate_volume_spec("spec.storage.data", &spec).await.is_empty());

        spec.volume_attributes_class_name = Some("non-existent".to_string());
        let errors = v.validate_volume_spec("spec.storage.data", &spec).await;
        assert!(errors[0].contains(
            "volumeAttributesClassName 'non-existent' does not reference a valid VolumeAttributesClass"
        ));
    }

    #[test]
    fn rejects_duplicate_names() {
        let volumes = vec![
            volume("data", "/mnt/a", None),
            volume("data", "/mnt/b", None),
        ];
        let errors = validate_additional_volumes("spec.storage.additionalVolumes", &volumes);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("name must be unique"));
    }

    #[test]
    fn rejects_relative_mount_path() {
        let volumes = vec![volume("a", "mnt/relative", None)];
        let errors = validate_additional_volumes("spec.storage.additionalVolumes", &volumes);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("must be an absolute path"));
    }

    #[test]
    fn rejects_sub_path_with_separators() {
        let volumes = vec![volume("a", "/mnt/data", Some("dir/file.txt"))];
        let errors = validate_additional_volumes("spec.storage.additionalVolumes", &volumes);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("subPath must be a file name only"));
    }

    #[test]
    fn rejects_zero_or_multiple_sources() {
        let mut none = volume("a", "/mnt/data", None);
        none.volume_source = AdditionalVolumeSource::default();
        let errors = validate_additional_volumes("spec.storage.additionalVolumes", &[none]);
        assert!(errors[0].contains("must have exactly one source"));

        let mut both = volume("a", "/mnt/data", None);
        both.volume_source.secret = Some(SecretVolumeSource::default());
        let errors = validate_additional_volumes("spec.storage.additionalVolumes", &[both]);
        assert!(errors[0].contains("must have exactly one source"));
    }

    #[test]
    fn accepts_fully_valid_volume() {
        let mut valid = volume("data", "/mnt/data", Some("logs.txt"));
        valid.volume_source = AdditionalVolumeSource {
            secret: Some(SecretVolumeSource::default()),
            ..Default::default()
        };
        assert!(validate_additional_volumes("spec.storage.additionalVolumes", &[valid]).is_empty());
    }

    #[tokio::test]
    async fn log_paths_must_be_absolute() {
        let v = validator(&[]);
        let mut cluster = base_cluster("storage-logs");
        cluster.spec.storage_spec.logs = Some(LogsSpec {
            ravendb: Some(LogSettings {
                volume: VolumeSpec {
                    size: "1Gi".to_string(),
                    ..Default::default()
                },
                path: Some("relative/logs".to_string()),
            }),
            audit: None,
        });

        let errors = v.validate_create(&cluster).await;
        assert!(errors
            .iter()
            .any(|e| e.contains("spec.storage.logs.ravendb.path must be an absolute path")));
    }
}

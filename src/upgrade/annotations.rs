//! Upgrade timing, plus the statefulset annotation that signals an
//! in-flight image transition to the statefulset actor.

use std::time::Duration;

use k8s_openapi::api::apps::v1::StatefulSet;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};

use crate::common;
use crate::crd::RavenDBCluster;
use crate::error::Result;

#[derive(Clone, Copy, Debug)]
pub struct Timing {
    pub pre_max_wait: Duration,
    pub post_max_wait: Duration,
    pub ping_interval: Duration,
    pub db_interval: Duration,
    pub grace_after_ready: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            // covers 2m node_alive / 2m connectivity / 5m DB
            pre_max_wait: Duration::from_secs(5 * 60),
            // typical small-cluster post checks
            post_max_wait: Duration::from_secs(12 * 60),
            ping_interval: Duration::from_secs(5),
            db_interval: Duration::from_secs(10),
            grace_after_ready: Duration::from_secs(10),
        }
    }
}

/// Duration overrides from CR annotations; malformed or non-positive values
/// are ignored.
pub fn read_timing_from_annotations(cluster: &RavenDBCluster, mut timing: Timing) -> Timing {
    let annotations = cluster.annotations();

    let mut parse = |key: &str, dst: &mut Duration| {
        if let Some(value) = annotations.get(key) {
            if let Ok(d) = humantime::parse_duration(value.trim()) {
                if !d.is_zero() {
                    *dst = d;
                }
            }
        }
    };

    parse(common::UPGRADE_PRE_WAIT_ANNOTATION, &mut timing.pre_max_wait);
    parse(common::UPGRADE_POST_WAIT_ANNOTATION, &mut timing.post_max_wait);
    parse(common::UPGRADE_PING_INTERVAL_ANNOTATION, &mut timing.ping_interval);
    parse(common::UPGRADE_DB_INTERVAL_ANNOTATION, &mut timing.db_interval);

    timing
}

pub(super) fn current_sts_image(sts: &StatefulSet) -> String {
    sts.spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .and_then(|p| p.containers.first())
        .and_then(|c| c.image.clone())
        .unwrap_or_default()
}

pub(super) fn has_upgrade_annotation(sts: &StatefulSet) -> bool {
    sts.annotations()
        .contains_key(common::UPGRADE_IMAGE_ANNOTATION)
}

/// Stamp (non-empty `value`) or clear (empty `value`) the upgrade-image
/// annotation on the node's live statefulset via a merge patch. A missing
/// statefulset is fine; there is nothing to mark.
pub(super) async fn set_upgrade_annotation(
    client: &Client,
    cluster: &RavenDBCluster,
    tag: &str,
    value: &str,
) -> Result<()> {
    let namespace = cluster.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<StatefulSet> = Api::namespaced(client.clone(), &namespace);
    let name = common::statefulset_name(tag);

    if api.get_opt(&name).await?.is_none() {
        return Ok(());
    }

    let annotation_value = if value.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::Value::String(value.to_string())
    };
    let patch = serde_json::json!({
        "metadata": {
            "annotations": { common::UPGRADE_IMAGE_ANNOTATION: annotation_value }
        }
    });

    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

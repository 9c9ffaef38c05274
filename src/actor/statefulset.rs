//! Per-node statefulset actor.
//!
//! This actor owns the image freeze policy: when a live statefulset exists
//! and does not carry the upgrade-image annotation, the desired image is
//! overwritten with the live one, so spec image edits never roll pods on
//! their own. The rolling upgrader is the only component that stamps the
//! annotation and thereby lets a new image through, one node at a time.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::api::Api;
use kube::{Client, ResourceExt};

use crate::common;
use crate::crd::{RavenDBCluster, RavenDBNode};
use crate::error::{Error, Result};
use crate::resource::build_statefulset;

use super::{apply_ssa, PerNodeActor};

pub struct StatefulSetActor;

#[async_trait]
impl PerNodeActor for StatefulSetActor {
    fn name(&self) -> &'static str {
        "StatefulSetActor"
    }

    async fn act(
        &self,
        client: &Client,
        cluster: &RavenDBCluster,
        node: &RavenDBNode,
    ) -> Result<bool> {
        let namespace = cluster.namespace().unwrap_or_else(|| "default".to_string());
        let api: Api<StatefulSet> = Api::namespaced(client.clone(), &namespace);

        let mut desired = build_statefulset(cluster, node)
            .map_err(|e| Error::ActorError(self.name(), e.to_string()))?;

        if let Some(live) = api.get_opt(&common::statefulset_name(&node.tag)).await? {
            freeze_image(&mut desired, &live);
            merge_live_annotations(&mut desired, &live);
        }

        apply_ssa(&api, &desired, "ravendb-operator/statefulset")
            .await
            .map_err(|e| Error::ActorError(self.name(), e.to_string()))
    }
}

/// Keep the live image unless the upgrader marked this node for an upgrade.
fn freeze_image(desired: &mut StatefulSet, live: &StatefulSet) {
    if live
        .annotations()
        .contains_key(common::UPGRADE_IMAGE_ANNOTATION)
    {
        return;
    }

    let live_image = live
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .and_then(|p| p.containers.first())
        .and_then(|c| c.image.clone());

    let desired_container = desired
        .spec
        .as_mut()
        .and_then(|s| s.template.spec.as_mut())
        .and_then(|p| p.containers.first_mut());

    if let (Some(image), Some(container)) = (live_image, desired_container) {
        container.image = Some(image);
    }
}

/// Carry live-only annotations (the upgrade marker in particular) forward so
/// the apply does not strip them.
fn merge_live_annotations(desired: &mut StatefulSet, live: &StatefulSet) {
    let annotations = desired
        .metadata
        .annotations
        .get_or_insert_with(Default::default);
    for (k, v) in live.annotations() {
        annotations
            .entry(k.clone())
            .or_insert_with(|| v.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::base_cluster_lets_encrypt;
    use crate::resource::build_statefulset;
    use std::collections::BTreeMap;

    fn desired_and_live(live_image: &str, marked: bool) -> (StatefulSet, StatefulSet) {
        let cluster = base_cluster_lets_encrypt("freeze");
        let desired = build_statefulset(&cluster, &cluster.spec.nodes[0]).unwrap();

        let mut live = desired.clone();
        live.spec
            .as_mut()
            .unwrap()
            .template
            .spec
            .as_mut()
            .unwrap()
            .containers[0]
            .image = Some(live_image.to_string());
        if marked {
            let mut annotations = BTreeMap::new();
            annotations.insert(
                common::UPGRADE_IMAGE_ANNOTATION.to_string(),
                "ravendb/ravendb:7.1.3-ubuntu.22.04-x64".to_string(),
            );
            live.metadata.annotations = Some(annotations);
        }
        (desired, live)
    }

    fn image_of(sts: &StatefulSet) -> &str {
        sts.spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .containers[0]
            .image
            .as_deref()
            .unwrap()
    }

    #[test]
    fn unmarked_live_statefulset_freezes_the_image() {
        let (mut desired, live) = desired_and_live("ravendb/ravendb:6.2.0-ubuntu.22.04-x64", false);
        freeze_image(&mut desired, &live);
        assert_eq!(image_of(&desired), "ravendb/ravendb:6.2.0-ubuntu.22.04-x64");
    }

    #[test]
    fn upgrade_marker_lets_the_new_image_through() {
        let (mut desired, live) = desired_and_live("ravendb/ravendb:6.2.0-ubuntu.22.04-x64", true);
        freeze_image(&mut desired, &live);
        assert_eq!(image_of(&desired), "ravendb/ravendb:6.2.9-ubuntu.22.04-x64");
    }

    #[test]
    fn live_annotations_survive_the_apply() {
        let (mut desired, mut live) = desired_and_live("img", false);
        live.metadata
            .annotations
            .get_or_insert_with(Default::default)
            .insert("third-party".to_string(), "kept".to_string());

        merge_live_annotations(&mut desired, &live);
        assert_eq!(
            desired
                .metadata
                .annotations
                .unwrap()
                .get("third-party")
                .map(String::as_str),
            Some("kept")
        );
    }
}

//! Desired per-node service fronting a single statefulset pod.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::common;
use crate::crd::{RavenDBCluster, RavenDBNode};
use crate::error::Result;

pub fn build_service(cluster: &RavenDBCluster, node: &RavenDBNode) -> Result<Service> {
    let name = common::statefulset_name(&node.tag);

    Ok(Service {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: cluster.namespace(),
            labels: Some(common::node_labels(cluster, &node.tag)),
            owner_references: Some(vec![common::owner_reference(cluster)]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector(node)),
            ports: Some(build_service_ports()),
            ..Default::default()
        }),
        status: None,
    })
}

fn selector(node: &RavenDBNode) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(common::LABEL_NODE_TAG.to_string(), node.tag.clone());
    labels
}

fn build_service_ports() -> Vec<ServicePort> {
    vec![
        ServicePort {
            name: Some(common::HTTPS_PORT_NAME.to_string()),
            port: common::INTERNAL_HTTPS_PORT,
            ..Default::default()
        },
        ServicePort {
            name: Some(common::TCP_PORT_NAME.to_string()),
            port: common::INTERNAL_TCP_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        },
    ]
}

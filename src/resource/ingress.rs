//! Desired cluster ingress: one https and one tcp host per node, with TLS
//! passthrough so the server terminates its own certificates.

use std::collections::BTreeMap;

use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::common;
use crate::crd::RavenDBCluster;
use crate::error::Result;

pub fn build_ingress(cluster: &RavenDBCluster) -> Result<Ingress> {
    Ok(Ingress {
        metadata: ObjectMeta {
            name: Some(common::APP.to_string()),
            namespace: cluster.namespace(),
            labels: Some(common::cluster_labels(cluster)),
            annotations: Some(build_annotations(cluster)),
            owner_references: Some(vec![common::owner_reference(cluster)]),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: Some(cluster.ingress_class_name().to_string()),
            rules: Some(build_rules(cluster)),
            ..Default::default()
        }),
        status: None,
    })
}

fn build_annotations(cluster: &RavenDBCluster) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    annotations.insert(
        common::INGRESS_SSL_PASSTHROUGH_ANNOTATION.to_string(),
        "true".to_string(),
    );

    if cluster.ingress_class_name() == "nginx" {
        annotations.insert(
            common::NGINX_SSL_PASSTHROUGH_ANNOTATION.to_string(),
            "true".to_string(),
        );
    }

    // user-supplied annotations win on key collisions
    for (k, v) in cluster.ingress_annotations() {
        annotations.insert(k, v);
    }

    annotations
}

fn build_rules(cluster: &RavenDBCluster) -> Vec<IngressRule> {
    let mut rules = Vec::with_capacity(cluster.spec.nodes.len() * 2);
    for node in &cluster.spec.nodes {
        rules.push(build_rule(
            &format!("{}.{}", node.tag.to_lowercase(), cluster.domain()),
            &node.tag,
            common::INTERNAL_HTTPS_PORT,
        ));
        rules.push(build_rule(
            &format!("{}-tcp.{}", node.tag.to_lowercase(), cluster.domain()),
            &node.tag,
            common::INTERNAL_TCP_PORT,
        ));
    }
    rules
}

fn build_rule(host: &str, tag: &str, port: i32) -> IngressRule {
    IngressRule {
        host: Some(host.to_string()),
        http: Some(HTTPIngressRuleValue {
            paths: vec![HTTPIngressPath {
                path: Some("/".to_string()),
                path_type: "Prefix".to_string(),
                backend: IngressBackend {
                    service: Some(IngressServiceBackend {
                        name: common::statefulset_name(tag),
                        port: Some(ServiceBackendPort {
                            number: Some(port),
                            name: None,
                        }),
                    }),
                    resource: None,
                },
            }],
        }),
    }
}

//! Container templates for the server pods and the bootstrap job.

use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, SecurityContext, VolumeMount};

use crate::common;
use crate::crd::ImagePullPolicy;

pub fn build_ports() -> Vec<ContainerPort> {
    vec![
        ContainerPort {
            name: Some(common::HTTPS_PORT_NAME.to_string()),
            container_port: common::INTERNAL_HTTPS_PORT,
            ..Default::default()
        },
        ContainerPort {
            name: Some(common::TCP_PORT_NAME.to_string()),
            container_port: common::INTERNAL_TCP_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        },
    ]
}

pub fn build_ravendb_container(
    image: &str,
    env: Vec<EnvVar>,
    ports: Vec<ContainerPort>,
    mounts: Vec<VolumeMount>,
    pull_policy: ImagePullPolicy,
) -> Container {
    Container {
        name: common::APP.to_string(),
        image: Some(image.to_string()),
        image_pull_policy: Some(pull_policy.to_string()),
        env: Some(env),
        ports: Some(ports),
        volume_mounts: Some(mounts),
        // the server image manages its data dir as root
        security_context: Some(SecurityContext {
            run_as_user: Some(0),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn build_bootstrapper_container(
    image: &str,
    mounts: Vec<VolumeMount>,
    env: Vec<EnvVar>,
) -> Container {
    Container {
        name: format!("{}bootstrapper", common::PREFIX),
        image: Some(image.to_string()),
        command: Some(vec![
            "/bin/bash".to_string(),
            common::INIT_CLUSTER_SCRIPT_PATH.to_string(),
        ]),
        env: Some(env),
        volume_mounts: Some(mounts),
        ..Default::default()
    }
}

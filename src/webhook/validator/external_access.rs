//! External-access dispatch: exactly the context matching the declared type
//! must be present, and ssl-passthrough must never be disabled on managed
//! ingresses.

use async_trait::async_trait;

use crate::common;
use crate::crd::RavenDBCluster;

use super::ClusterValidator;

const FIELD: &str = "spec.externalAccessConfiguration";

const SSL_PASSTHROUGH_KEYS: [&str; 3] = [
    common::INGRESS_SSL_PASSTHROUGH_ANNOTATION,
    common::NGINX_SSL_PASSTHROUGH_ANNOTATION,
    common::HAPROXY_SSL_PASSTHROUGH_ANNOTATION,
];

pub struct ExternalAccessValidator;

#[async_trait]
impl ClusterValidator for ExternalAccessValidator {
    fn name(&self) -> &'static str {
        "externalAccess-validator"
    }

    async fn validate_create(&self, cluster: &RavenDBCluster) -> Vec<String> {
        if !cluster.is_external_access_set() {
            return Vec::new();
        }

        let mut errors = Vec::new();
        let type_ = cluster.external_access_type();
        let ingress_set = cluster.is_ingress_context_set();
        let aws_set = cluster.is_aws_context_set();
        let azure_set = cluster.is_azure_context_set();

        match type_ {
            "ingress-controller" => {
                if !ingress_set {
                    errors.push(format!(
                        "{FIELD}.ingressControllerContext is required when type is 'ingress-controller'"
                    ));
                }
                if aws_set {
                    errors.push(format!(
                        "{FIELD}.awsExternalAccessContext must not be set when type is 'ingress-controller'"
                    ));
                }
                if azure_set {
                    errors.push(format!(
                        "{FIELD}.azureExternalAccessContext must not be set when type is 'ingress-controller'"
                    ));
                }

                for key in SSL_PASSTHROUGH_KEYS {
                    if cluster.ingress_annotations().get(key).map(String::as_str) == Some("false") {
                        errors.push(format!(
                            "{FIELD}.ingressControllerContext.additionalAnnotations must not contain '{key}: \"false\"'"
                        ));
                    }
                }
            }
            "aws-nlb" => {
                if !aws_set {
                    errors.push(format!(
                        "{FIELD}.awsExternalAccessContext is required when type is 'aws-nlb'"
                    ));
                }
                if ingress_set {
                    errors.push(format!(
                        "{FIELD}.ingressControllerContext must not be set when type is 'aws-nlb'"
                    ));
                }
                if azure_set {
                    errors.push(format!(
                        "{FIELD}.azureExternalAccessContext must not be set when type is 'aws-nlb'"
                    ));
                }
            }
            "azure-lb" => {
                if !azure_set {
                    errors.push(format!(
                        "{FIELD}.azureExternalAccessContext is required when type is 'azure-lb'"
                    ));
                }
                if ingress_set {
                    errors.push(format!(
                        "{FIELD}.ingressControllerContext must not be set when type is 'azure-lb'"
                    ));
                }
                if aws_set {
                    errors.push(format!(
                        "{FIELD}.awsExternalAccessContext must not be set when type is 'azure-lb'"
                    ));
                }
            }
            unknown => {
                errors.push(format!("{FIELD}.type has invalid value: '{unknown}'"));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::base_cluster;
    use crate::crd::{
        AwsExternalAccessContext, AwsNodeMapping, AzureExternalAccessContext, AzureNodeMapping,
        ExternalAccessConfiguration, IngressControllerContext,
    };
    use std::collections::BTreeMap;

    async fn errors_for(config: ExternalAccessConfiguration) -> Vec<String> {
        let mut cluster = base_cluster("ea");
        cluster.spec.external_access_configuration = Some(config);
        ExternalAccessValidator.validate_create(&cluster).await
    }

    fn ingress_context(class: &str) -> IngressControllerContext {
        IngressControllerContext {
            ingress_class_name: class.to_string(),
            additional_annotations: None,
        }
    }

    #[tokio::test]
    async fn accepts_valid_aws_config() {
        let errors = errors_for(ExternalAccessConfiguration {
            type_: "aws-nlb".to_string(),
            aws_external_access: Some(AwsExternalAccessContext {
                node_mappings: vec![AwsNodeMapping {
                    tag: "A".to_string(),
                    eip_allocation_id: "eipalloc-0123456789abcdef0".to_string(),
                    subnet_id: "subnet-abcdef1234567890".to_string(),
                }],
            }),
            ..Default::default()
        })
        .await;
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn accepts_valid_azure_config() {
        let errors = errors_for(ExternalAccessConfiguration {
            type_: "azure-lb".to_string(),
            azure_external_access: Some(AzureExternalAccessContext {
                node_mappings: vec![AzureNodeMapping {
                    tag: "A".to_string(),
                    ip: "1.2.3.4".to_string(),
                }],
            }),
            ..Default::default()
        })
        .await;
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn accepts_every_supported_ingress_class() {
        for class in ["nginx", "haproxy", "traefik"] {
            let errors = errors_for(ExternalAccessConfiguration {
                type_: "ingress-controller".to_string(),
                ingress_controller_external_access: Some(ingress_context(class)),
                ..Default::default()
            })
            .await;
            assert!(errors.is_empty(), "{class}: {errors:?}");
        }
    }

    #[tokio::test]
    async fn rejects_disabled_ssl_passthrough() {
        for key in SSL_PASSTHROUGH_KEYS {
            let mut annotations = BTreeMap::new();
            annotations.insert(key.to_string(), "false".to_string());

            let errors = errors_for(ExternalAccessConfiguration {
                type_: "ingress-controller".to_string(),
                ingress_controller_external_access: Some(IngressControllerContext {
                    ingress_class_name: "nginx".to_string(),
                    additional_annotations: Some(annotations),
                }),
                ..Default::default()
            })
            .await;
            assert!(
                errors[0].contains(&format!("must not contain '{key}: \"false\"'")),
                "{errors:?}"
            );
        }
    }

    #[tokio::test]
    async fn rejects_missing_contexts() {
        let errors = errors_for(ExternalAccessConfiguration {
            type_: "ingress-controller".to_string(),
            ..Default::default()
        })
        .await;
        assert!(errors[0].contains("ingressControllerContext is required"));

        let errors = errors_for(ExternalAccessConfiguration {
            type_: "aws-nlb".to_string(),
            ..Default::default()
        })
        .await;
        assert!(errors[0].contains("awsExternalAccessContext is required"));

        let errors = errors_for(ExternalAccessConfiguration {
            type_: "azure-lb".to_string(),
            ..Default::default()
        })
        .await;
        assert!(errors[0].contains("azureExternalAccessContext is required"));
    }

    #[tokio::test]
    async fn rejects_conflicting_contexts() {
        let errors = errors_for(ExternalAccessConfiguration {
            type_: "ingress-controller".to_string(),
            ingress_controller_external_access: Some(ingress_context("nginx")),
            aws_external_access: Some(AwsExternalAccessContext::default()),
            ..Default::default()
        })
        .await;
        assert!(errors[0].contains("must not be set when type is 'ingress-controller'"));

        let errors = errors_for(ExternalAccessConfiguration {
            type_: "azure-lb".to_string(),
            azure_external_access: Some(AzureExternalAccessContext::default()),
            aws_external_access: Some(AwsExternalAccessContext::default()),
            ..Default::default()
        })
        .await;
        assert!(errors[0].contains("must not be set when type is 'azure-lb'"));
    }

    #[tokio::test]
    async fn rejects_unknown_type() {
        let errors = errors_for(ExternalAccessConfiguration {
            type_: "bagira".to_string(),
            ..Default::default()
        })
        .await;
        assert!(errors[0].contains("spec.externalAccessConfiguration.type has invalid value: 'bagira'"));
    }

    #[tokio::test]
    async fn absent_configuration_passes() {
        let cluster = base_cluster("ea-none");
        assert!(ExternalAccessValidator
            .validate_create(&cluster)
            .await
            .is_empty());
    }
}

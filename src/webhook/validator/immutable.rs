//! Update-only checks for fields frozen at creation time: mode, domain and
//! the per-node identity (tag + public URLs).

use async_trait::async_trait;

use crate::crd::RavenDBCluster;

use super::ClusterValidator;

pub struct ImmutableFieldsValidator;

#[async_trait]
impl ClusterValidator for ImmutableFieldsValidator {
    fn name(&self) -> &'static str {
        "immutable-fields-validator"
    }

    async fn validate_create(&self, _cluster: &RavenDBCluster) -> Vec<String> {
        Vec::new()
    }

    async fn validate_update(&self, old: &RavenDBCluster, new: &RavenDBCluster) -> Vec<String> {
        let mut errors = Vec::new();

        if old.mode() != new.mode() {
            errors.push("spec.mode is immutable after creation".to_string());
        }

        if old.domain() != new.domain() {
            errors.push("spec.domain is immutable after creation".to_string());
        }

        for (old_node, new_node) in old.spec.nodes.iter().zip(&new.spec.nodes) {
            if old_node.tag != new_node.tag {
                errors.push("spec.nodes[].tag is immutable after creation".to_string());
            }
            if old_node.public_server_url != new_node.public_server_url {
                errors.push("spec.nodes[].publicServerUrl is immutable after creation".to_string());
            }
            if old_node.public_server_url_tcp != new_node.public_server_url_tcp {
                errors
                    .push("spec.nodes[].publicServerUrlTcp is immutable after creation".to_string());
            }
        }

        errors
    }
}

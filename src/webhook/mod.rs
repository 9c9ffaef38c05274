//! Admission webhooks: the validating pipeline, the (currently empty)
//! defaulting pipeline, and the HTTP server that fronts them.

pub mod mutator;
pub mod server;
pub mod validator;

pub use mutator::{ClusterMutator, MutationResult, MutatorPipeline};
pub use server::WebhookServer;
pub use validator::{
    ApiSecretSource, ApiVacSource, ClusterValidator, SecretSource, ValidatorPipeline,
    VolumeAttributesClassSource,
};

use crate::crd::RavenDBCluster;
use crate::error::Result;

/// Defaulting entrypoint. The mutator chain is empty today; the call stays
/// in place so future defaults plug in without rewiring the webhook.
pub fn default_cluster(
    mutators: &MutatorPipeline,
    cluster: &mut RavenDBCluster,
) -> Result<Vec<String>> {
    mutators.run(cluster)
}

pub async fn validate_create(
    validators: &ValidatorPipeline,
    cluster: &RavenDBCluster,
) -> Result<()> {
    validators.run_create(cluster).await
}

pub async fn validate_update(
    validators: &ValidatorPipeline,
    old: &RavenDBCluster,
    new: &RavenDBCluster,
) -> Result<()> {
    validators.run_update(old, new).await
}

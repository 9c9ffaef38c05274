//! Admission-time defaulting pipeline.
//!
//! A pull-policy mutator used to force `imagePullPolicy: Always` for
//! `:latest` images; the image validator now rejects floating tags up
//! front, so the chain ships empty. The pipeline stays wired as the
//! extension seam for future defaults.

use crate::crd::RavenDBCluster;
use crate::error::{Error, Result};

pub trait ClusterMutator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Adjust the cluster in place; may return a warning for the caller.
    fn mutate(&self, cluster: &mut RavenDBCluster) -> MutationResult;
}

#[derive(Debug, Default)]
pub struct MutationResult {
    pub warning: Option<String>,
    pub error: Option<String>,
}

#[derive(Default)]
pub struct MutatorPipeline {
    mutators: Vec<Box<dyn ClusterMutator>>,
}

impl MutatorPipeline {
    pub fn new(mutators: Vec<Box<dyn ClusterMutator>>) -> Self {
        Self { mutators }
    }

    /// The production chain; intentionally empty.
    pub fn with_defaults() -> Self {
        Self::new(Vec::new())
    }

    /// Run every mutator; collected warnings are returned, errors aggregate
    /// into a single validation failure.
    pub fn run(&self, cluster: &mut RavenDBCluster) -> Result<Vec<String>> {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        for mutator in &self.mutators {
            let result = mutator.mutate(cluster);
            if let Some(warning) = result.warning {
                warnings.push(format!("[{}] {warning}", mutator.name()));
            }
            if let Some(error) = result.error {
                errors.push(format!("[{}] {error}", mutator.name()));
            }
        }

        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(Error::ValidationError(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::base_cluster;
    use crate::crd::ImagePullPolicy;

    struct ForcePullAlways;

    impl ClusterMutator for ForcePullAlways {
        fn name(&self) -> &'static str {
            "force-pull-always"
        }

        fn mutate(&self, cluster: &mut RavenDBCluster) -> MutationResult {
            cluster.spec.image_pull_policy = ImagePullPolicy::Always;
            MutationResult {
                warning: Some("imagePullPolicy forced to 'Always'".to_string()),
                error: None,
            }
        }
    }

    #[test]
    fn default_chain_is_a_no_op() {
        let mut cluster = base_cluster("mutate-default");
        let before = cluster.clone();

        let warnings = MutatorPipeline::with_defaults().run(&mut cluster).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(cluster, before);
    }

    #[test]
    fn custom_chains_mutate_and_warn() {
        let mut cluster = base_cluster("mutate-custom");
        let pipeline = MutatorPipeline::new(vec![Box::new(ForcePullAlways)]);

        let warnings = pipeline.run(&mut cluster).unwrap();
        assert_eq!(cluster.spec.image_pull_policy, ImagePullPolicy::Always);
        assert_eq!(warnings, vec!["[force-pull-always] imagePullPolicy forced to 'Always'"]);
    }
}

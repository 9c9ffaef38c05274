//! Image policy: only pinned ravendb/ ubuntu images, and no version
//! downgrades across updates.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::crd::RavenDBCluster;

use super::ClusterValidator;

// leading <major>.<minor>[.<patch>] of the tag
static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?").expect("version regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImageVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

pub fn parse_leading_version(tag: &str) -> Option<ImageVersion> {
    let captures = VERSION_RE.captures(tag)?;
    Some(ImageVersion {
        major: captures[1].parse().ok()?,
        minor: captures[2].parse().ok()?,
        patch: captures
            .get(3)
            .map(|m| m.as_str().parse().ok())
            .unwrap_or(Some(0))?,
    })
}

fn split_image(image: &str) -> (&str, Option<&str>) {
    match image.rsplit_once(':') {
        // a ':' inside a registry host:port segment is not a tag separator
        Some((repo, tag)) if !tag.contains('/') => (repo, Some(tag)),
        _ => (image, None),
    }
}

pub struct ImageValidator;

impl ImageValidator {
    fn check_image(&self, image: &str) -> Vec<String> {
        let mut errors = Vec::new();

        if !image.starts_with("ravendb/") {
            errors.push(format!(
                "spec.image '{image}': image must be under the 'ravendb/' registry namespace"
            ));
            return errors;
        }

        if image.contains("@sha256:") {
            errors.push(format!(
                "spec.image '{image}': digest references are not allowed; use a pinned tag"
            ));
            return errors;
        }

        let (_, tag) = split_image(image);
        let Some(tag) = tag else {
            errors.push(format!(
                "spec.image '{image}': image must specify a tag; implicit ':latest' is not allowed"
            ));
            return errors;
        };

        if tag.contains("latest") {
            errors.push(format!(
                "spec.image '{image}': floating tag '{tag}' is not allowed; pin an exact version"
            ));
            return errors;
        }

        if !tag.contains("ubuntu.") {
            errors.push(format!(
                "spec.image '{image}': non-ubuntu images are not supported"
            ));
            return errors;
        }

        if parse_leading_version(tag).is_none() {
            errors.push(format!(
                "spec.image '{image}': tag must start with a <major>.<minor>[.<patch>] version"
            ));
        }

        errors
    }
}

#[async_trait]
impl ClusterValidator for ImageValidator {
    fn name(&self) -> &'static str {
        "image-validator"
    }

    async fn validate_create(&self, cluster: &RavenDBCluster) -> Vec<String> {
        self.check_image(cluster.image())
    }

    async fn validate_update(&self, old: &RavenDBCluster, new: &RavenDBCluster) -> Vec<String> {
        let mut errors = self.check_image(new.image());
        if !errors.is_empty() {
            return errors;
        }

        let old_version = split_image(old.image()).1.and_then(parse_leading_version);
        let new_version = split_image(new.image()).1.and_then(parse_leading_version);

        if let (Some(old_version), Some(new_version)) = (old_version, new_version) {
            if new_version < old_version {
                errors.push(format!(
                    "spec.image: downgrade is not allowed ('{}' -> '{}')",
                    old.image(),
                    new.image()
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::base_cluster;

    async fn create_errors(image: &str) -> Vec<String> {
        let mut cluster = base_cluster("image");
        cluster.spec.image = image.to_string();
        ImageValidator.validate_create(&cluster).await
    }

    async fn update_errors(old_image: &str, new_image: &str) -> Vec<String> {
        let mut old = base_cluster("image-old");
        old.spec.image = old_image.to_string();
        let mut new = base_cluster("image-new");
        new.spec.image = new_image.to_string();
        ImageValidator.validate_update(&old, &new).await
    }

    #[tokio::test]
    async fn rejects_non_ravendb_repo() {
        let errors = create_errors("thegoldenplatypus/ravendb:7.1.3-ubuntu.22.04-x64").await;
        assert!(errors[0].contains("image must be under the 'ravendb/' registry namespace"));
    }

    #[tokio::test]
    async fn rejects_digest_reference() {
        let errors = create_errors("ravendb/ravendb@sha256:deadbeef").await;
        assert!(errors[0].contains("digest references are not allowed"));
    }

    #[tokio::test]
    async fn rejects_implicit_and_explicit_latest() {
        let errors = create_errors("ravendb/ravendb").await;
        assert!(errors[0].contains("must specify a tag; implicit ':latest' is not allowed"));

        let errors = create_errors("ravendb/ravendb:latest").await;
        assert!(errors[0].contains("floating tag"));

        let errors = create_errors("ravendb/ravendb:7.1-latest-ubuntu.22.04").await;
        assert!(errors[0].contains("floating tag"));
    }

    #[tokio::test]
    async fn rejects_non_ubuntu_tags() {
        let errors = create_errors("ravendb/ravendb:7.1.3-windows-ltsc2022").await;
        assert!(errors[0].contains("non-ubuntu images are not supported"));
    }

    #[tokio::test]
    async fn accepts_pinned_ubuntu_tag() {
        assert!(create_errors("ravendb/ravendb:7.1.3-ubuntu.22.04-x64")
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn blocks_downgrade() {
        let errors = update_errors(
            "ravendb/ravendb:7.1.3-ubuntu.22.04-x64",
            "ravendb/ravendb:7.1.2-ubuntu.22.04-x64",
        )
        .await;
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("downgrade is not allowed"));
    }

    #[tokio::test]
    async fn allows_same_version_and_upgrades() {
        assert!(update_errors(
            "ravendb/ravendb:6.2.10-ubuntu.22.04-x64",
            "ravendb/ravendb:6.2.10-ubuntu.22.04-x64",
        )
        .await
        .is_empty());

        assert!(update_errors(
            "ravendb/ravendb:6.2.9-ubuntu.22.04-x64",
            "ravendb/ravendb:6.2.10-ubuntu.22.04-x64",
        )
        .await
        .is_empty());

        assert!(update_errors(
            "ravendb/ravendb:5.4.210-ubuntu.22.04-x64",
            "ravendb/ravendb:6.0.0-ubuntu.22.04-x64",
        )
        .await
        .is_empty());
    }

    #[test]
    fn leading_version_parses_with_optional_patch() {
        assert_eq!(
            parse_leading_version("7.1-ubuntu.22.04"),
            Some(ImageVersion {
                major: 7,
                minor: 1,
                patch: 0
            })
        );
        assert!(parse_leading_version("ubuntu.22.04").is_none());
    }
}

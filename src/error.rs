//! Crate-wide error type and result alias.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("admission rejected:\n{}", .0.join("\n"))]
    ValidationError(Vec<String>),

    #[error("{0} failed: {1}")]
    ActorError(&'static str, String),

    #[error("{0}")]
    GateError(#[from] crate::upgrade::GateError),

    #[error("secret {namespace}/{name} missing key {key:?}")]
    SecretKeyMissing {
        namespace: String,
        name: String,
        key: &'static str,
    },
}

impl Error {
    /// Conflicts and not-yet-visible objects clear up on their own; retry
    /// those quickly and everything else on the slow path.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::KubeError(kube::Error::Api(e)) => e.code == 409 || e.code == 404,
            Error::HttpError(_) => true,
            _ => false,
        }
    }

    /// True when the underlying Kubernetes API error is a 409 conflict,
    /// e.g. an optimistic-concurrency failure on a status patch.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::KubeError(kube::Error::Api(e)) if e.code == 409)
    }
}

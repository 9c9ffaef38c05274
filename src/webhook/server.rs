//! Admission webhook HTTP server.
//!
//! Serves the validating webhook endpoint for RavenDBCluster objects. TLS
//! termination is left to the fronting service; the pod serves plain HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::DynamicObject;
use serde::Serialize;
use tracing::{info, warn};

use crate::crd::RavenDBCluster;
use crate::error::{Error, Result};

use super::validator::ValidatorPipeline;

pub struct WebhookServer {
    validators: Arc<ValidatorPipeline>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

impl WebhookServer {
    pub fn new(validators: ValidatorPipeline) -> Self {
        Self {
            validators: Arc::new(validators),
        }
    }

    pub async fn start(self, addr: SocketAddr) -> Result<()> {
        let app = Router::new()
            .route("/validate-ravendb-cluster", post(validate_handler))
            .route("/healthz", get(health_handler))
            .with_state(self.validators);

        info!("starting admission webhook server on {addr}");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::ConfigError(format!("failed to bind {addr}: {e}")))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| Error::ConfigError(format!("webhook server error: {e}")))?;

        Ok(())
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn validate_handler(
    State(validators): State<Arc<ValidatorPipeline>>,
    Json(review): Json<AdmissionReview<RavenDBCluster>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<RavenDBCluster> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            warn!("malformed admission review: {e}");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    let response = AdmissionResponse::from(&request);
    let verdict = match (&request.operation, &request.object, &request.old_object) {
        (Operation::Create, Some(cluster), _) => validators.run_create(cluster).await,
        (Operation::Update, Some(new), Some(old)) => validators.run_update(old, new).await,
        // deletes and connects carry nothing to validate
        _ => Ok(()),
    };

    match verdict {
        Ok(()) => Json(response.into_review()),
        Err(e) => Json(response.deny(e.to_string()).into_review()),
    }
}

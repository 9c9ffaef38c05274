//! RavenDB Operator Entry Point
//!
//! Starts the Kubernetes controller and the admission webhook server.

use std::sync::Arc;

use ravendb_operator::webhook::{ApiSecretSource, ApiVacSource, ValidatorPipeline, WebhookServer};
use ravendb_operator::{controller, Error};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting RavenDB Operator v{}", env!("CARGO_PKG_VERSION"));

    let client = kube::Client::try_default().await.map_err(Error::KubeError)?;

    info!("Connected to Kubernetes cluster");

    let state = Arc::new(controller::ControllerState {
        client: client.clone(),
    });

    let validators = ValidatorPipeline::with_defaults(
        Arc::new(ApiSecretSource::new(client.clone())),
        Arc::new(ApiVacSource::new(client.clone())),
    );
    tokio::spawn(async move {
        let server = WebhookServer::new(validators);
        if let Err(e) = server.start(([0, 0, 0, 0], 9443).into()).await {
            tracing::error!("admission webhook server error: {e:?}");
        }
    });

    controller::run_controller(state).await?;

    Ok(())
}

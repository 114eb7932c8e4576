use std::net::SocketAddr;
use std::sync::Arc;

use histopath_service::config::Config;
use histopath_service::model::TfEngine;
use histopath_service::server::{router, AppState};
use histopath_service::utils::{ensure_dirs, ensure_model_present};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().inspect_err(|e| error!("{e}"))?;

    ensure_dirs(&config).await?;
    ensure_model_present(&config)
        .await
        .inspect_err(|e| error!("{e}"))?;

    info!("Loading model...");
    let engine = TfEngine::load(
        &config.model_path,
        &config.model_input_op,
        &config.model_output_op,
    )
    .inspect_err(|e| error!("failed to load model: {e}"))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(AppState::new(config, Arc::new(engine)));
    let app = router(state);

    info!("Listening on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

// src/bin/api_server.rs

use campus_admin::transport;
use campus_admin::{AppConfig, DatabaseService, LocalBlobStore, ModelRegistry, PgCredentialVerifier};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn")),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;

    // --- Model Registry Initialization ---
    let model_registry = Arc::new(ModelRegistry::with_catalog());
    tracing::info!(entities = model_registry.list_models().len(), "model registry initialized");

    // --- Service Initialization ---
    let db_service = DatabaseService::new(&config).await?;
    db_service.ensure_schema(&model_registry).await?;
    let pool = db_service.pool().clone();

    let app_state = transport::http::AppState {
        db_service: Arc::new(db_service),
        model_registry,
        credentials: Arc::new(PgCredentialVerifier::new(pool)),
        blob_store: Arc::new(LocalBlobStore::new(
            config.upload_dir.clone(),
            config.public_base_url.clone(),
        )),
        config: Arc::new(config.clone()),
    };

    // --- API Server Initialization ---
    let app = transport::http::create_router(app_state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "API server listening");
    tracing::info!("Swagger UI available at {}/swagger-ui", config.public_base_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("graceful shutdown complete");
    Ok(())
}

use anyhow::Context;
use glassbox::api::{cors_layer, create_router, AppState};
use glassbox::Config;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("glassbox=info,tower_http=info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let state = AppState::from_config(&config).context("failed to initialise clients")?;

    info!("Glassbox server starting");
    info!("Provider: {} ({})", config.provider, config.model_name);
    info!("Allowed origins: {}", config.server.allowed_origins.join(", "));

    let app = create_router(state)
        .layer(cors_layer(&config.server.allowed_origins))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;
    info!("Server listening on http://{}", listener.local_addr()?);
    info!("Health check: http://{}/health", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

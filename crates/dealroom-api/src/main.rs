//! `dealroom-api` server entry point.

use dealroom_api::config::AppConfig;
use dealroom_api::state::AppState;
use metrics_exporter_prometheus::PrometheusBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(?config, "configuration loaded");

    let db_pool = dealroom_api::db::init_pool(config.database_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("Database initialization failed: {e}");
            e
        })?;

    let port = config.port;
    let metrics_enabled = config.metrics_enabled;
    let mut state = AppState::with_config(config, db_pool)?;
    if metrics_enabled {
        let handle = PrometheusBuilder::new().install_recorder()?;
        state = state.with_prometheus(handle);
    }
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Hydration failed: {e}");
        e
    })?;

    let app = dealroom_api::app(state);
    let addr = format!("0.0.0.0:{port}");
    tracing::info!("dealroom-api listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

use axum::Server;
use config::Config;
use std::net::SocketAddr;

mod api;
mod cache;
mod config;
mod errors;
mod graphql;
mod logging;
mod metrics;
mod models;
mod services;
mod state;
mod validation;

/// Result type for the gateway
pub type Result<T> = std::result::Result<T, errors::ApiError>;

/// Static configuration instance for the gateway
static CONFIG: once_cell::sync::Lazy<Config> = once_cell::sync::Lazy::new(|| {
    dotenv::dotenv().ok();
    envy::from_env::<Config>().expect("Failed to load configuration")
});

#[tokio::main]
async fn main() -> Result<()> {
    logging::setup_logging(&CONFIG.log_format)?;

    CONFIG.validate()?;
    if !CONFIG.has_api_key() {
        tracing::warn!("LUNARCRUSH_API_KEY is not set, upstream queries will fail");
    }

    let metrics_handle = metrics::install_recorder()?;

    // Shared client, cache and schema
    let state = state::AppState::from_config(&CONFIG, metrics_handle)?;
    tracing::info!(
        "Cache backend: {}",
        if CONFIG.redis_url.is_some() { "redis" } else { "memory" }
    );

    let app = api::initialize_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], CONFIG.port));
    tracing::info!("Server starting on {}", addr);

    Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| errors::ApiError::Custom(format!("Server error: {e}")))?;

    Ok(())
}

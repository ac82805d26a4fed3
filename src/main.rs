mod backend;
mod catalog;
mod composer;
mod config;
mod copywriter;
mod error;
mod freepik;
mod gemini;
mod models;
mod normalizer;
mod routes;
mod session;

use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing_subscriber::{fmt, EnvFilter};

use crate::{backend::ProviderBackend, config::StudioConfig, routes::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = StudioConfig::from_env();
    if config.demo_mode() {
        tracing::warn!("GEMINI_API_KEY not set, running in demo mode with placeholder content");
    } else {
        tracing::info!("Gemini API key configured");
    }
    if config.freepik_api_key.is_none() {
        tracing::info!("FREEPIK_API_KEY not set, Freepik generation is unavailable");
    }

    let backend = Arc::new(ProviderBackend::from_config(&config));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(backend, config);

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        );

    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

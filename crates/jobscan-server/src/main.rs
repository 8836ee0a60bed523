use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use jobscan_client::{ProxyConfig, ProxyFetcher, SelectorExtractor};
use jobscan_core::HarvestConfig;
use jobscan_db::{Database, DatabaseConfig};
use jobscan_server::routes;
use jobscan_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobscan=info".parse()?))
        .with_target(false)
        .init();

    let port = std::env::var("JOBSCAN_SERVER_PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");
    let admin_token = std::env::var("JOBSCAN_ADMIN_TOKEN")
        .ok()
        .filter(|t| !t.is_empty());
    if admin_token.is_none() {
        tracing::warn!("JOBSCAN_ADMIN_TOKEN not set, harvest triggers are open");
    }

    let proxy = ProxyConfig::from_env()?;
    tracing::debug!(?proxy, "Proxy configured");
    let fetcher = ProxyFetcher::new(&proxy)?;
    let extractor = SelectorExtractor::new()?;
    let harvest = HarvestConfig::from_env()?;

    let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    db.migrate().await?;

    let state = Arc::new(AppState::new(
        db.clone(),
        fetcher,
        extractor,
        harvest,
        admin_token,
    ));

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer()?);

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    Ok(())
}

/// CORS from `JOBSCAN_ALLOWED_ORIGINS` (comma-separated); permissive when unset.
fn cors_layer() -> anyhow::Result<CorsLayer> {
    let Ok(raw) = std::env::var("JOBSCAN_ALLOWED_ORIGINS") else {
        return Ok(CorsLayer::permissive());
    };

    let origins = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(HeaderValue::from_str)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

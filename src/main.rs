// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::country_service::CountryService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::sqlite_repository::SqliteCountryRepository;
use crate::infrastructure::summary_image::PlottersSummaryRenderer;
use crate::infrastructure::upstream::{ExchangeRateClient, RestCountriesClient};
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    delete_country, get_country_by_name, get_status, list_countries, refresh_countries,
    serve_summary_image,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;
    let upstream_timeout = Duration::from_secs(config.upstream_timeout_secs);

    // Storage (infrastructure layer)
    let pool = SqliteCountryRepository::connect(&config.database_url).await?;
    SqliteCountryRepository::init_schema(&pool).await?;
    let repository = Arc::new(SqliteCountryRepository::new(pool));

    // Upstream gateways and renderer
    let countries = Arc::new(RestCountriesClient::new(
        config.country_data_api,
        upstream_timeout,
    )?);
    let rates = Arc::new(ExchangeRateClient::new(
        config.exchange_rate_api,
        upstream_timeout,
    )?);
    let summary_image_path = config.cache_dir.join("summary.png");
    let renderer = Arc::new(PlottersSummaryRenderer::new(summary_image_path.clone()));

    // Service (application layer)
    let country_service = CountryService::new(repository, countries, rates, renderer);

    // Application state
    let state = Arc::new(AppState {
        country_service,
        summary_image_path,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/status", get(get_status))
        .route("/countries", get(list_countries))
        .route("/countries/refresh", post(refresh_countries))
        .route("/countries/image", get(serve_summary_image))
        .route(
            "/countries/:name",
            get(get_country_by_name).delete(delete_country),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.listen_addr.parse()?;
    tracing::info!("Starting country-ledger service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::{self, AppState};
use crate::config::SkillshopConfig;
use crate::geocoding::{Geocoder, NominatimGeocoder};
use crate::listings::{ListingCatalog, ListingService};
use crate::search::SearchService;
use crate::store::{FjallLocationStore, LocationStore};

/// Wire services together from configuration
pub fn build_state(
    config: &SkillshopConfig,
    geocoder: Arc<dyn Geocoder>,
    store: Arc<dyn LocationStore>,
    catalog: Arc<ListingCatalog>,
) -> AppState {
    let search = SearchService::new(geocoder.clone(), store.clone(), catalog.clone())
        .with_default_radius(config.search.default_radius_miles)
        .with_stored_location_reuse(config.search.reuse_stored_locations);
    let listings = ListingService::new(catalog, geocoder, store.clone());

    AppState {
        search,
        listings,
        store,
    }
}

pub fn app(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api::router(state))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run(config: SkillshopConfig) -> Result<()> {
    let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::new(&config.geocoder)?);
    let store: Arc<dyn LocationStore> = Arc::new(
        FjallLocationStore::open(&config.store.path)
            .with_context(|| format!("Failed to open location store at {}", config.store.path))?,
    );
    let catalog = Arc::new(match &config.server.listings_path {
        Some(path) => ListingCatalog::from_json_file(path)?,
        None => ListingCatalog::default(),
    });

    let state = build_state(&config, geocoder, store, catalog);
    let app = app(
        state,
        Duration::from_secs(config.server.request_timeout_seconds.into()),
    );

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://localhost:{}", config.server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

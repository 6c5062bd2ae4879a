use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    SkillshopError, VERSION,
    listings::ListingService,
    models::{Listing, ListingDraft, Location, Profile},
    search::{SearchHit, SearchQuery, SearchService},
    store::LocationStore,
};

const PROFILE_ID_HEADER: &str = "x-profile-id";
const PROFILE_PROVIDER_HEADER: &str = "x-profile-provider";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub search: SearchService,
    pub listings: ListingService,
    pub store: Arc<dyn LocationStore>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiSearchResult {
    pub listing: Listing,
    pub distance_miles: Option<f64>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiSearchResponse {
    pub results: Vec<ApiSearchResult>,
    pub skill_q: String,
    pub location_q: String,
    pub radius_miles: f64,
    pub location_error: Option<String>,
}

impl From<SearchHit> for ApiSearchResult {
    fn from(hit: SearchHit) -> Self {
        Self {
            listing: hit.listing,
            // Two decimals is what the result page shows
            distance_miles: hit.distance_miles.map(|d| (d * 100.0).round() / 100.0),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Serialize, Deserialize)]
pub struct ApiHealth {
    pub status: String,
    pub version: String,
}

impl IntoResponse for SkillshopError {
    fn into_response(self) -> Response {
        let status = match &self {
            SkillshopError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            SkillshopError::NotFound { .. } => StatusCode::NOT_FOUND,
            SkillshopError::Validation { .. } | SkillshopError::LocationNotFound { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SkillshopError::Config { .. }
            | SkillshopError::Geocoding { .. }
            | SkillshopError::Store { .. }
            | SkillshopError::Io { .. } => {
                tracing::error!("Request failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ApiError {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/listings", post(create_listing))
        .route("/listings/{id}", get(get_listing).put(edit_listing))
        .route("/locations/{name}", get(get_location))
        .with_state(state)
}

async fn health() -> Json<ApiHealth> {
    Json(ApiHealth {
        status: "ok".to_string(),
        version: VERSION.to_string(),
    })
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiSearchResponse>, StatusCode> {
    let outcome = state.search.search_active(&query).await.map_err(|e| {
        tracing::error!("Failed to load listings: {:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ApiSearchResponse {
        results: outcome.results.into_iter().map(ApiSearchResult::from).collect(),
        skill_q: query.skill_text.trim().to_string(),
        location_q: query.location_text.trim().to_string(),
        radius_miles: outcome.radius_miles,
        location_error: outcome.location_error.map(|e| e.to_string()),
    }))
}

/// Acting profile from request headers. Authentication happens upstream.
fn profile_from_headers(headers: &HeaderMap) -> Result<Profile, SkillshopError> {
    let id = headers
        .get(PROFILE_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| SkillshopError::validation("Missing or invalid x-profile-id header"))?;

    let is_provider = headers
        .get(PROFILE_PROVIDER_HEADER)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|s| s.trim().eq_ignore_ascii_case("true"));

    Ok(Profile { id, is_provider })
}

async fn create_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<ListingDraft>,
) -> Result<(StatusCode, Json<Listing>), SkillshopError> {
    let profile = profile_from_headers(&headers)?;
    let listing = state.listings.create_listing(&profile, draft).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Listing>, SkillshopError> {
    state.listings.active_listing(id).await.map(Json)
}

async fn edit_listing(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(draft): Json<ListingDraft>,
) -> Result<Json<Listing>, SkillshopError> {
    let profile = profile_from_headers(&headers)?;
    let listing = state.listings.edit_listing(id, &profile, draft).await?;
    Ok(Json(listing))
}

async fn get_location(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Location>, SkillshopError> {
    state
        .store
        .get(&name)
        .await?
        .map(Json)
        .ok_or_else(|| SkillshopError::not_found(format!("No stored location named '{name}'")))
}

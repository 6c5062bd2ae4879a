//! Geocoder gateway
//!
//! Resolves free-text places (postcodes, towns, addresses) into coordinates
//! through a Nominatim-compatible search API. The gateway is stateless; all
//! reuse of earlier lookups happens in the location store.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::SkillshopError;
use crate::config::GeocoderConfig;
use crate::models::Coordinates;

/// Why a lookup produced no coordinates.
///
/// Callers treat both variants as "not found"; the split only exists so the
/// logs can tell an outage apart from an unknown place.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("no match for '{query}'")]
    NoMatch { query: String },

    #[error("geocoding service unavailable: {message}")]
    Unavailable { message: String },
}

impl GeocodeError {
    fn unavailable(err: impl std::fmt::Display) -> Self {
        GeocodeError::Unavailable {
            message: err.to_string(),
        }
    }
}

impl From<GeocodeError> for SkillshopError {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::NoMatch { query } => SkillshopError::location_not_found(query),
            GeocodeError::Unavailable { message } => SkillshopError::geocoding(message),
        }
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve free text to coordinates. `text` is expected to be non-empty
    /// after trimming.
    async fn resolve(&self, text: &str) -> Result<Coordinates, GeocodeError>;
}

/// One hit of a Nominatim `/search` response. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// HTTP geocoder speaking the Nominatim search API
pub struct NominatimGeocoder {
    client: ClientWithMiddleware,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds.into());

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.client_id.clone())
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, text: &str) -> String {
        format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(text)
        )
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(name = "geocode", skip(self))]
    async fn resolve(&self, text: &str) -> Result<Coordinates, GeocodeError> {
        let query = text.trim();
        if query.is_empty() {
            return Err(GeocodeError::NoMatch {
                query: query.to_string(),
            });
        }

        let start_time = Instant::now();
        let response = self
            .client
            .get(self.search_url(query))
            .send()
            .await
            .map_err(GeocodeError::unavailable)?;

        let status = response.status();
        if !status.is_success() {
            warn!("Geocoding request failed with status {}", status);
            return Err(GeocodeError::unavailable(format!("HTTP {status}")));
        }

        let hits: Vec<SearchHit> = response.json().await.map_err(GeocodeError::unavailable)?;
        let coordinates = first_coordinates(query, hits)?;

        info!(
            "Geocoded '{}' to ({}) in {:.3}s",
            query,
            coordinates,
            start_time.elapsed().as_secs_f64()
        );
        Ok(coordinates)
    }
}

/// Take the best (first) hit and validate its coordinates
fn first_coordinates(query: &str, hits: Vec<SearchHit>) -> Result<Coordinates, GeocodeError> {
    let Some(hit) = hits.into_iter().next() else {
        debug!("No results found for '{}'", query);
        return Err(GeocodeError::NoMatch {
            query: query.to_string(),
        });
    };

    debug!(
        "Best match for '{}': {}",
        query,
        hit.display_name.as_deref().unwrap_or("<unnamed>")
    );

    Coordinates::parse_pair(&hit.lat, &hit.lon).map_err(GeocodeError::unavailable)
}

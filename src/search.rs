//! Search orchestration
//!
//! Turns a raw search request into an ordered list of listings: skill
//! filtering, searcher coordinate resolution, radius filtering and ranking
//! by distance. Location problems never fail the request; they produce an
//! empty result carrying a message for the user.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::distance::distance_miles;
use crate::geocoding::{GeocodeError, Geocoder};
use crate::listings::ListingSource;
use crate::models::{Coordinates, Listing};
use crate::store::LocationStore;

/// Radius used when the request has none or an unreadable one
pub const DEFAULT_RADIUS_MILES: f64 = 15.0;

/// Location text the browser widget shows while geolocation is pending
const PENDING_BROWSER_LOCATION_PREFIX: &str = "current location";

/// Raw search parameters, as received from the client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default, rename = "skill")]
    pub skill_text: String,
    #[serde(default, rename = "location")]
    pub location_text: String,
    #[serde(default, rename = "lat")]
    pub browser_lat: Option<String>,
    #[serde(default, rename = "lon")]
    pub browser_lon: Option<String>,
    /// Miles, as typed
    #[serde(default)]
    pub radius: Option<String>,
}

/// Reasons the searcher's position could not be determined
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("Could not read your browser location. Please type your postcode/town.")]
    MalformedBrowserCoordinates,

    #[error("Your browser location was unavailable. Please type your postcode/town.")]
    PlaceholderLocationText,

    #[error("Could not find that location. Try a full postcode or town/city name.")]
    GeocodeNotFound,

    #[error("Please enter a valid location.")]
    Unresolved,
}

/// One ranked listing. `distance_miles` is absent when no location filter ran.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub listing: Listing,
    pub distance_miles: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<SearchHit>,
    pub radius_miles: f64,
    pub location_error: Option<LocationError>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Present means supplied and non-empty; whitespace still counts
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl SearchQuery {
    fn skill(&self) -> &str {
        self.skill_text.trim()
    }

    fn location(&self) -> &str {
        self.location_text.trim()
    }

    /// Both browser coordinates supplied (well-formed or not)
    fn browser_pair(&self) -> Option<(&str, &str)> {
        Some((
            present(self.browser_lat.as_deref())?,
            present(self.browser_lon.as_deref())?,
        ))
    }

    /// The searcher asked for location filtering one way or another
    #[must_use]
    pub fn attempted_location_filter(&self) -> bool {
        !self.location().is_empty() || self.browser_pair().is_some()
    }

    /// Radius in miles; empty or unparseable input silently becomes
    /// `default`. Anything that parses is kept as is, so a negative radius
    /// matches nothing and `inf` matches every located listing.
    #[must_use]
    pub fn radius_miles(&self, default: f64) -> f64 {
        match non_blank(self.radius.as_deref()) {
            None => default,
            Some(raw) => raw.parse::<f64>().unwrap_or_else(|_| {
                debug!("Ignoring unparseable radius '{}', using {}", raw, default);
                default
            }),
        }
    }
}

/// Candidates whose skill name contains `skill_text` (ignoring case)
#[must_use]
pub fn filter_by_skill(candidates: Vec<Listing>, skill_text: &str) -> Vec<Listing> {
    let skill_text = skill_text.trim();
    if skill_text.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|listing| listing.skill.matches(skill_text))
        .collect()
}

/// Keep located listings within `radius_miles` of `origin`, closest first.
/// Listings without a location are dropped; equal distances keep input order.
#[must_use]
pub fn rank_by_distance(
    candidates: Vec<Listing>,
    origin: Coordinates,
    radius_miles: f64,
) -> Vec<SearchHit> {
    let mut results: Vec<SearchHit> = candidates
        .into_iter()
        .filter_map(|listing| {
            let location = listing.location.as_ref()?;
            let miles = distance_miles(origin, location.coordinates());
            (miles <= radius_miles).then_some(SearchHit {
                listing,
                distance_miles: Some(miles),
            })
        })
        .collect();

    // sort_by is stable
    results.sort_by(|a, b| {
        a.distance_miles
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.distance_miles.unwrap_or(f64::INFINITY))
    });
    results
}

/// Searcher position resolution result
enum Resolution {
    Resolved(Coordinates),
    Unresolved(Option<LocationError>),
}

#[derive(Clone)]
pub struct SearchService {
    geocoder: Arc<dyn Geocoder>,
    store: Arc<dyn LocationStore>,
    listings: Arc<dyn ListingSource>,
    default_radius_miles: f64,
    reuse_stored_locations: bool,
}

impl SearchService {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        store: Arc<dyn LocationStore>,
        listings: Arc<dyn ListingSource>,
    ) -> Self {
        Self {
            geocoder,
            store,
            listings,
            default_radius_miles: DEFAULT_RADIUS_MILES,
            reuse_stored_locations: true,
        }
    }

    #[must_use]
    pub fn with_default_radius(mut self, miles: f64) -> Self {
        self.default_radius_miles = miles;
        self
    }

    #[must_use]
    pub fn with_stored_location_reuse(mut self, enabled: bool) -> Self {
        self.reuse_stored_locations = enabled;
        self
    }

    /// Search the active listings of the configured listing source
    pub async fn search_active(&self, query: &SearchQuery) -> anyhow::Result<SearchOutcome> {
        let candidates = self.listings.active_listings().await?;
        Ok(self.search(query, candidates).await)
    }

    /// Filter and rank `candidates` (expected newest first) for `query`
    #[instrument(name = "search", skip(self, candidates), fields(candidates = candidates.len()))]
    pub async fn search(&self, query: &SearchQuery, candidates: Vec<Listing>) -> SearchOutcome {
        let radius_miles = query.radius_miles(self.default_radius_miles);
        let candidates = filter_by_skill(candidates, query.skill());

        let resolution = self.resolve_searcher(query).await;

        let outcome = match resolution {
            Resolution::Resolved(origin) => SearchOutcome {
                results: rank_by_distance(candidates, origin, radius_miles),
                radius_miles,
                location_error: None,
            },
            Resolution::Unresolved(error) if query.attempted_location_filter() => {
                // Never fall back to unfiltered results once the user asked for a place
                SearchOutcome {
                    results: Vec::new(),
                    radius_miles,
                    location_error: Some(error.unwrap_or(LocationError::Unresolved)),
                }
            }
            Resolution::Unresolved(error) => SearchOutcome {
                results: candidates
                    .into_iter()
                    .map(|listing| SearchHit {
                        listing,
                        distance_miles: None,
                    })
                    .collect(),
                radius_miles,
                location_error: error,
            },
        };

        info!(
            "Search returned {} results (radius {} mi, location error: {:?})",
            outcome.results.len(),
            radius_miles,
            outcome.location_error
        );
        outcome
    }

    /// Browser coordinates first, then typed text. A malformed browser pair
    /// leaves room for the typed text to succeed.
    async fn resolve_searcher(&self, query: &SearchQuery) -> Resolution {
        let mut error = None;

        if let Some((lat, lon)) = query.browser_pair() {
            match Coordinates::parse_pair(lat, lon) {
                Ok(coordinates) => {
                    debug!("Using browser coordinates ({})", coordinates);
                    return Resolution::Resolved(coordinates);
                }
                Err(err) => {
                    debug!("Malformed browser coordinates: {}", err);
                    error = Some(LocationError::MalformedBrowserCoordinates);
                }
            }
        }

        let text = query.location();
        if text.is_empty() {
            return Resolution::Unresolved(error);
        }

        if text.to_lowercase().starts_with(PENDING_BROWSER_LOCATION_PREFIX) {
            return Resolution::Unresolved(Some(LocationError::PlaceholderLocationText));
        }

        match self.lookup_text(text).await {
            Ok(coordinates) => Resolution::Resolved(coordinates),
            Err(err) => Resolution::Unresolved(Some(err)),
        }
    }

    /// Stored location by name if allowed, else one geocoder call. Nothing is
    /// written to the store for the searcher's own position.
    async fn lookup_text(&self, text: &str) -> Result<Coordinates, LocationError> {
        if self.reuse_stored_locations {
            match self.store.get(text).await {
                Ok(Some(location)) => {
                    debug!("Reusing stored location '{}'", location.name);
                    return Ok(location.coordinates());
                }
                Ok(None) => {}
                Err(err) => warn!("Location store lookup failed for '{}': {:#}", text, err),
            }
        }

        match self.geocoder.resolve(text).await {
            Ok(coordinates) => Ok(coordinates),
            Err(GeocodeError::NoMatch { .. }) => Err(LocationError::GeocodeNotFound),
            Err(err @ GeocodeError::Unavailable { .. }) => {
                warn!("Geocoding '{}' failed: {}", text, err);
                Err(LocationError::GeocodeNotFound)
            }
        }
    }
}

//! `skillshop` - local services marketplace
//!
//! This library provides the location-aware core of the marketplace:
//! geocoding typed places, reusing stored locations, great-circle distance,
//! and the search pipeline that filters and ranks listings around a searcher.

pub mod api;
pub mod config;
pub mod distance;
pub mod error;
pub mod geocoding;
pub mod listings;
pub mod models;
pub mod search;
pub mod store;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use config::SkillshopConfig;
pub use distance::{DistanceUnit, distance};
pub use error::SkillshopError;
pub use geocoding::{GeocodeError, Geocoder, NominatimGeocoder};
pub use listings::{ListingCatalog, ListingService, ListingSource};
pub use models::{Coordinates, Listing, ListingDraft, Location, Profile, Skill};
pub use search::{LocationError, SearchHit, SearchOutcome, SearchQuery, SearchService};
pub use store::{FjallLocationStore, InMemoryLocationStore, LocationStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, SkillshopError>;

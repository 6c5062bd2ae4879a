//! Data models for the skillshop marketplace
//!
//! - Location: geocoded place names and raw coordinates
//! - Listing: provider services, skills and the acting profile

pub mod listing;
pub mod location;

pub use listing::{Listing, ListingDraft, Profile, Skill};
pub use location::{Coordinates, Location, normalize_name};

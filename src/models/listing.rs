//! Listing and profile models consumed by search and the listing catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Location;

/// A skill offered by providers, e.g. "Plumbing"
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Skill {
    pub name: String,
}

impl Skill {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Case-insensitive substring match; an empty needle matches everything
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        needle.is_empty() || self.name.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// The acting user of a listing request
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub id: u64,
    pub is_provider: bool,
}

/// A provider's offered service
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Listing {
    pub id: u64,
    /// Owning provider profile
    pub provider_id: u64,
    pub skill: Skill,
    #[serde(default)]
    pub description: String,
    /// Price in the marketplace currency
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Absent on listings created before locations were supported
    #[serde(default)]
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// Editable fields of a listing as submitted by its provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ListingDraft {
    pub skill: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub location_text: String,
}

//! Location model for geocoded place names and raw coordinates

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SkillshopError;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build coordinates, rejecting non-finite or out-of-range values
    pub fn checked(latitude: f64, longitude: f64) -> crate::Result<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(SkillshopError::validation(
                "Coordinates must be finite numbers",
            ));
        }

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(SkillshopError::validation(format!(
                "Latitude must be between -90 and 90, got: {latitude}"
            )));
        }

        if !(-180.0..=180.0).contains(&longitude) {
            return Err(SkillshopError::validation(format!(
                "Longitude must be between -180 and 180, got: {longitude}"
            )));
        }

        Ok(Self::new(latitude, longitude))
    }

    /// Parse a browser-supplied latitude/longitude pair of raw strings
    pub fn parse_pair(lat: &str, lon: &str) -> crate::Result<Self> {
        let latitude = lat
            .trim()
            .parse::<f64>()
            .map_err(|_| SkillshopError::validation(format!("Invalid latitude: {lat}")))?;
        let longitude = lon
            .trim()
            .parse::<f64>()
            .map_err(|_| SkillshopError::validation(format!("Invalid longitude: {lon}")))?;
        Self::checked(latitude, longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Parses "lat,lon" or "lat lon"
impl FromStr for Coordinates {
    type Err = SkillshopError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        if parts.len() != 2 {
            return Err(SkillshopError::validation(
                "Coordinates must be in format 'lat,lon'",
            ));
        }

        Self::parse_pair(parts[0], parts[1])
    }
}

/// A named place resolved by the geocoder.
///
/// Rows are created once per normalized name and never updated afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Place name as first entered (trimmed)
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Location {
    #[must_use]
    pub fn new(name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            name: name.into(),
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
        }
    }

    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Store key for this location's name
    #[must_use]
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Trim, lowercase and collapse inner whitespace so that "  Leeds  City"
/// and "leeds city" share one row.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

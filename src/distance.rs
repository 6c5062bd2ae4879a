//! Great-circle distance between coordinate pairs

use std::fmt;
use std::str::FromStr;

use haversine::{Location as HaversineLocation, Units};
use serde::{Deserialize, Serialize};

use crate::SkillshopError;
use crate::models::Coordinates;

/// Unit a distance is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Km,
}

impl From<DistanceUnit> for Units {
    fn from(unit: DistanceUnit) -> Self {
        match unit {
            DistanceUnit::Miles => Units::Miles,
            DistanceUnit::Km => Units::Kilometers,
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceUnit::Miles => write!(f, "mi"),
            DistanceUnit::Km => write!(f, "km"),
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = SkillshopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mi" | "mile" | "miles" => Ok(DistanceUnit::Miles),
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => Ok(DistanceUnit::Km),
            other => Err(SkillshopError::validation(format!(
                "Unknown distance unit '{other}'. Use miles or km"
            ))),
        }
    }
}

/// Great-circle distance from `from` to `to`.
///
/// Identical points yield exactly `0.0`.
#[must_use]
pub fn distance(from: Coordinates, to: Coordinates, unit: DistanceUnit) -> f64 {
    if from == to {
        return 0.0;
    }

    let from_haversine = HaversineLocation {
        latitude: from.latitude,
        longitude: from.longitude,
    };
    let to_haversine = HaversineLocation {
        latitude: to.latitude,
        longitude: to.longitude,
    };
    haversine::distance(from_haversine, to_haversine, unit.into())
}

#[must_use]
pub fn distance_miles(from: Coordinates, to: Coordinates) -> f64 {
    distance(from, to, DistanceUnit::Miles)
}

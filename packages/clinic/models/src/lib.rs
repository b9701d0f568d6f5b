#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate and clinic types shared across the clinic map workspace.
//!
//! A [`Clinic`] is the normalized form of a single `OpenStreetMap` node
//! returned by an Overpass query. The derivation rules that turn raw OSM
//! tags into display fields live here so the HTTP layer, the query
//! engine, and the API server all agree on them.

use std::collections::BTreeMap;

use geo::{Distance as _, Euclidean, Haversine, Point};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Fallback map center used when the user's location cannot be
/// determined (New Delhi).
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    lat: 28.6139,
    lon: 77.209,
};

/// Display name used when a node carries no `name` tag.
pub const DEFAULT_CLINIC_NAME: &str = "Mental Health Center";

/// Facility type used when a node has neither a `healthcare` nor an
/// `amenity` tag.
pub const DEFAULT_FACILITY_TYPE: &str = "Clinic";

/// Address shown when a node has no street tag.
pub const COORDINATES_ONLY_ADDRESS: &str = "Location coordinates available";

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, `-90..=90`.
    pub lat: f64,
    /// Longitude in degrees, `-180..=180`.
    pub lon: f64,
}

/// Error returned when a latitude or longitude is outside its valid range.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("invalid coordinate ({lat}, {lon}): latitude must be in [-90, 90] and longitude in [-180, 180]")]
pub struct InvalidCoordinateError {
    /// The rejected latitude.
    pub lat: f64,
    /// The rejected longitude.
    pub lon: f64,
}

impl Coordinate {
    /// Creates a coordinate, validating both components.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinateError`] if either component is out of
    /// range or not finite.
    pub fn new(lat: f64, lon: f64) -> Result<Self, InvalidCoordinateError> {
        if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
            Ok(Self { lat, lon })
        } else {
            Err(InvalidCoordinateError { lat, lon })
        }
    }

    /// Straight-line distance to `other` in degree space.
    ///
    /// This is not a geographic distance; it is only meaningful for
    /// comparing against small degree thresholds.
    #[must_use]
    pub fn degree_distance(&self, other: &Self) -> f64 {
        Euclidean.distance(Point::from(*self), Point::from(*other))
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn haversine_meters(&self, other: &Self) -> f64 {
        Haversine.distance(Point::from(*self), Point::from(*other))
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(value: Coordinate) -> Self {
        Self::new(value.lon, value.lat)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

/// `healthcare=*` values included in a clinic search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum HealthcareTag {
    /// Licensed psychologists.
    Psychologist,
    /// Psychiatrists.
    Psychiatrist,
}

impl HealthcareTag {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Psychologist, Self::Psychiatrist]
    }
}

/// `amenity=*` values included in a clinic search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum AmenityTag {
    /// General hospitals.
    Hospital,
    /// Outpatient clinics.
    Clinic,
}

impl AmenityTag {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Hospital, Self::Clinic]
    }
}

/// A care facility found near the search anchor.
///
/// Created fresh from every successful query; a new result set always
/// replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clinic {
    /// OSM node ID. Unique within one result set only.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Node position.
    pub position: Coordinate,
    /// Facility category (`healthcare` tag, else `amenity` tag).
    #[serde(rename = "type")]
    pub facility_type: String,
    /// Best-effort street address.
    pub address: String,
}

impl Clinic {
    /// Builds a clinic from a raw OSM node.
    ///
    /// Empty tag values are treated the same as missing ones.
    #[must_use]
    pub fn from_tags(id: i64, position: Coordinate, tags: &BTreeMap<String, String>) -> Self {
        let tag = |key: &str| {
            tags.get(key)
                .map(String::as_str)
                .filter(|value| !value.trim().is_empty())
        };

        let name = tag("name").unwrap_or(DEFAULT_CLINIC_NAME).to_string();
        let facility_type = tag("healthcare")
            .or_else(|| tag("amenity"))
            .unwrap_or(DEFAULT_FACILITY_TYPE)
            .to_string();
        let address = match (tag("addr:street"), tag("addr:city")) {
            (Some(street), Some(city)) => format!("{street}, {city}"),
            (Some(street), None) => street.to_string(),
            (None, _) => COORDINATES_ONLY_ADDRESS.to_string(),
        };

        Self {
            id,
            name,
            position,
            facility_type,
            address,
        }
    }

    /// Link that opens this clinic's position in Google Maps.
    #[must_use]
    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.position.lat, self.position.lon
        )
    }

    /// Case-insensitive substring match on name or facility type.
    ///
    /// An empty (or whitespace-only) needle matches every clinic.
    #[must_use]
    pub fn matches_filter(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self.name.to_lowercase().contains(&needle)
            || self.facility_type.to_lowercase().contains(&needle)
    }
}

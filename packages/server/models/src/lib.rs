#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the clinic map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the domain types so the wire contract can evolve independently.

use chrono::{DateTime, Utc};
use clinic_map_clinic_models::{Clinic, Coordinate};
use serde::{Deserialize, Serialize};

/// A clinic as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiClinic {
    /// Provider-assigned ID, unique within one response.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Facility category (e.g. `psychologist`, `hospital`).
    #[serde(rename = "type")]
    pub facility_type: String,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Best-effort address.
    pub address: String,
    /// Great-circle distance from the search anchor.
    pub distance_meters: f64,
    /// "Open in maps" link.
    pub maps_url: String,
}

impl ApiClinic {
    /// Converts a clinic, annotating it with its distance from `anchor`.
    #[must_use]
    pub fn from_clinic(clinic: Clinic, anchor: &Coordinate) -> Self {
        Self {
            distance_meters: anchor.haversine_meters(&clinic.position),
            maps_url: clinic.maps_url(),
            id: clinic.id,
            latitude: clinic.position.lat,
            longitude: clinic.position.lon,
            name: clinic.name,
            facility_type: clinic.facility_type,
            address: clinic.address,
        }
    }
}

/// Query parameters for the nearby endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct NearbyQueryParams {
    /// Anchor latitude.
    pub lat: f64,
    /// Anchor longitude.
    pub lon: f64,
    /// Optional name/type filter.
    pub q: Option<String>,
}

/// Response of the nearby endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNearbyResponse {
    /// Coordinate the search was centered on.
    pub anchor: Coordinate,
    /// Mirror that answered.
    pub mirror: String,
    /// When the search completed.
    pub searched_at: DateTime<Utc>,
    /// Matching clinics, nearest first.
    pub clinics: Vec<ApiClinic>,
}

/// Current mirror pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMirrors {
    /// Mirror the next search starts at.
    pub current: String,
    /// All mirrors in failover order.
    pub mirrors: Vec<String>,
}

/// Server health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
    /// Machine-readable category (e.g. `mirrors_exhausted`).
    pub kind: String,
}

//! One-shot user location lookup.
//!
//! A request either resolves to a [`Coordinate`] or fails with a
//! [`LocationError`]; callers fall back to a default coordinate on
//! failure. There is no watch/streaming mode.

use std::time::Duration;

use async_trait::async_trait;
use clinic_map_clinic_models::Coordinate;
use thiserror::Error;

/// Why the user's location could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user (or platform policy) refused location access.
    #[error("location permission denied")]
    PermissionDenied,
    /// The platform could not produce a position.
    #[error("position unavailable")]
    PositionUnavailable,
    /// The platform did not answer in time.
    #[error("location request timed out")]
    Timeout,
}

/// Source of the user's current position.
#[async_trait]
pub trait GeoLocationProvider: Send + Sync {
    /// Requests the current position once.
    ///
    /// May trigger a permission prompt outside this crate's control.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] if no position is available.
    async fn request_current_position(&self) -> Result<Coordinate, LocationError>;
}

/// Provider that always answers the same way.
///
/// Used for a configured home location, and to model permission
/// denial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLocationProvider {
    result: Result<Coordinate, LocationError>,
}

impl FixedLocationProvider {
    /// Always resolves to `position`.
    #[must_use]
    pub const fn at(position: Coordinate) -> Self {
        Self {
            result: Ok(position),
        }
    }

    /// Always fails with `error`.
    #[must_use]
    pub const fn failing(error: LocationError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl GeoLocationProvider for FixedLocationProvider {
    async fn request_current_position(&self) -> Result<Coordinate, LocationError> {
        self.result
    }
}

/// Default IP geolocation endpoint (JSON, no API key).
pub const IP_API_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon";

const IP_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Approximate location from the caller's public IP address.
///
/// The closest thing to a browser location prompt for a terminal or
/// server process: coarse (city level) and subject to the platform's
/// network reachability.
#[derive(Debug, Clone)]
pub struct IpLocationProvider {
    client: reqwest::Client,
    url: String,
}

impl IpLocationProvider {
    /// Creates a provider against [`IP_API_URL`].
    ///
    /// # Errors
    ///
    /// Returns a [`reqwest::Error`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_url(IP_API_URL)
    }

    /// Creates a provider against a custom ip-api compatible endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`reqwest::Error`] if the HTTP client cannot be built.
    pub fn with_url(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(IP_LOOKUP_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl GeoLocationProvider for IpLocationProvider {
    async fn request_current_position(&self) -> Result<Coordinate, LocationError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            log::warn!("IP location lookup failed: {e}");
            if e.is_timeout() {
                LocationError::Timeout
            } else {
                LocationError::PositionUnavailable
            }
        })?;

        if !response.status().is_success() {
            log::warn!("IP location lookup returned {}", response.status());
            return Err(LocationError::PositionUnavailable);
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            log::warn!("IP location response unreadable: {e}");
            if e.is_timeout() {
                LocationError::Timeout
            } else {
                LocationError::PositionUnavailable
            }
        })?;

        parse_ip_response(&body)
    }
}

/// Parses an ip-api JSON answer.
fn parse_ip_response(body: &serde_json::Value) -> Result<Coordinate, LocationError> {
    if body["status"].as_str() != Some("success") {
        log::warn!(
            "IP location lookup unsuccessful: {}",
            body["message"].as_str().unwrap_or("no message")
        );
        return Err(LocationError::PositionUnavailable);
    }

    match (body["lat"].as_f64(), body["lon"].as_f64()) {
        (Some(lat), Some(lon)) => {
            Coordinate::new(lat, lon).map_err(|_| LocationError::PositionUnavailable)
        }
        _ => Err(LocationError::PositionUnavailable),
    }
}

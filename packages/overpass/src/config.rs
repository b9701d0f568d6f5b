//! Runtime configuration resolved from the environment.
//!
//! | Variable | Effect |
//! |---|---|
//! | `OVERPASS_MIRRORS` | Comma-separated endpoint URLs replacing the registry |
//! | `OVERPASS_TIMEOUT_SECS` | Per-request HTTP timeout |
//! | `CLINIC_MAP_RADIUS_METERS` | Search radius around the anchor |

use std::time::Duration;

use crate::client::DEFAULT_REQUEST_TIMEOUT;
use crate::mirrors::{self, MirrorPool};
use crate::query::{ClinicQuery, DEFAULT_RADIUS_METERS};
use crate::OverpassError;

use clinic_map_clinic_models::Coordinate;

/// Resolved Overpass settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverpassConfig {
    /// Endpoints in failover order.
    pub mirrors: Vec<String>,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Search radius in meters.
    pub radius_meters: u32,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            mirrors: mirrors::enabled_mirrors()
                .into_iter()
                .map(|m| m.url)
                .collect(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }
}

impl OverpassConfig {
    /// Reads overrides from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError::Config`] if a variable is set but cannot be
    /// parsed, or the mirror override is empty.
    pub fn from_env() -> Result<Self, OverpassError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, OverpassError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("OVERPASS_MIRRORS") {
            let mirrors: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(String::from)
                .collect();
            if mirrors.is_empty() {
                return Err(OverpassError::Config {
                    message: "OVERPASS_MIRRORS is set but lists no URLs".to_string(),
                });
            }
            log::info!("Using {} Overpass mirrors from OVERPASS_MIRRORS", mirrors.len());
            config.mirrors = mirrors;
        }

        if let Some(raw) = lookup("OVERPASS_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|e| OverpassError::Config {
                message: format!("OVERPASS_TIMEOUT_SECS={raw:?}: {e}"),
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup("CLINIC_MAP_RADIUS_METERS") {
            config.radius_meters = raw.trim().parse().map_err(|e| OverpassError::Config {
                message: format!("CLINIC_MAP_RADIUS_METERS={raw:?}: {e}"),
            })?;
        }

        Ok(config)
    }

    /// Builds a mirror pool over the configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError::Config`] if no mirrors are configured.
    pub fn mirror_pool(&self) -> Result<MirrorPool, OverpassError> {
        MirrorPool::new(self.mirrors.clone())
    }

    /// Builds a query around `center` using the configured radius.
    #[must_use]
    pub const fn query(&self, center: Coordinate) -> ClinicQuery {
        ClinicQuery::new(center).with_radius(self.radius_meters)
    }
}

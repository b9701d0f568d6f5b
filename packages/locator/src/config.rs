//! Locator settings resolved from the environment.
//!
//! | Variable | Effect |
//! |---|---|
//! | `CLINIC_MAP_DEFAULT_LAT` / `CLINIC_MAP_DEFAULT_LON` | Fallback center when location is unavailable (both required) |

use clinic_map_clinic_models::{Coordinate, DEFAULT_CENTER};

use crate::ConfigError;
use crate::engine::SearchTiming;

/// Resolved locator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatorConfig {
    /// Center used when the user's location cannot be determined.
    pub fallback: Coordinate,
    /// Debounce and retry delays.
    pub timing: SearchTiming,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            fallback: DEFAULT_CENTER,
            timing: SearchTiming::default(),
        }
    }
}

impl LocatorConfig {
    /// Reads overrides from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if only one of the fallback
    /// variables is set, or either is not a valid coordinate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match (
            lookup("CLINIC_MAP_DEFAULT_LAT"),
            lookup("CLINIC_MAP_DEFAULT_LON"),
        ) {
            (None, None) => {}
            (Some(lat), Some(lon)) => {
                let lat = parse_degrees("CLINIC_MAP_DEFAULT_LAT", &lat)?;
                let lon = parse_degrees("CLINIC_MAP_DEFAULT_LON", &lon)?;
                config.fallback = Coordinate::new(lat, lon).map_err(|e| ConfigError::Invalid {
                    message: e.to_string(),
                })?;
                log::info!("Using fallback center {}", config.fallback);
            }
            _ => {
                return Err(ConfigError::Invalid {
                    message: "CLINIC_MAP_DEFAULT_LAT and CLINIC_MAP_DEFAULT_LON must be set together"
                        .to_string(),
                });
            }
        }

        Ok(config)
    }
}

fn parse_degrees(key: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim().parse().map_err(|e| ConfigError::Invalid {
        message: format!("{key}={raw:?}: {e}"),
    })
}

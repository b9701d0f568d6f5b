#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Clinic locator core.
//!
//! Coordinates three asynchronous inputs: the user's location, the map
//! viewport, and a flaky upstream search API.
//!
//! * [`geolocation`]: one-shot location lookup behind
//!   [`GeoLocationProvider`].
//! * [`debounce`]: cancellable timer; only the latest scheduled task runs.
//! * [`failover`]: bounded round-robin retry across Overpass mirrors.
//! * [`engine`]: [`ClinicQueryEngine`], debounce plus failover plus
//!   observable results with a `fetching` flag.
//! * [`viewport`]: anchor vs. map center, and the "search this area"
//!   button state machine.
//! * [`view`]: [`MapView`], which turns named UI events into engine and
//!   viewport transitions and renders a [`MapFrame`].
//!
//! Nothing in here is fatal: failed searches keep the previous results
//! and the map stays interactive.

pub mod config;
pub mod debounce;
pub mod engine;
pub mod failover;
pub mod geolocation;
pub mod view;
pub mod viewport;

#[cfg(test)]
pub(crate) mod test_support;

use strum_macros::IntoStaticStr;
use thiserror::Error;

pub use config::LocatorConfig;
pub use engine::{ClinicQueryEngine, ClinicResults, SearchTiming};
pub use geolocation::{
    FixedLocationProvider, GeoLocationProvider, IpLocationProvider, LocationError,
};
pub use view::{MapFrame, MapView};
pub use viewport::{SearchButton, ViewportController, ViewportState};

/// Terminal outcome of a search that produced no new results.
///
/// Every variant leaves the previously shown clinics untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SearchFailure {
    /// Every mirror in the pool answered 429/5xx.
    #[error("all {attempts} mirrors overloaded (last HTTP {last_status})")]
    MirrorsExhausted {
        /// Number of attempts made (equal to the pool size).
        attempts: usize,
        /// Status code of the final attempt.
        last_status: u16,
    },

    /// A mirror answered with something other than usable JSON.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Description of the response problem.
        message: String,
    },

    /// The request never produced a response.
    #[error("network failure: {message}")]
    Network {
        /// Transport error description.
        message: String,
    },
}

impl SearchFailure {
    /// Stable machine-readable name (e.g. `"mirrors_exhausted"`).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Errors resolving locator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of the problem.
        message: String,
    },
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Overpass API client for nearby care-facility searches.
//!
//! The public Overpass API is served by several independent deployments
//! ("mirrors") that answer the same query language. Any of them can be
//! overloaded at a given moment, so callers hold a [`MirrorPool`] and
//! rotate to the next mirror when one answers with HTTP 429 or 5xx.
//!
//! 1. [`query`] builds the radius search for mental-health professionals
//!    and hospitals/clinics around a point.
//! 2. [`parse`] classifies the HTTP response and normalizes the returned
//!    nodes into [`Clinic`] values.
//! 3. [`client`] performs the HTTP call behind the [`ClinicBackend`] trait
//!    so higher layers can be exercised without a network.
//! 4. [`mirrors`] holds the compile-time mirror registry and the
//!    round-robin pool; [`config`] resolves environment overrides.

pub mod client;
pub mod config;
pub mod mirrors;
pub mod parse;
pub mod query;

use async_trait::async_trait;
use clinic_map_clinic_models::Clinic;
use thiserror::Error;

pub use client::OverpassClient;
pub use config::OverpassConfig;
pub use mirrors::MirrorPool;
pub use query::ClinicQuery;

/// Errors from Overpass operations.
#[derive(Debug, Error)]
pub enum OverpassError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The mirror is overloaded (HTTP 429 or 5xx) and another mirror
    /// should be tried.
    #[error("Mirror overloaded (HTTP {status})")]
    Overloaded {
        /// HTTP status code returned by the mirror.
        status: u16,
    },

    /// The mirror answered, but not with a usable JSON document.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of what was wrong with the response.
        message: String,
    },

    /// Mirror list or client configuration is unusable.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },
}

impl OverpassError {
    /// Returns `true` if retrying against a different mirror may succeed.
    #[must_use]
    pub const fn is_overload(&self) -> bool {
        matches!(self, Self::Overloaded { .. })
    }
}

/// A source of clinic search results.
///
/// [`OverpassClient`] is the production implementation. Tests substitute
/// an in-memory backend that scripts per-endpoint responses.
#[async_trait]
pub trait ClinicBackend: Send + Sync {
    /// Runs `query` against the mirror at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError::Overloaded`] for 429/5xx responses,
    /// [`OverpassError::InvalidResponse`] for any other unusable response,
    /// and [`OverpassError::Http`] for transport failures.
    async fn fetch_clinics(
        &self,
        endpoint: &str,
        query: &ClinicQuery,
    ) -> Result<Vec<Clinic>, OverpassError>;
}

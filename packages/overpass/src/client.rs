//! `reqwest`-backed [`ClinicBackend`].
//!
//! The query is sent as `GET {endpoint}?data={ql}`. This client makes a
//! single attempt per call; choosing the next mirror after an overload is
//! the caller's job, since the pool cursor is shared across searches.

use std::time::Duration;

use async_trait::async_trait;
use clinic_map_clinic_models::Clinic;

use crate::{ClinicBackend, ClinicQuery, OverpassConfig, OverpassError, parse};

/// Default per-request timeout. Bounds worst-case latency of a full
/// failover cycle to roughly `mirrors × timeout`.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client for Overpass interpreter endpoints.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
}

impl OverpassClient {
    /// Creates a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError::Http`] if the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration) -> Result<Self, OverpassError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("clinic_map/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Creates a client from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError::Http`] if the TLS backend cannot be
    /// initialised.
    pub fn from_config(config: &OverpassConfig) -> Result<Self, OverpassError> {
        Self::new(config.request_timeout)
    }
}

#[async_trait]
impl ClinicBackend for OverpassClient {
    async fn fetch_clinics(
        &self,
        endpoint: &str,
        query: &ClinicQuery,
    ) -> Result<Vec<Clinic>, OverpassError> {
        let ql = query.to_overpass_ql();
        log::debug!("Querying {endpoint} around {}", query.center);

        let response = self
            .client
            .get(endpoint)
            .query(&[("data", ql.as_str())])
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        parse::classify_status(status, content_type.as_deref())?;

        let text = response.text().await?;
        let body = parse::decode_body(&text)?;
        let clinics = parse::parse_elements(&body)?;

        log::debug!("{endpoint} returned {} clinics", clinics.len());
        Ok(clinics)
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the clinic map.
//!
//! Exposes one-shot nearby clinic searches over the same bounded mirror
//! failover the interactive map uses. The mirror pool is shared by all
//! requests, so once one request fails over, later requests start at the
//! mirror that last answered.

mod handlers;
pub mod interactive;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use clinic_map_locator::SearchTiming;
use clinic_map_overpass::{
    ClinicBackend, MirrorPool, OverpassClient, OverpassConfig, OverpassError,
};
use clinic_map_server_models::ApiMirrors;

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Default port.
pub const DEFAULT_PORT: u16 = 8080;

/// Shared application state.
pub struct AppState {
    /// Upstream clinic search backend.
    pub backend: Arc<dyn ClinicBackend>,
    /// Mirror pool shared across requests.
    pub pool: Mutex<MirrorPool>,
    /// Resolved Overpass settings (radius, timeout, mirrors).
    pub config: OverpassConfig,
    /// Pause between failover attempts.
    pub retry_delay: Duration,
}

impl AppState {
    /// Builds state over an arbitrary backend.
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError::Config`] if `config` lists no mirrors.
    pub fn new(
        backend: Arc<dyn ClinicBackend>,
        config: OverpassConfig,
    ) -> Result<Self, OverpassError> {
        Ok(Self {
            backend,
            pool: Mutex::new(config.mirror_pool()?),
            config,
            retry_delay: SearchTiming::default().retry_delay,
        })
    }

    /// Builds state backed by a real [`OverpassClient`].
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError`] if the mirror list is empty or the HTTP
    /// client cannot be built.
    pub fn from_config(config: OverpassConfig) -> Result<Self, OverpassError> {
        let client = OverpassClient::from_config(&config)?;
        Self::new(Arc::new(client), config)
    }

    fn pool(&self) -> MutexGuard<'_, MirrorPool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mirror the next search will start at.
    #[must_use]
    pub fn current_mirror(&self) -> String {
        self.pool().current().to_string()
    }

    /// Snapshot of the mirror pool.
    #[must_use]
    pub fn mirrors(&self) -> ApiMirrors {
        let pool = self.pool();
        ApiMirrors {
            current: pool.current().to_string(),
            mirrors: pool.mirrors().to_vec(),
        }
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/clinics/nearby", web::get().to(handlers::nearby))
            .route("/mirrors", web::get().to(handlers::mirrors)),
    );
}

/// Starts the clinic map API server on `BIND_ADDR`:`PORT` (default
/// `127.0.0.1:8080`).
///
/// The caller provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// See [`serve`].
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let bind_addr =
        std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    serve(&bind_addr, port).await
}

/// Resolves Overpass settings from the environment and serves the API on
/// `bind_addr`:`port`.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration is invalid, or
/// the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn serve(bind_addr: &str, port: u16) -> std::io::Result<()> {
    if pretty_env_logger::try_init_custom_env("RUST_LOG").is_err() {
        log::debug!("Logger already initialized");
    }

    let config = OverpassConfig::from_env().map_err(std::io::Error::other)?;
    log::info!(
        "Using {} Overpass mirrors, radius {}m, timeout {:?}",
        config.mirrors.len(),
        config.radius_meters,
        config.request_timeout
    );

    let state = web::Data::new(AppState::from_config(config).map_err(std::io::Error::other)?);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

//! HTTP handler functions for the clinic map API.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use clinic_map_clinic_models::Coordinate;
use clinic_map_locator::failover::search_with_failover;
use clinic_map_server_models::{
    ApiClinic, ApiError, ApiHealth, ApiNearbyResponse, NearbyQueryParams,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/mirrors`
pub async fn mirrors(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.mirrors())
}

/// `GET /api/clinics/nearby?lat=..&lon=..[&q=..]`
///
/// Searches once around the anchor (no debounce), nearest clinic first.
pub async fn nearby(
    state: web::Data<AppState>,
    params: web::Query<NearbyQueryParams>,
) -> HttpResponse {
    let anchor = match Coordinate::new(params.lat, params.lon) {
        Ok(anchor) => anchor,
        Err(e) => {
            return HttpResponse::BadRequest().json(ApiError {
                error: e.to_string(),
                kind: "invalid_coordinate".to_string(),
            });
        }
    };

    let query = state.config.query(anchor);
    let clinics = match search_with_failover(
        state.backend.as_ref(),
        &state.pool,
        &query,
        state.retry_delay,
    )
    .await
    {
        Ok(clinics) => clinics,
        Err(failure) => {
            log::error!("Nearby search around {anchor} failed: {failure}");
            return HttpResponse::BadGateway().json(ApiError {
                error: failure.to_string(),
                kind: failure.kind().to_string(),
            });
        }
    };

    let needle = params.q.as_deref().unwrap_or_default();
    let mut clinics: Vec<ApiClinic> = clinics
        .into_iter()
        .filter(|c| c.matches_filter(needle))
        .map(|c| ApiClinic::from_clinic(c, &anchor))
        .collect();
    clinics.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

    HttpResponse::Ok().json(ApiNearbyResponse {
        anchor,
        mirror: state.current_mirror(),
        searched_at: Utc::now(),
        clinics,
    })
}

//! Bounded mirror failover.
//!
//! A search walks the pool starting at its current mirror. An overloaded
//! mirror (429/5xx) advances the pool cursor and the search retries at
//! the next one after a short delay. After `len(pool)` consecutive
//! overloads the search gives up. Any other failure ends the search
//! immediately without touching the cursor.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use clinic_map_clinic_models::Clinic;
use clinic_map_overpass::{ClinicBackend, ClinicQuery, MirrorPool, OverpassError};

use crate::SearchFailure;

/// Runs `query` with failover across `pool`.
///
/// The pool lock is never held across an `.await`, so the same pool can
/// be shared by concurrent searches. The cursor only advances if no
/// concurrent search has already moved it past the overloaded mirror.
///
/// # Errors
///
/// Returns [`SearchFailure`] if every mirror was overloaded, or the first
/// non-overload failure.
pub async fn search_with_failover(
    backend: &dyn ClinicBackend,
    pool: &Mutex<MirrorPool>,
    query: &ClinicQuery,
    retry_delay: Duration,
) -> Result<Vec<Clinic>, SearchFailure> {
    let attempts = lock(pool).len();
    let mut last_status = 0;

    for attempt in 1..=attempts {
        let (index, endpoint) = {
            let pool = lock(pool);
            (pool.current_index(), pool.current().to_string())
        };

        match backend.fetch_clinics(&endpoint, query).await {
            Ok(clinics) => return Ok(clinics),
            Err(OverpassError::Overloaded { status }) => {
                last_status = status;
                let next = {
                    let mut pool = lock(pool);
                    if pool.current_index() == index {
                        pool.advance();
                    }
                    pool.current().to_string()
                };
                log::warn!(
                    "Mirror {index} ({endpoint}) busy (HTTP {status}), trying {next} \
                     [{attempt}/{attempts}]"
                );
                if attempt < attempts {
                    tokio::time::sleep(retry_delay).await;
                }
            }
            Err(OverpassError::Http(e)) => {
                log::error!("Fetch error from {endpoint}: {e}");
                return Err(SearchFailure::Network {
                    message: e.to_string(),
                });
            }
            Err(e) => {
                log::error!("Invalid response from {endpoint}: {e}");
                return Err(SearchFailure::InvalidResponse {
                    message: e.to_string(),
                });
            }
        }
    }

    log::error!("All {attempts} Overpass mirrors overloaded, giving up");
    Err(SearchFailure::MirrorsExhausted {
        attempts,
        last_status,
    })
}

/// Locks the pool, recovering from poisoning (the pool has no invariant
/// a panicking holder could break).
pub(crate) fn lock(pool: &Mutex<MirrorPool>) -> MutexGuard<'_, MirrorPool> {
    pool.lock().unwrap_or_else(PoisonError::into_inner)
}

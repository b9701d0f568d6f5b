//! Debounced clinic search with mirror failover.
//!
//! Every [`search`](ClinicQueryEngine::search) supersedes the previous
//! one: its timer is aborted, and if it already started, its result is
//! discarded. Results are published through a `tokio::sync::watch`
//! channel so any number of consumers can follow them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use clinic_map_clinic_models::{Clinic, Coordinate};
use clinic_map_overpass::{
    ClinicBackend, ClinicQuery, MirrorPool, OverpassClient, OverpassConfig, OverpassError,
};
use tokio::sync::watch;

use crate::SearchFailure;
use crate::debounce::Debouncer;
use crate::failover::{self, search_with_failover};

/// Delays applied by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTiming {
    /// Quiet period before a user-triggered search fires.
    pub debounce: Duration,
    /// Quiet period for `immediate` searches.
    pub immediate: Duration,
    /// Pause before retrying at the next mirror after an overload.
    pub retry_delay: Duration,
}

impl Default for SearchTiming {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(800),
            immediate: Duration::from_millis(100),
            retry_delay: Duration::from_millis(100),
        }
    }
}

/// Observable search state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClinicResults {
    /// Result of the most recent successful search.
    pub clinics: Vec<Clinic>,
    /// Anchor the current `clinics` were searched around.
    pub anchor: Option<Coordinate>,
    /// A search is scheduled or running.
    pub fetching: bool,
    /// Failure of the most recent completed search, if it failed.
    pub last_error: Option<SearchFailure>,
    /// Number of searches that completed successfully.
    pub completed_queries: u64,
    /// When `clinics` was last replaced.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ClinicResults {
    fn on_query_scheduled(&mut self) {
        self.fetching = true;
    }

    /// Replaces the clinic list with a fresh result set.
    pub fn on_query_succeeded(&mut self, anchor: Coordinate, clinics: Vec<Clinic>) {
        self.clinics = clinics;
        self.anchor = Some(anchor);
        self.fetching = false;
        self.last_error = None;
        self.completed_queries += 1;
        self.updated_at = Some(Utc::now());
    }

    /// Records a failure; the previous clinic list stays in place.
    pub fn on_query_failed(&mut self, failure: SearchFailure) {
        self.fetching = false;
        self.last_error = Some(failure);
    }

    fn on_query_cancelled(&mut self) {
        self.fetching = false;
    }
}

struct Shared {
    backend: Arc<dyn ClinicBackend>,
    pool: Mutex<MirrorPool>,
    radius_meters: u32,
    timing: SearchTiming,
    generation: AtomicU64,
    results: watch::Sender<ClinicResults>,
}

impl Shared {
    async fn run(&self, generation: u64, center: Coordinate) {
        let query = ClinicQuery::new(center).with_radius(self.radius_meters);
        let outcome =
            search_with_failover(self.backend.as_ref(), &self.pool, &query, self.timing.retry_delay)
                .await;

        self.results.send_if_modified(|results| {
            if self.generation.load(Ordering::SeqCst) != generation {
                log::debug!("Discarding superseded search around {center}");
                return false;
            }
            match outcome {
                Ok(clinics) => {
                    log::info!("Found {} clinics around {center}", clinics.len());
                    results.on_query_succeeded(center, clinics);
                }
                Err(failure) => {
                    log::warn!("Clinic search around {center} failed: {failure}");
                    results.on_query_failed(failure);
                }
            }
            true
        });
    }
}

/// Debounced clinic search over a shared mirror pool.
///
/// Must be driven from within a Tokio runtime. Dropping the engine
/// aborts any pending search.
pub struct ClinicQueryEngine {
    shared: Arc<Shared>,
    debouncer: Debouncer,
}

impl std::fmt::Debug for ClinicQueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClinicQueryEngine")
            .field("mirror_index", &self.mirror_index())
            .field("radius_meters", &self.shared.radius_meters)
            .field("timing", &self.shared.timing)
            .field("pending", &self.debouncer.is_pending())
            .finish_non_exhaustive()
    }
}

impl ClinicQueryEngine {
    /// Creates an engine over `backend` and `pool`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn ClinicBackend>,
        pool: MirrorPool,
        radius_meters: u32,
        timing: SearchTiming,
    ) -> Self {
        let (results, _) = watch::channel(ClinicResults::default());
        Self {
            shared: Arc::new(Shared {
                backend,
                pool: Mutex::new(pool),
                radius_meters,
                timing,
                generation: AtomicU64::new(0),
                results,
            }),
            debouncer: Debouncer::new(),
        }
    }

    /// Creates an engine backed by a real [`OverpassClient`].
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError`] if the mirror list is empty or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &OverpassConfig, timing: SearchTiming) -> Result<Self, OverpassError> {
        let client = OverpassClient::from_config(config)?;
        Ok(Self::new(
            Arc::new(client),
            config.mirror_pool()?,
            config.radius_meters,
            timing,
        ))
    }

    /// Schedules a search around `center`.
    ///
    /// Any pending or running search is superseded. `immediate` selects the
    /// short delay instead of the normal debounce window. The `fetching`
    /// flag is raised right away.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn search(&mut self, center: Coordinate, immediate: bool) {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared
            .results
            .send_modify(ClinicResults::on_query_scheduled);

        let delay = if immediate {
            self.shared.timing.immediate
        } else {
            self.shared.timing.debounce
        };
        log::debug!("Scheduling search #{generation} around {center} in {delay:?}");

        let shared = Arc::clone(&self.shared);
        self.debouncer.schedule(delay, async move {
            shared.run(generation, center).await;
        });
    }

    /// Aborts any pending or running search. Returns `true` if one was
    /// still pending.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.debouncer.cancel();
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared
            .results
            .send_if_modified(|results| {
                let was_fetching = results.fetching;
                results.on_query_cancelled();
                was_fetching
            });
        cancelled
    }

    /// Subscribes to result updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ClinicResults> {
        self.shared.results.subscribe()
    }

    /// Snapshot of the current results.
    #[must_use]
    pub fn results(&self) -> ClinicResults {
        self.shared.results.borrow().clone()
    }

    /// Whether a search is scheduled or running.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.shared.results.borrow().fetching
    }

    /// Index of the mirror the next search will start at.
    #[must_use]
    pub fn mirror_index(&self) -> usize {
        failover::lock(&self.shared.pool).current_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MIRRORS, Reply, ScriptedBackend, clinic, coord, pool};

    fn engine(backend: &Arc<ScriptedBackend>) -> ClinicQueryEngine {
        ClinicQueryEngine::new(
            Arc::clone(backend) as Arc<dyn ClinicBackend>,
            pool(),
            5000,
            SearchTiming::default(),
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_searches_coalesce_into_one_query() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut engine = engine(&backend);

        for step in 0..6 {
            engine.search(coord(28.6 + f64::from(step) * 0.001, 77.2), false);
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        settle().await;

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert!((calls[0].center.lat - 28.605).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn fetching_is_raised_at_schedule_time() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut engine = engine(&backend);

        assert!(!engine.is_fetching());
        engine.search(coord(1.0, 1.0), false);
        assert!(engine.is_fetching());

        settle().await;
        assert!(!engine.is_fetching());
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_uses_short_delay() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut engine = engine(&backend);

        engine.search(coord(1.0, 1.0), false);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(backend.calls().is_empty());

        engine.search(coord(1.0, 1.0), true);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_search_publishes_clinics() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.script(
            MIRRORS[0],
            Reply::Clinics(vec![clinic(1, "Oak Clinic", "psychologist")]),
        );
        let mut engine = engine(&backend);
        let mut rx = engine.subscribe();

        engine.search(coord(28.6, 77.2), false);
        settle().await;

        assert!(rx.has_changed().unwrap());
        let results = rx.borrow_and_update().clone();
        assert_eq!(results.clinics.len(), 1);
        assert_eq!(results.clinics[0].name, "Oak Clinic");
        assert_eq!(results.anchor, Some(coord(28.6, 77.2)));
        assert_eq!(results.completed_queries, 1);
        assert!(results.updated_at.is_some());
        assert!(!results.fetching);
    }

    #[tokio::test(start_paused = true)]
    async fn overload_fails_over_and_remembers_mirror() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.script(MIRRORS[0], Reply::Overloaded(429));
        backend.script(MIRRORS[1], Reply::Clinics(vec![clinic(1, "A", "clinic")]));
        let mut engine = engine(&backend);

        engine.search(coord(1.0, 1.0), false);
        settle().await;
        assert_eq!(engine.mirror_index(), 1);
        assert_eq!(engine.results().clinics.len(), 1);

        engine.search(coord(2.0, 2.0), false);
        settle().await;
        assert_eq!(
            backend.endpoints_called(),
            vec![MIRRORS[0], MIRRORS[1], MIRRORS[1]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_pool_keeps_previous_clinics() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.script(MIRRORS[0], Reply::Clinics(vec![clinic(1, "A", "clinic")]));
        let mut engine = engine(&backend);

        engine.search(coord(1.0, 1.0), false);
        settle().await;

        for mirror in MIRRORS {
            backend.script(mirror, Reply::Overloaded(502));
        }
        engine.search(coord(2.0, 2.0), false);
        settle().await;

        let results = engine.results();
        assert_eq!(backend.calls().len(), 4);
        assert!(!results.fetching);
        assert_eq!(results.clinics.len(), 1);
        assert_eq!(results.anchor, Some(coord(1.0, 1.0)));
        assert_eq!(
            results.last_error,
            Some(SearchFailure::MirrorsExhausted {
                attempts: 3,
                last_status: 502
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_success_clears_stale_clinics() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.script(MIRRORS[0], Reply::Clinics(vec![clinic(1, "A", "clinic")]));
        backend.script(MIRRORS[0], Reply::Clinics(Vec::new()));
        let mut engine = engine(&backend);

        engine.search(coord(1.0, 1.0), false);
        settle().await;
        assert_eq!(engine.results().clinics.len(), 1);

        engine.search(coord(2.0, 2.0), false);
        settle().await;
        let results = engine.results();
        assert!(results.clinics.is_empty());
        assert_eq!(results.completed_queries, 2);
        assert!(results.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_and_network_failures_keep_previous_clinics() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.script(MIRRORS[0], Reply::Clinics(vec![clinic(1, "A", "clinic")]));
        backend.script(MIRRORS[0], Reply::Invalid);
        backend.script(MIRRORS[0], Reply::Network);
        let mut engine = engine(&backend);

        engine.search(coord(1.0, 1.0), false);
        settle().await;

        engine.search(coord(2.0, 2.0), false);
        settle().await;
        let results = engine.results();
        assert_eq!(results.clinics.len(), 1);
        assert_eq!(results.last_error.as_ref().map(SearchFailure::kind), Some("invalid_response"));

        engine.search(coord(3.0, 3.0), false);
        settle().await;
        let results = engine.results();
        assert_eq!(results.clinics.len(), 1);
        assert_eq!(results.last_error.as_ref().map(SearchFailure::kind), Some("network"));
        assert!(!results.fetching);
        assert_eq!(backend.calls().len(), 3);
        assert_eq!(engine.mirror_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_search_discards_in_flight_result() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.script(
            MIRRORS[0],
            Reply::Slow(Duration::from_secs(3), vec![clinic(1, "Stale", "clinic")]),
        );
        backend.script(MIRRORS[0], Reply::Clinics(vec![clinic(2, "Fresh", "clinic")]));
        let mut engine = engine(&backend);

        engine.search(coord(1.0, 1.0), false);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.calls().len(), 1);

        engine.search(coord(2.0, 2.0), false);
        settle().await;

        let results = engine.results();
        assert_eq!(results.clinics.len(), 1);
        assert_eq!(results.clinics[0].name, "Fresh");
        assert_eq!(results.completed_queries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_stop_pending_searches() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut engine = engine(&backend);

        engine.search(coord(1.0, 1.0), false);
        assert!(engine.cancel());
        assert!(!engine.is_fetching());
        settle().await;
        assert!(backend.calls().is_empty());

        engine.search(coord(1.0, 1.0), false);
        drop(engine);
        settle().await;
        assert!(backend.calls().is_empty());
    }
}

//! Map view composition.
//!
//! [`MapView`] owns the viewport controller, the query engine and the
//! location provider, and exposes every UI interaction as a named event.
//! Rendering front-ends read a [`MapFrame`] snapshot instead of poking at
//! the individual components.

use std::sync::Arc;
use std::time::Duration;

use clinic_map_clinic_models::{Clinic, Coordinate};
use tokio::sync::watch;

use crate::engine::{ClinicQueryEngine, ClinicResults};
use crate::geolocation::{GeoLocationProvider, LocationError};
use crate::viewport::{SearchButton, ViewportController};

/// Message shown once when the user's location cannot be determined.
pub const LOCATION_ALERT: &str = "Please enable location access in your browser settings.";

/// Zoom level of a fly-to towards a selected clinic.
pub const FLY_TO_ZOOM: u8 = 16;

/// Animated camera transition request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyTo {
    pub target: Coordinate,
    pub zoom: u8,
    pub duration: Duration,
    pub ease_linearity: f64,
}

impl FlyTo {
    /// Standard fly-to used for clinic selection.
    #[must_use]
    pub const fn to(target: Coordinate) -> Self {
        Self {
            target,
            zoom: FLY_TO_ZOOM,
            duration: Duration::from_millis(1500),
            ease_linearity: 0.25,
        }
    }
}

/// Where the map is looking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub center: Coordinate,
    pub zoom: u8,
}

/// One rendered clinic marker and its popup content.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicMarker {
    pub id: i64,
    pub position: Coordinate,
    pub name: String,
    pub facility_type: String,
    pub maps_url: String,
}

impl From<&Clinic> for ClinicMarker {
    fn from(clinic: &Clinic) -> Self {
        Self {
            id: clinic.id,
            position: clinic.position,
            name: clinic.name.clone(),
            facility_type: clinic.facility_type.clone(),
            maps_url: clinic.maps_url(),
        }
    }
}

/// Everything a front-end needs to draw the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFrame {
    /// A location request is outstanding.
    pub loading: bool,
    /// A clinic search is scheduled or running.
    pub fetching: bool,
    /// Draggable user marker, present once a location is known.
    pub user_marker: Option<Coordinate>,
    pub clinics: Vec<ClinicMarker>,
    pub search_button: SearchButton,
    pub camera: Camera,
    /// Pending fly-to, if one has not been consumed yet.
    pub fly_to: Option<FlyTo>,
}

/// Clinic map state driven by named UI events.
///
/// Must be used from within a Tokio runtime. Dropping the view (or
/// calling [`teardown`](Self::teardown)) cancels any pending search.
pub struct MapView {
    provider: Arc<dyn GeoLocationProvider>,
    engine: ClinicQueryEngine,
    viewport: ViewportController,
    loading: bool,
    selected: Option<Clinic>,
    fly_to: Option<FlyTo>,
    alert: Option<&'static str>,
}

impl std::fmt::Debug for MapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapView")
            .field("engine", &self.engine)
            .field("viewport", &self.viewport)
            .field("loading", &self.loading)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl MapView {
    /// Creates a view centered on `fallback` with no user location.
    #[must_use]
    pub fn new(
        provider: Arc<dyn GeoLocationProvider>,
        engine: ClinicQueryEngine,
        fallback: Coordinate,
    ) -> Self {
        Self {
            provider,
            engine,
            viewport: ViewportController::new(fallback),
            loading: false,
            selected: None,
            fly_to: None,
            alert: None,
        }
    }

    /// Requests the user's location and searches around it.
    ///
    /// On failure the map stays where it is, an alert is queued and no
    /// search is issued.
    pub async fn find_me(&mut self) {
        self.loading = true;
        match self.provider.request_current_position().await {
            Ok(position) => self.on_location_acquired(position),
            Err(e) => self.on_location_failed(e),
        }
    }

    /// A location became available: anchor there, move the camera, search.
    pub fn on_location_acquired(&mut self, position: Coordinate) {
        log::info!("Location acquired at {position}");
        self.loading = false;
        self.viewport.recenter(position);
        self.engine.search(position, false);
    }

    /// The location request failed.
    pub fn on_location_failed(&mut self, error: LocationError) {
        log::warn!(
            "Location unavailable ({error}), staying at {}",
            self.viewport.state().user_position
        );
        self.loading = false;
        self.alert = Some(LOCATION_ALERT);
    }

    /// Map move-end. Returns `true` if the search button just appeared.
    pub fn on_viewport_moved(&mut self, center: Coordinate, zoom: u8) -> bool {
        self.viewport.on_viewport_moved(center, zoom)
    }

    /// Map click: re-anchor and search at the clicked point.
    pub fn on_map_clicked(&mut self, position: Coordinate) {
        self.viewport.anchor_at(position);
        self.engine.search(position, false);
    }

    /// User marker drag-end. Ignored (returns `false`) while no marker is
    /// shown.
    pub fn on_marker_dragged(&mut self, position: Coordinate) -> bool {
        if !self.viewport.state().has_user_location {
            log::debug!("Ignoring marker drag before a location is known");
            return false;
        }
        self.viewport.anchor_at(position);
        self.engine.search(position, false);
        true
    }

    /// "Search this area" pressed. Returns `false` if the button was not
    /// visible.
    pub fn search_this_area(&mut self) -> bool {
        match self.viewport.search_this_area() {
            Some(center) => {
                self.engine.search(center, false);
                true
            }
            None => false,
        }
    }

    /// Selects a clinic (fly-to) or clears the selection.
    ///
    /// Never changes the search anchor and never queries.
    pub fn select_clinic(&mut self, clinic: Option<Clinic>) {
        if let Some(clinic) = &clinic {
            self.fly_to = Some(FlyTo::to(clinic.position));
        }
        self.selected = clinic;
    }

    #[must_use]
    pub const fn selected(&self) -> Option<&Clinic> {
        self.selected.as_ref()
    }

    /// Consumes the pending fly-to request.
    pub fn take_fly_to(&mut self) -> Option<FlyTo> {
        self.fly_to.take()
    }

    /// Consumes the pending alert, so it is shown only once.
    pub fn take_alert(&mut self) -> Option<&'static str> {
        self.alert.take()
    }

    /// Clinics from the most recent successful search, in provider order.
    #[must_use]
    pub fn clinics(&self) -> Vec<Clinic> {
        self.engine.results().clinics
    }

    /// Current clinics matching `needle` by name or type.
    #[must_use]
    pub fn filtered_clinics(&self, needle: &str) -> Vec<Clinic> {
        self.clinics()
            .into_iter()
            .filter(|c| c.matches_filter(needle))
            .collect()
    }

    #[must_use]
    pub fn results(&self) -> ClinicResults {
        self.engine.results()
    }

    /// Subscribes to result updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ClinicResults> {
        self.engine.subscribe()
    }

    #[must_use]
    pub const fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    #[must_use]
    pub const fn engine(&self) -> &ClinicQueryEngine {
        &self.engine
    }

    /// Snapshot of the render state.
    #[must_use]
    pub fn frame(&self) -> MapFrame {
        let state = self.viewport.state();
        let results = self.engine.results();
        MapFrame {
            loading: self.loading,
            fetching: results.fetching,
            user_marker: state.has_user_location.then_some(state.user_position),
            clinics: results.clinics.iter().map(ClinicMarker::from).collect(),
            search_button: self.viewport.search_button(),
            camera: Camera {
                center: state.map_center,
                zoom: state.zoom,
            },
            fly_to: self.fly_to,
        }
    }

    /// Cancels any pending search. The view stays usable.
    pub fn teardown(&mut self) {
        if self.engine.cancel() {
            log::debug!("Cancelled pending clinic search on teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use clinic_map_clinic_models::DEFAULT_CENTER;
    use clinic_map_overpass::ClinicBackend;

    use super::*;
    use crate::engine::SearchTiming;
    use crate::geolocation::FixedLocationProvider;
    use crate::test_support::{MIRRORS, Reply, ScriptedBackend, clinic, coord, pool};

    fn view(backend: &Arc<ScriptedBackend>, provider: FixedLocationProvider) -> MapView {
        let engine = ClinicQueryEngine::new(
            Arc::clone(backend) as Arc<dyn ClinicBackend>,
            pool(),
            5000,
            SearchTiming::default(),
        );
        MapView::new(Arc::new(provider), engine, DEFAULT_CENTER)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn denied_location_falls_back_without_querying() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut view = view(
            &backend,
            FixedLocationProvider::failing(LocationError::PermissionDenied),
        );

        view.find_me().await;
        settle().await;

        let frame = view.frame();
        assert!(!frame.loading);
        assert!(!frame.fetching);
        assert_eq!(frame.camera.center, coord(28.6139, 77.209));
        assert_eq!(frame.user_marker, None);
        assert!(backend.calls().is_empty());

        assert_eq!(view.take_alert(), Some(LOCATION_ALERT));
        assert_eq!(view.take_alert(), None);

        view.on_map_clicked(coord(28.62, 77.21));
        settle().await;
        assert_eq!(backend.calls().len(), 1);
        assert_eq!(view.frame().user_marker, Some(coord(28.62, 77.21)));
    }

    #[tokio::test(start_paused = true)]
    async fn acquired_location_centers_and_searches() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.script(
            MIRRORS[0],
            Reply::Clinics(vec![clinic(7, "Oak Clinic", "psychologist")]),
        );
        let here = coord(51.5, -0.12);
        let mut view = view(&backend, FixedLocationProvider::at(here));

        view.find_me().await;
        assert!(view.frame().fetching);
        settle().await;

        let frame = view.frame();
        assert_eq!(frame.camera.center, here);
        assert_eq!(frame.camera.zoom, 14);
        assert_eq!(frame.user_marker, Some(here));
        assert_eq!(frame.clinics.len(), 1);
        assert_eq!(frame.clinics[0].id, 7);
        assert_eq!(frame.clinics[0].facility_type, "psychologist");
        assert!(frame.clinics[0].maps_url.starts_with("https://www.google.com/maps?q="));
        assert_eq!(backend.calls()[0].center, here);
        assert_eq!(view.take_alert(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn two_km_pan_offers_area_search() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut view = view(&backend, FixedLocationProvider::at(DEFAULT_CENTER));
        view.find_me().await;
        settle().await;
        assert_eq!(backend.calls().len(), 1);

        let panned = coord(DEFAULT_CENTER.lat + 0.018, DEFAULT_CENTER.lon);
        assert!(view.on_viewport_moved(panned, 14));
        settle().await;
        assert_eq!(view.frame().search_button, SearchButton::Visible);
        assert_eq!(backend.calls().len(), 1);

        assert!(view.search_this_area());
        assert_eq!(view.frame().search_button, SearchButton::Hidden);
        assert_eq!(view.viewport().state().user_position, panned);
        settle().await;

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].center, panned);
        assert!(!view.search_this_area());
    }

    #[tokio::test(start_paused = true)]
    async fn small_pan_does_not_offer_area_search() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut view = view(&backend, FixedLocationProvider::at(DEFAULT_CENTER));
        view.find_me().await;

        let nudged = coord(DEFAULT_CENTER.lat + 0.004, DEFAULT_CENTER.lon + 0.004);
        assert!(!view.on_viewport_moved(nudged, 15));
        assert_eq!(view.frame().search_button, SearchButton::Hidden);
        assert_eq!(view.frame().camera.zoom, 15);
    }

    #[tokio::test(start_paused = true)]
    async fn click_reanchors_and_hides_button() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut view = view(&backend, FixedLocationProvider::at(DEFAULT_CENTER));
        view.find_me().await;
        view.on_viewport_moved(coord(28.7, 77.3), 14);
        assert_eq!(view.frame().search_button, SearchButton::Visible);

        view.on_map_clicked(coord(28.69, 77.29));
        settle().await;

        assert_eq!(view.frame().search_button, SearchButton::Hidden);
        assert_eq!(view.viewport().state().user_position, coord(28.69, 77.29));
        let calls = backend.calls();
        assert_eq!(calls.len(), 1, "location search was superseded by the click");
        assert_eq!(calls[0].center, coord(28.69, 77.29));
    }

    #[tokio::test(start_paused = true)]
    async fn marker_drag_requires_known_location() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut view = view(
            &backend,
            FixedLocationProvider::failing(LocationError::Timeout),
        );
        view.find_me().await;
        assert!(!view.on_marker_dragged(coord(28.6, 77.2)));

        view.on_map_clicked(coord(28.6, 77.2));
        assert!(view.on_marker_dragged(coord(28.61, 77.21)));
        settle().await;

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].center, coord(28.61, 77.21));
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_clinic_flies_without_requerying() {
        let backend = Arc::new(ScriptedBackend::default());
        let oak = clinic(1, "Oak Clinic", "psychologist");
        backend.script(MIRRORS[0], Reply::Clinics(vec![oak.clone()]));
        let mut view = view(&backend, FixedLocationProvider::at(DEFAULT_CENTER));
        view.find_me().await;
        settle().await;

        view.select_clinic(Some(oak.clone()));
        assert_eq!(view.frame().fly_to.map(|f| f.target), Some(oak.position));
        let fly_to = view.take_fly_to().unwrap();
        assert_eq!(fly_to.zoom, FLY_TO_ZOOM);
        assert_eq!(fly_to.duration, Duration::from_millis(1500));
        assert!((fly_to.ease_linearity - 0.25).abs() < f64::EPSILON);
        assert_eq!(view.take_fly_to(), None);
        settle().await;

        assert_eq!(backend.calls().len(), 1);
        assert_eq!(view.viewport().state().user_position, DEFAULT_CENTER);
        assert_eq!(view.selected(), Some(&oak));

        view.select_clinic(None);
        assert_eq!(view.selected(), None);
        assert_eq!(view.take_fly_to(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn filters_current_clinics() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.script(
            MIRRORS[0],
            Reply::Clinics(vec![
                clinic(1, "Oak Clinic", "psychologist"),
                clinic(2, "City Hospital", "hospital"),
                clinic(3, "Mind Care", "psychiatrist"),
            ]),
        );
        let mut view = view(&backend, FixedLocationProvider::at(DEFAULT_CENTER));
        view.find_me().await;
        settle().await;

        let ids = |clinics: Vec<Clinic>| clinics.iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids(view.filtered_clinics("")), vec![1, 2, 3]);
        assert_eq!(ids(view.filtered_clinics("PSYCH")), vec![1, 3]);
        assert_eq!(ids(view.filtered_clinics("hospital")), vec![2]);
        assert!(view.filtered_clinics("dentist").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_search() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut view = view(&backend, FixedLocationProvider::at(DEFAULT_CENTER));
        view.find_me().await;
        assert!(view.frame().fetching);

        view.teardown();
        assert!(!view.frame().fetching);
        settle().await;
        assert!(backend.calls().is_empty());
    }
}

//! Map viewport bookkeeping.
//!
//! The search anchor (`user_position`) and the point the map is looking at
//! (`map_center`) are tracked separately. Panning never queries by itself;
//! it only reveals the "search this area" button once the map center has
//! drifted past [`SEARCH_AREA_THRESHOLD_DEGREES`] from the anchor.

use clinic_map_clinic_models::Coordinate;
use strum_macros::{AsRefStr, Display};

/// Euclidean drift (in degrees) past which the search button appears.
/// Roughly 1 km at mid-latitudes.
pub const SEARCH_AREA_THRESHOLD_DEGREES: f64 = 0.01;

/// Zoom level used when the map is (re)centered on the anchor.
pub const DEFAULT_ZOOM: u8 = 14;

/// Where the map is and what the search is anchored to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    /// Search anchor.
    pub user_position: Coordinate,
    /// Current map center.
    pub map_center: Coordinate,
    /// Current zoom level.
    pub zoom: u8,
    /// Whether `user_position` came from the user (location, click, or
    /// drag) rather than the fallback.
    pub has_user_location: bool,
}

/// "Search this area" affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SearchButton {
    /// Not shown.
    #[default]
    Hidden,
    /// Shown; the map has drifted away from the anchor.
    Visible,
}

/// Viewport state plus the search-button state machine.
///
/// | From | Event | To |
/// |---|---|---|
/// | `Hidden` | viewport moved beyond the threshold | `Visible` |
/// | `Visible` | [`search_this_area`](Self::search_this_area) | `Hidden` |
/// | any | [`anchor_at`](Self::anchor_at) (click / drag) | `Hidden` |
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    state: ViewportState,
    button: SearchButton,
}

impl ViewportController {
    /// Starts centered on `fallback` with no user location.
    #[must_use]
    pub const fn new(fallback: Coordinate) -> Self {
        Self {
            state: ViewportState {
                user_position: fallback,
                map_center: fallback,
                zoom: DEFAULT_ZOOM,
                has_user_location: false,
            },
            button: SearchButton::Hidden,
        }
    }

    /// Current viewport state.
    #[must_use]
    pub const fn state(&self) -> &ViewportState {
        &self.state
    }

    /// Current search-button state.
    #[must_use]
    pub const fn search_button(&self) -> SearchButton {
        self.button
    }

    /// Euclidean distance in degrees between map center and anchor.
    #[must_use]
    pub fn drift(&self) -> f64 {
        self.state
            .map_center
            .degree_distance(&self.state.user_position)
    }

    /// Handles a move-end event. Returns `true` if the search button just
    /// became visible.
    pub fn on_viewport_moved(&mut self, center: Coordinate, zoom: u8) -> bool {
        self.state.map_center = center;
        self.state.zoom = zoom;

        if self.button == SearchButton::Hidden && self.drift() > SEARCH_AREA_THRESHOLD_DEGREES {
            log::debug!(
                "Map center {center} drifted {:.4} deg from anchor, offering area search",
                self.drift()
            );
            self.button = SearchButton::Visible;
            return true;
        }
        false
    }

    /// Re-anchors the search at `position` (map click or marker drag)
    /// and hides the search button. The camera does not move.
    pub fn anchor_at(&mut self, position: Coordinate) {
        self.state.user_position = position;
        self.state.has_user_location = true;
        self.button = SearchButton::Hidden;
    }

    /// Anchors at an acquired location and moves the camera there.
    pub fn recenter(&mut self, position: Coordinate) {
        self.state.user_position = position;
        self.state.map_center = position;
        self.state.zoom = DEFAULT_ZOOM;
        self.state.has_user_location = true;
    }

    /// Re-anchors at the current map center if the button is visible.
    ///
    /// Returns the new anchor to search around, or `None` if the button was
    /// hidden.
    pub fn search_this_area(&mut self) -> Option<Coordinate> {
        if self.button == SearchButton::Hidden {
            return None;
        }
        let center = self.state.map_center;
        self.state.user_position = center;
        self.button = SearchButton::Hidden;
        Some(center)
    }
}

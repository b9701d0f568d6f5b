//! Interactive map session.
//!
//! Drives a [`MapView`] from a `dialoguer` menu: every menu entry is one of
//! the map's named events (click, drag, pan, search this area, select), and
//! the `fetching` flag is rendered as a spinner while a search runs.

use std::sync::Arc;

use clinic_map_cli_utils::{FetchSpinner, MultiProgress};
use clinic_map_clinic_models::{Clinic, Coordinate};
use clinic_map_locator::{
    ClinicQueryEngine, FixedLocationProvider, GeoLocationProvider, IpLocationProvider,
    LocationError, LocatorConfig, MapView,
};
use clinic_map_overpass::OverpassConfig;
use dialoguer::{Input, Select};

use crate::table;

/// How the session learns the user's location.
enum LocationSource {
    IpLookup,
    Manual,
    Deny,
}

impl LocationSource {
    const ALL: &[Self] = &[Self::IpLookup, Self::Manual, Self::Deny];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::IpLookup => "Approximate from my IP address",
            Self::Manual => "Enter coordinates",
            Self::Deny => "Don't share my location",
        }
    }
}

/// Map interactions offered by the menu.
enum MapAction {
    FindMe,
    ClickMap,
    DragMarker,
    PanMap,
    SearchArea,
    SelectClinic,
    Filter,
    ShowFrame,
    Quit,
}

impl MapAction {
    const ALL: &[Self] = &[
        Self::FindMe,
        Self::ClickMap,
        Self::DragMarker,
        Self::PanMap,
        Self::SearchArea,
        Self::SelectClinic,
        Self::Filter,
        Self::ShowFrame,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::FindMe => "Find me",
            Self::ClickMap => "Click the map (search at a point)",
            Self::DragMarker => "Drag my marker",
            Self::PanMap => "Pan the map",
            Self::SearchArea => "Search this area",
            Self::SelectClinic => "Select a clinic",
            Self::Filter => "Filter the list",
            Self::ShowFrame => "Show map state",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the interactive map session until the user quits.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the HTTP client cannot
/// be built, or a prompt fails.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Clinic Map");
    println!();

    let overpass = OverpassConfig::from_env()?;
    let locator = LocatorConfig::from_env()?;
    let engine = ClinicQueryEngine::from_config(&overpass, locator.timing)?;
    let provider = pick_location_source(locator.fallback)?;
    let mut view = MapView::new(provider, engine, locator.fallback);
    let mut spinner = FetchSpinner::new(multi, "Searching nearby clinics...");

    locate(&mut view, multi).await;

    loop {
        settle(&view, &mut spinner).await;

        let labels: Vec<&str> = MapAction::ALL.iter().map(MapAction::label).collect();
        let idx = Select::new()
            .with_prompt("Map")
            .items(&labels)
            .default(0)
            .interact()?;

        match MapAction::ALL[idx] {
            MapAction::FindMe => locate(&mut view, multi).await,
            MapAction::ClickMap => {
                let at = prompt_coordinate("Click at", view.viewport().state().map_center)?;
                view.on_map_clicked(at);
            }
            MapAction::DragMarker => {
                let from = view.viewport().state().user_position;
                let to = prompt_coordinate("Drop marker at", from)?;
                if !view.on_marker_dragged(to) {
                    println!("There is no marker yet. Use \"Find me\" or click the map first.");
                }
            }
            MapAction::PanMap => {
                let state = *view.viewport().state();
                let center = prompt_coordinate("Move map center to", state.map_center)?;
                let zoom: u8 = Input::new()
                    .with_prompt("Zoom")
                    .default(state.zoom)
                    .interact_text()?;
                if view.on_viewport_moved(center, zoom) {
                    println!("The map moved away from your search. \"Search this area\" is now available.");
                }
            }
            MapAction::SearchArea => {
                if !view.search_this_area() {
                    println!("The map is still over your search area. Pan further away first.");
                }
            }
            MapAction::SelectClinic => select_clinic(&mut view)?,
            MapAction::Filter => {
                let needle: String = Input::new()
                    .with_prompt("Name or type contains")
                    .allow_empty(true)
                    .interact_text()?;
                let anchor = view.viewport().state().user_position;
                table::print_clinics(&view.filtered_clinics(&needle), &anchor);
            }
            MapAction::ShowFrame => print_frame(&view),
            MapAction::Quit => break,
        }
    }

    view.teardown();
    Ok(())
}

/// Asks how to resolve the user's location.
fn pick_location_source(
    fallback: Coordinate,
) -> Result<Arc<dyn GeoLocationProvider>, Box<dyn std::error::Error>> {
    let labels: Vec<&str> = LocationSource::ALL
        .iter()
        .map(LocationSource::label)
        .collect();

    let idx = Select::new()
        .with_prompt("Share your location?")
        .items(&labels)
        .default(0)
        .interact()?;

    let provider: Arc<dyn GeoLocationProvider> = match LocationSource::ALL[idx] {
        LocationSource::IpLookup => Arc::new(IpLocationProvider::new()?),
        LocationSource::Manual => {
            Arc::new(FixedLocationProvider::at(prompt_coordinate("Your location", fallback)?))
        }
        LocationSource::Deny => Arc::new(FixedLocationProvider::failing(
            LocationError::PermissionDenied,
        )),
    };
    Ok(provider)
}

/// Requests the location, showing a spinner meanwhile, and prints the
/// one-time alert if it failed.
async fn locate(view: &mut MapView, multi: &MultiProgress) {
    let mut spinner = FetchSpinner::new(multi, "Locating you...");
    spinner.set_active(true);
    view.find_me().await;
    spinner.set_active(false);

    if let Some(alert) = view.take_alert() {
        println!("{alert}");
        println!(
            "Showing the map at {}. Click the map to search somewhere.",
            view.viewport().state().map_center
        );
    }
}

/// Waits for any pending search to finish, then prints its outcome.
async fn settle(view: &MapView, spinner: &mut FetchSpinner) {
    let mut results = view.subscribe();
    if !results.borrow().fetching {
        return;
    }

    spinner.set_active(true);
    let outcome = match results.wait_for(|r| !r.fetching).await {
        Ok(latest) => latest.clone(),
        Err(e) => {
            log::error!("Search results channel closed: {e}");
            spinner.set_active(false);
            return;
        }
    };
    spinner.set_active(false);

    if let Some(failure) = &outcome.last_error {
        println!("Search failed ({failure}). Showing the previous results.");
    }
    let anchor = view.viewport().state().user_position;
    table::print_clinics(&outcome.clinics, &anchor);
}

/// Lets the user pick a clinic from the current list and flies to it.
fn select_clinic(view: &mut MapView) -> Result<(), Box<dyn std::error::Error>> {
    let clinics = view.clinics();
    if clinics.is_empty() {
        println!("No clinics to select.");
        return Ok(());
    }

    let mut labels: Vec<String> = clinics.iter().map(table::clinic_label).collect();
    labels.push("Clear selection".to_string());

    let idx = Select::new()
        .with_prompt("Clinic")
        .items(&labels)
        .default(0)
        .interact()?;

    let clinic = clinics.into_iter().nth(idx);
    let link = clinic.as_ref().map(Clinic::maps_url);
    view.select_clinic(clinic);

    if let Some(fly_to) = view.take_fly_to() {
        println!(
            "Flying to {} (zoom {}, {:.1}s)",
            fly_to.target,
            fly_to.zoom,
            fly_to.duration.as_secs_f64()
        );
    }
    if let Some(link) = link {
        println!("Open in maps: {link}");
    }
    Ok(())
}

fn print_frame(view: &MapView) {
    let frame = view.frame();
    println!();
    println!("Camera:        {} @ zoom {}", frame.camera.center, frame.camera.zoom);
    match frame.user_marker {
        Some(marker) => println!("Your marker:   {marker}"),
        None => println!("Your marker:   (location unknown)"),
    }
    println!("Search button: {}", frame.search_button);
    println!("Fetching:      {}", frame.fetching);
    println!("Markers:       {}", frame.clinics.len());
    for marker in &frame.clinics {
        println!("  - {} ({}) {}", marker.name, marker.facility_type, marker.maps_url);
    }
    if let Some(selected) = view.selected() {
        println!("Selected:      {}", selected.name);
    }
    let results = view.results();
    if let Some(updated) = results.updated_at {
        println!(
            "Last update:   {} ({} searches, mirror #{})",
            updated.format("%H:%M:%S"),
            results.completed_queries,
            view.engine().mirror_index() + 1
        );
    }
}

/// Prompts for a `lat, lon` pair, re-asking until it is valid.
fn prompt_coordinate(
    prompt: &str,
    default: Coordinate,
) -> Result<Coordinate, Box<dyn std::error::Error>> {
    loop {
        let raw: String = Input::new()
            .with_prompt(format!("{prompt} (lat, lon)"))
            .default(format!("{:.5}, {:.5}", default.lat, default.lon))
            .interact_text()?;

        match parse_coordinate(&raw) {
            Some(coordinate) => return Ok(coordinate),
            None => println!("Expected \"lat, lon\" with lat in [-90, 90] and lon in [-180, 180]."),
        }
    }
}

fn parse_coordinate(raw: &str) -> Option<Coordinate> {
    let (lat, lon) = raw.split_once(',')?;
    Coordinate::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?).ok()
}

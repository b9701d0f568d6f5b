//! Plain-text rendering of clinic lists.

use clinic_map_clinic_models::{Clinic, Coordinate};

/// Prints `clinics` as a table, with distances from `anchor`.
pub fn print_clinics(clinics: &[Clinic], anchor: &Coordinate) {
    if clinics.is_empty() {
        println!("No clinics found near {anchor}.");
        return;
    }

    println!();
    println!(
        "{:<4} {:<32} {:<14} {:>9}  ADDRESS",
        "#", "NAME", "TYPE", "DISTANCE"
    );
    println!("{}", "-".repeat(100));

    for (index, clinic) in clinics.iter().enumerate() {
        println!(
            "{:<4} {:<32} {:<14} {:>9}  {}",
            index + 1,
            truncate(&clinic.name, 32),
            truncate(&clinic.facility_type, 14),
            format_distance(anchor.haversine_meters(&clinic.position)),
            clinic.address
        );
    }

    println!("\n{} clinic(s) near {anchor}", clinics.len());
}

/// One-line label used in selection menus.
pub fn clinic_label(clinic: &Clinic) -> String {
    format!(
        "{} ({}) - {}",
        clinic.name, clinic.facility_type, clinic.address
    )
}

/// Formats meters as `850 m` or `1.2 km`.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// Shortens `text` to at most `max` characters, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

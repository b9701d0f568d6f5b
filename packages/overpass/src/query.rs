//! Overpass QL construction for clinic searches.
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API/Overpass_QL>

use clinic_map_clinic_models::{AmenityTag, Coordinate, HealthcareTag};

/// Default search radius around the anchor, in meters.
pub const DEFAULT_RADIUS_METERS: u32 = 5000;

/// Server-side evaluation timeout embedded in the query, in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u32 = 25;

/// A radius search for care facilities around a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClinicQuery {
    /// Search anchor.
    pub center: Coordinate,
    /// Search radius in meters.
    pub radius_meters: u32,
    /// `[timeout:N]` setting sent to the server.
    pub timeout_secs: u32,
}

impl ClinicQuery {
    /// Creates a query with the default radius and timeout.
    #[must_use]
    pub const fn new(center: Coordinate) -> Self {
        Self {
            center,
            radius_meters: DEFAULT_RADIUS_METERS,
            timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }

    /// Returns a copy of this query with a different radius.
    #[must_use]
    pub const fn with_radius(mut self, radius_meters: u32) -> Self {
        self.radius_meters = radius_meters;
        self
    }

    /// Renders the query as Overpass QL.
    ///
    /// Two node sets are unioned: `healthcare` professionals and
    /// `amenity` facilities, each restricted to `around:radius,lat,lon`.
    #[must_use]
    pub fn to_overpass_ql(&self) -> String {
        let healthcare = HealthcareTag::all()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("|");
        let amenity = AmenityTag::all()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("|");
        let around = format!(
            "(around:{},{},{})",
            self.radius_meters, self.center.lat, self.center.lon
        );

        format!(
            "[out:json][timeout:{timeout}];\n\
             (\n  \
             node[\"healthcare\"~\"{healthcare}\"]{around};\n  \
             node[\"amenity\"~\"{amenity}\"]{around};\n\
             );\n\
             out body;",
            timeout = self.timeout_secs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_both_node_sets_around_center() {
        let query = ClinicQuery::new(Coordinate::new(28.6139, 77.209).unwrap());
        let ql = query.to_overpass_ql();

        assert!(ql.starts_with("[out:json][timeout:25];"));
        assert!(ql.contains(
            "node[\"healthcare\"~\"psychologist|psychiatrist\"](around:5000,28.6139,77.209);"
        ));
        assert!(ql.contains("node[\"amenity\"~\"hospital|clinic\"](around:5000,28.6139,77.209);"));
        assert!(ql.trim_end().ends_with("out body;"));
    }

    #[test]
    fn radius_override_applies_to_both_sets() {
        let query = ClinicQuery::new(Coordinate::new(1.0, 2.0).unwrap()).with_radius(1200);
        let ql = query.to_overpass_ql();
        assert_eq!(ql.matches("(around:1200,1,2)").count(), 2);
    }
}

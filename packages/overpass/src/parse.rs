//! Response classification and element parsing.
//!
//! Overpass answers `{ "elements": [ { "id", "lat", "lon", "tags" } ] }`
//! for `[out:json]` queries. A 200 response may also carry a `remark`
//! when the server aborted evaluation part-way (e.g. a runtime timeout);
//! the elements it did return are still used.

use std::collections::BTreeMap;

use clinic_map_clinic_models::{Clinic, Coordinate};
use reqwest::StatusCode;

use crate::OverpassError;

/// Maximum length of the body preview included in error messages.
const BODY_PREVIEW_LEN: usize = 300;

/// Decides whether a response is worth decoding.
///
/// # Errors
///
/// * [`OverpassError::Overloaded`] for HTTP 429 and every 5xx status.
/// * [`OverpassError::InvalidResponse`] for any other non-2xx status, or
///   a 2xx response whose content type is not JSON.
pub fn classify_status(
    status: StatusCode,
    content_type: Option<&str>,
) -> Result<(), OverpassError> {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Err(OverpassError::Overloaded {
            status: status.as_u16(),
        });
    }

    if !status.is_success() {
        return Err(OverpassError::InvalidResponse {
            message: format!("HTTP {status}"),
        });
    }

    match content_type {
        Some(ct) if ct.contains("application/json") => Ok(()),
        other => Err(OverpassError::InvalidResponse {
            message: format!("unexpected content-type {other:?}"),
        }),
    }
}

/// Decodes a response body as JSON.
///
/// # Errors
///
/// Returns [`OverpassError::InvalidResponse`] with a body preview if the
/// text is not valid JSON.
pub fn decode_body(text: &str) -> Result<serde_json::Value, OverpassError> {
    serde_json::from_str(text).map_err(|e| {
        let preview = if text.len() > BODY_PREVIEW_LEN {
            let mut end = BODY_PREVIEW_LEN;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &text[..end])
        } else {
            text.to_string()
        };
        OverpassError::InvalidResponse {
            message: format!(
                "JSON parse failed: {e} (received {} bytes, body preview: {preview})",
                text.len()
            ),
        }
    })
}

/// Normalizes an Overpass JSON document into clinics.
///
/// A document without an `elements` key (or with `null`) is a legitimate
/// "nothing found" answer and yields an empty list. Elements lacking an
/// id or a valid position are skipped.
///
/// # Errors
///
/// Returns [`OverpassError::InvalidResponse`] if the document is not an
/// object or `elements` is not an array.
pub fn parse_elements(body: &serde_json::Value) -> Result<Vec<Clinic>, OverpassError> {
    let object = body
        .as_object()
        .ok_or_else(|| OverpassError::InvalidResponse {
            message: "Overpass response is not a JSON object".to_string(),
        })?;

    if let Some(remark) = object.get("remark").and_then(serde_json::Value::as_str) {
        log::warn!("Overpass remark: {remark}");
    }

    let elements = match object.get("elements") {
        None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(value) => value
            .as_array()
            .ok_or_else(|| OverpassError::InvalidResponse {
                message: "Overpass 'elements' is not an array".to_string(),
            })?,
    };

    Ok(elements.iter().filter_map(parse_element).collect())
}

fn parse_element(element: &serde_json::Value) -> Option<Clinic> {
    let Some(id) = element["id"].as_i64() else {
        log::debug!("Skipping Overpass element without id: {element}");
        return None;
    };

    let position = match (element["lat"].as_f64(), element["lon"].as_f64()) {
        (Some(lat), Some(lon)) => match Coordinate::new(lat, lon) {
            Ok(position) => position,
            Err(e) => {
                log::debug!("Skipping Overpass element {id}: {e}");
                return None;
            }
        },
        _ => {
            log::debug!("Skipping Overpass element {id} without lat/lon");
            return None;
        }
    };

    let tags: BTreeMap<String, String> = element["tags"]
        .as_object()
        .map(|tags| {
            tags.iter()
                .filter_map(|(key, value)| Some((key.clone(), value.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default();

    log::trace!("Overpass element {id} at {position} with {} tags", tags.len());

    Some(Clinic::from_tags(id, position, &tags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_map_clinic_models::{COORDINATES_ONLY_ADDRESS, DEFAULT_FACILITY_TYPE};

    #[test]
    fn overload_statuses() {
        for code in [429, 500, 502, 503, 504] {
            let status = StatusCode::from_u16(code).unwrap();
            let err = classify_status(status, Some("application/json")).unwrap_err();
            assert!(
                matches!(err, OverpassError::Overloaded { status } if status == code),
                "{code} should be an overload"
            );
        }
    }

    #[test]
    fn client_errors_are_invalid_responses() {
        let err = classify_status(StatusCode::BAD_REQUEST, Some("application/json")).unwrap_err();
        assert!(matches!(err, OverpassError::InvalidResponse { .. }));
        assert!(!err.is_overload());
    }

    #[test]
    fn non_json_content_type_is_invalid() {
        let err = classify_status(StatusCode::OK, Some("text/html; charset=utf-8")).unwrap_err();
        assert!(matches!(err, OverpassError::InvalidResponse { .. }));

        let err = classify_status(StatusCode::OK, None).unwrap_err();
        assert!(matches!(err, OverpassError::InvalidResponse { .. }));
    }

    #[test]
    fn json_content_type_with_charset_is_accepted() {
        classify_status(StatusCode::OK, Some("application/json; charset=utf-8")).unwrap();
    }

    #[test]
    fn parses_tagged_elements() {
        let body = serde_json::json!({
            "version": 0.6,
            "elements": [
                {
                    "type": "node",
                    "id": 101,
                    "lat": 39.7817,
                    "lon": -89.6501,
                    "tags": {
                        "healthcare": "psychologist",
                        "name": "Oak Clinic",
                        "addr:street": "Main St",
                        "addr:city": "Springfield"
                    }
                },
                {
                    "type": "node",
                    "id": 102,
                    "lat": 39.79,
                    "lon": -89.64,
                    "tags": { "amenity": "hospital", "beds": 40 }
                },
                { "type": "node", "id": 103, "lat": 39.8, "lon": -89.6 }
            ]
        });

        let clinics = parse_elements(&body).unwrap();
        assert_eq!(clinics.len(), 3);

        assert_eq!(clinics[0].id, 101);
        assert_eq!(clinics[0].name, "Oak Clinic");
        assert_eq!(clinics[0].facility_type, "psychologist");
        assert_eq!(clinics[0].address, "Main St, Springfield");
        assert!((clinics[0].position.lat - 39.7817).abs() < 1e-9);

        assert_eq!(clinics[1].facility_type, "hospital");
        assert_eq!(clinics[1].address, COORDINATES_ONLY_ADDRESS);

        assert_eq!(clinics[2].facility_type, DEFAULT_FACILITY_TYPE);
    }

    #[test]
    fn empty_elements_is_empty_list() {
        let body = serde_json::json!({ "elements": [] });
        assert!(parse_elements(&body).unwrap().is_empty());
    }

    #[test]
    fn missing_elements_is_empty_list() {
        let body = serde_json::json!({ "version": 0.6 });
        assert!(parse_elements(&body).unwrap().is_empty());
    }

    #[test]
    fn remark_does_not_discard_elements() {
        let body = serde_json::json!({
            "remark": "runtime error: Query timed out",
            "elements": [{ "id": 1, "lat": 1.0, "lon": 2.0 }]
        });
        assert_eq!(parse_elements(&body).unwrap().len(), 1);
    }

    #[test]
    fn skips_elements_without_position() {
        let body = serde_json::json!({
            "elements": [
                { "id": 1, "tags": { "name": "Way without center" } },
                { "id": 2, "lat": 95.0, "lon": 0.0 },
                { "lat": 1.0, "lon": 1.0 },
                { "id": 3, "lat": 1.0, "lon": 1.0 }
            ]
        });
        let clinics = parse_elements(&body).unwrap();
        assert_eq!(clinics.len(), 1);
        assert_eq!(clinics[0].id, 3);
    }

    #[test]
    fn rejects_non_object_and_non_array_elements() {
        assert!(parse_elements(&serde_json::json!([])).is_err());
        assert!(parse_elements(&serde_json::json!({ "elements": "nope" })).is_err());
    }

    #[test]
    fn decode_body_reports_preview() {
        let err = decode_body("<html>busy</html>").unwrap_err();
        match err {
            OverpassError::InvalidResponse { message } => {
                assert!(message.contains("<html>busy</html>"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

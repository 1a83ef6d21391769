//! Nominatim / OpenStreetMap search client.
//!
//! The public instance allows **1 request per second**; pacing and retries
//! are the caller's job (see [`crate::client::GeocodingClient`]).
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::collections::BTreeMap;

use crate::{GeocodeError, GeocodedAddress};

/// Runs one free-form search and returns the best match, if any.
///
/// An empty result array is a valid answer and yields `Ok(None)`.
///
/// # Errors
///
/// * [`GeocodeError::RateLimited`] on HTTP 429
/// * [`GeocodeError::Status`] on any other non-success status
/// * [`GeocodeError::Http`] if the request or body read fails
/// * [`GeocodeError::Parse`] if the body is not a Nominatim result array
pub async fn search(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let resp = client
        .get(base_url)
        .query(&[
            ("q", query),
            ("format", "json"),
            ("limit", "1"),
            ("addressdetails", "1"),
            ("dedupe", "1"),
        ])
        .send()
        .await?;

    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }
    if !status.is_success() {
        return Err(GeocodeError::Status {
            status: status.as_u16(),
        });
    }

    let text = resp.text().await?;
    let body: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| GeocodeError::Parse {
            message: format!("Nominatim response is not JSON: {e}"),
        })?;
    parse_response(&body)
}

/// Parses a Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = coordinate(&first["lat"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lat in Nominatim response".to_string(),
    })?;
    let lon = coordinate(&first["lon"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lon in Nominatim response".to_string(),
    })?;

    let display_name = first["display_name"].as_str().map(String::from);

    let address = first["address"]
        .as_object()
        .map(|components| {
            components
                .iter()
                .filter_map(|(key, value)| Some((key.clone(), value.as_str()?.to_string())))
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lon,
        display_name,
        address,
    }))
}

/// Nominatim sends coordinates as numeric strings.
fn coordinate(value: &serde_json::Value) -> Option<f64> {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| value.as_f64())
}

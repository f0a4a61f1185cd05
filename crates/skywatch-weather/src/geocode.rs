//! Forward geocoding: convert a city name to coordinates.
//! Uses the Open-Meteo geocoding API - free, no API key required.

use crate::types::{Coordinates, WeatherError};
use serde::Deserialize;

/// Only the best match is ever used
pub const RESULT_COUNT: &str = "1";

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    /// Absent entirely when there is no match
    #[serde(default)]
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
    #[allow(dead_code)]
    name: Option<String>,
    #[allow(dead_code)]
    country: Option<String>,
}

/// Parse a geocoding response body into the coordinates of its first result.
///
/// A body without `results` (or with an empty array) is `NotFound`; a body that
/// is not valid geocoding JSON is a `Parse` error.
pub fn first_match(city: &str, body: &str) -> Result<Coordinates, WeatherError> {
    let parsed: GeocodingResponse = serde_json::from_str(body)
        .map_err(|e| WeatherError::Parse(format!("geocoding response for '{}': {}", city, e)))?;

    let first = parsed
        .results
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| WeatherError::NotFound(city.to_string()))?;

    Ok(Coordinates {
        latitude: first.latitude,
        longitude: first.longitude,
    })
}

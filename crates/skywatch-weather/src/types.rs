use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use skywatch_core::{AppError, NetworkError, ReqwestErrorExt};

/// Geographic coordinates resolved from a city name.
///
/// Never persisted; recomputed on every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Point-in-time weather reading for one city.
///
/// A refresh produces a new snapshot that replaces the previous one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Rounded °C
    pub temperature: i32,
    /// Relative humidity, %
    pub humidity: i32,
    /// Rounded km/h
    pub wind_speed: i32,
    pub description: String,
    pub city_name: String,
}

/// One day of a daily forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temp_max: i32,
    pub temp_min: i32,
    /// Mean precipitation probability (0-100), unrounded. `None` when the
    /// provider has no value for that day.
    pub precipitation_probability: Option<f64>,
    pub wind_speed: i32,
    pub description: String,
}

/// Round a provider reading to the nearest integer, ties to even.
pub fn round_reading(value: f64) -> i32 {
    value.round_ties_even() as i32
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// The geocoder understood the query but has no match.
    #[error("No location found for '{0}'")]
    NotFound(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl WeatherError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the lookup could not be completed (as opposed to having no match).
    pub fn is_transient(&self) -> bool {
        !self.is_not_found()
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::NotFound(city) => {
                AppError::Weather(skywatch_core::WeatherError::LocationNotFound(city))
            }
            WeatherError::Network(e) => AppError::Network(e.to_network_error()),
            WeatherError::Status { status, body } => {
                AppError::Network(NetworkError::ServerError {
                    status,
                    message: body,
                })
            }
            WeatherError::Parse(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
        }
    }
}

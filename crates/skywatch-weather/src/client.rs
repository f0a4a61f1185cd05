//! Open-Meteo client: geocode a city, then fetch current conditions or a
//! daily forecast for its coordinates.
//!
//! Every weather lookup by city name costs two round trips because the
//! forecast endpoint only accepts coordinates. Nothing is retried; failures are
//! logged and returned as `WeatherError`.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use skywatch_core::config::{DEFAULT_FORECAST_URL, DEFAULT_GEOCODING_URL};
use skywatch_core::WeatherConfig;
use tracing::instrument;

use crate::codes::WeatherCodeCatalog;
use crate::geocode;
use crate::types::{round_reading, Coordinates, ForecastDay, WeatherError, WeatherSnapshot};

const USER_AGENT: &str = concat!("Skywatch/", env!("CARGO_PKG_VERSION"));
const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code";
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,precipitation_probability_mean,wind_speed_10m_max,weather_code";
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    wind_speed_10m: f64,
    weather_code: i32,
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: DailyBlock,
}

/// Parallel arrays indexed by day
#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    precipitation_probability_mean: Vec<Option<f64>>,
    wind_speed_10m_max: Vec<f64>,
    weather_code: Vec<i32>,
}

impl DailyBlock {
    fn into_forecast(self) -> Result<Vec<ForecastDay>, WeatherError> {
        let days = self.time.len();
        let lengths = [
            ("temperature_2m_max", self.temperature_2m_max.len()),
            ("temperature_2m_min", self.temperature_2m_min.len()),
            ("precipitation_probability_mean", self.precipitation_probability_mean.len()),
            ("wind_speed_10m_max", self.wind_speed_10m_max.len()),
            ("weather_code", self.weather_code.len()),
        ];
        if let Some((field, len)) = lengths.iter().find(|(_, len)| *len != days) {
            return Err(WeatherError::Parse(format!(
                "daily.{} has {} entries, expected {}",
                field, len, days
            )));
        }

        let mut forecast = Vec::with_capacity(days);
        for (i, raw_date) in self.time.iter().enumerate() {
            let date: NaiveDate = raw_date.parse().map_err(|e| {
                WeatherError::Parse(format!("invalid forecast date '{}': {}", raw_date, e))
            })?;

            if let Some(previous) = forecast.last().map(|d: &ForecastDay| d.date) {
                if date <= previous {
                    return Err(WeatherError::Parse(format!(
                        "forecast dates out of order: {} follows {}",
                        date, previous
                    )));
                }
            }

            forecast.push(ForecastDay {
                date,
                temp_max: round_reading(self.temperature_2m_max[i]),
                temp_min: round_reading(self.temperature_2m_min[i]),
                precipitation_probability: self.precipitation_probability_mean[i],
                wind_speed: round_reading(self.wind_speed_10m_max[i]),
                description: WeatherCodeCatalog::lookup(self.weather_code[i]).to_string(),
            });
        }

        Ok(forecast)
    }
}

/// Geocoding + weather client for the Open-Meteo API
#[derive(Debug, Clone)]
pub struct GeoWeatherClient {
    client: Arc<Client>,
    geocoding_url: String,
    forecast_url: String,
    language: String,
}

impl GeoWeatherClient {
    /// Create a client against the public Open-Meteo endpoints.
    pub fn new(timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            language: "en".to_string(),
        })
    }

    /// Create a client from the `[weather]` config section.
    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Self::new(Duration::from_secs(config.request_timeout_secs))?
            .with_endpoints(&config.geocoding_url, &config.forecast_url);
        Ok(Self {
            language: config.language.clone(),
            ..client
        })
    }

    /// Point the client at different geocoding and forecast endpoints.
    pub fn with_endpoints(
        mut self,
        geocoding_url: impl Into<String>,
        forecast_url: impl Into<String>,
    ) -> Self {
        self.geocoding_url = geocoding_url.into();
        self.forecast_url = forecast_url.into();
        self
    }

    /// Resolve a city name to the coordinates of its best match.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve(&self, city: &str) -> Result<Coordinates, WeatherError> {
        let result = self.try_resolve(city).await;
        match &result {
            Ok(coords) => tracing::debug!("Resolved '{}' to {}", city, coords),
            Err(e) if e.is_not_found() => tracing::info!("No geocoding match for '{}'", city),
            Err(e) => tracing::warn!("Geocoding '{}' failed: {}", city, e),
        }
        result
    }

    async fn try_resolve(&self, city: &str) -> Result<Coordinates, WeatherError> {
        let request = self.client.get(&self.geocoding_url).query(&[
            ("name", city),
            ("count", geocode::RESULT_COUNT),
            ("language", self.language.as_str()),
            ("format", "json"),
        ]);

        let body = Self::send(request).await?;
        geocode::first_match(city, &body)
    }

    /// Fetch current conditions for the given coordinates.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_current(
        &self,
        city_name: &str,
        coords: Coordinates,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let result = self.try_fetch_current(city_name, coords).await;
        if let Err(e) = &result {
            tracing::warn!(
                "Current weather for '{}' at {} failed: {}",
                city_name,
                coords,
                e
            );
        }
        result
    }

    async fn try_fetch_current(
        &self,
        city_name: &str,
        coords: Coordinates,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let request = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", coords.latitude.to_string()),
                ("longitude", coords.longitude.to_string()),
            ])
            .query(&[("current", CURRENT_FIELDS), ("timezone", "auto")]);

        let body = Self::send(request).await?;
        let parsed: CurrentResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherError::Parse(format!("current weather response: {}", e))
        })?;

        let current = parsed.current;
        Ok(WeatherSnapshot {
            temperature: round_reading(current.temperature_2m),
            humidity: round_reading(current.relative_humidity_2m),
            wind_speed: round_reading(current.wind_speed_10m),
            description: WeatherCodeCatalog::lookup(current.weather_code).to_string(),
            city_name: city_name.to_string(),
        })
    }

    /// Fetch the daily forecast over the provider's default horizon.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_forecast(
        &self,
        coords: Coordinates,
    ) -> Result<Vec<ForecastDay>, WeatherError> {
        let result = self.try_fetch_forecast(coords).await;
        if let Err(e) = &result {
            tracing::warn!("Forecast at {} failed: {}", coords, e);
        }
        result
    }

    async fn try_fetch_forecast(
        &self,
        coords: Coordinates,
    ) -> Result<Vec<ForecastDay>, WeatherError> {
        let request = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", coords.latitude.to_string()),
                ("longitude", coords.longitude.to_string()),
            ])
            .query(&[("daily", DAILY_FIELDS), ("timezone", "auto")]);

        let body = Self::send(request).await?;
        let parsed: DailyResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::Parse(format!("forecast response: {}", e)))?;

        parsed.daily.into_forecast()
    }

    /// Geocode `city`, then fetch its current conditions.
    ///
    /// The weather endpoint is not called when geocoding fails.
    pub async fn get_current_weather_for_city(
        &self,
        city: &str,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let coords = self.resolve(city).await?;
        self.fetch_current(city, coords).await
    }

    /// Geocode `city`, then fetch its daily forecast.
    ///
    /// The weather endpoint is not called when geocoding fails.
    pub async fn get_forecast_for_city(&self, city: &str) -> Result<Vec<ForecastDay>, WeatherError> {
        let coords = self.resolve(city).await?;
        self.fetch_forecast(coords).await
    }

    /// Send a request and return the body of a 2xx response.
    async fn send(request: reqwest::RequestBuilder) -> Result<String, WeatherError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

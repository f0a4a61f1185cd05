//! Coordinates the weather client, the city store and the in-memory registry.
//!
//! Presentation calls [`RefreshOrchestrator::add_city`] and
//! [`RefreshOrchestrator::remove_city`] directly and receives sweep results as
//! [`WeatherEvent`]s on a channel from [`RefreshOrchestrator::subscribe`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use skywatch_core::AppError;
use skywatch_weather::{ForecastDay, GeoWeatherClient, WeatherError, WeatherSnapshot};
use thiserror::Error;

use crate::city_store::CityStore;
use crate::registry::{TrackedCity, TrackedCityRegistry};

/// Current conditions plus forecast for one city
#[derive(Debug, Clone, PartialEq)]
pub struct CityWeather {
    pub snapshot: WeatherSnapshot,
    pub forecast: Vec<ForecastDay>,
}

/// Notifications sent to Presentation
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherEvent {
    /// New data for a tracked city. The forecast is the previous one if only
    /// the forecast fetch failed.
    CityRefreshed {
        name: String,
        snapshot: WeatherSnapshot,
        forecast: Vec<ForecastDay>,
    },
    CityRemoved { name: String },
    /// Sent after every sweep, whatever the per-city outcomes.
    SweepCompleted {
        finished_at: DateTime<Local>,
        refreshed: usize,
        failed: usize,
    },
}

/// Outcome of one refresh sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub refreshed: usize,
    pub failed: usize,
    /// Cities removed while their fetch was in flight; results discarded.
    pub dropped: Vec<String>,
    pub finished_at: DateTime<Local>,
}

/// Errors surfaced to the user when tracking a city
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("City name is empty")]
    EmptyName,

    #[error("City '{0}' is already tracked")]
    DuplicateTracked(String),

    #[error("No weather data for '{0}'")]
    NotFound(String),

    #[error("Weather lookup for '{city}' failed: {source}")]
    Transient {
        city: String,
        #[source]
        source: WeatherError,
    },
}

impl TrackError {
    fn from_lookup(city: &str, err: WeatherError) -> Self {
        if err.is_not_found() {
            TrackError::NotFound(city.to_string())
        } else {
            TrackError::Transient {
                city: city.to_string(),
                source: err,
            }
        }
    }

    /// Short message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            TrackError::EmptyName => "Please enter a city name.".to_string(),
            TrackError::DuplicateTracked(city) => format!("City '{}' is already added!", city),
            TrackError::NotFound(city) => format!("Could not find weather data for '{}'", city),
            TrackError::Transient { city, .. } => format!(
                "Could not reach the weather service for '{}'. Please try again later.",
                city
            ),
        }
    }
}

impl From<TrackError> for AppError {
    fn from(e: TrackError) -> Self {
        match e {
            TrackError::EmptyName => AppError::Weather(skywatch_core::WeatherError::InvalidCity),
            TrackError::DuplicateTracked(city) => {
                AppError::Weather(skywatch_core::WeatherError::AlreadyTracked(city))
            }
            TrackError::NotFound(city) => {
                AppError::Weather(skywatch_core::WeatherError::LocationNotFound(city))
            }
            TrackError::Transient { source, .. } => source.into(),
        }
    }
}

/// Held while a sweep runs; clears the in-progress flag on drop.
struct SweepPermit<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SweepPermit<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SweepPermit<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Owns the tracked-city registry and drives refreshes.
///
/// The registry lock is never held across an `.await`.
pub struct RefreshOrchestrator {
    client: GeoWeatherClient,
    store: CityStore,
    registry: Mutex<TrackedCityRegistry>,
    sweep_in_progress: AtomicBool,
    subscribers: Mutex<Vec<mpsc::Sender<WeatherEvent>>>,
}

impl RefreshOrchestrator {
    pub fn new(client: GeoWeatherClient, store: CityStore) -> Self {
        Self {
            client,
            store,
            registry: Mutex::new(TrackedCityRegistry::new()),
            sweep_in_progress: AtomicBool::new(false),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new event receiver. Dropped receivers are pruned on the next send.
    pub fn subscribe(&self) -> mpsc::Receiver<WeatherEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    fn emit(&self, event: WeatherEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn store(&self) -> &CityStore {
        &self.store
    }

    /// Load the persisted city list into the registry.
    ///
    /// Each city starts `Stale`, seeded with its cached snapshot if one exists.
    /// Returns the number of cities restored.
    pub fn restore(&self) -> usize {
        let names = self.store.load_cities();
        let mut cached = self.store.load_weather();

        let mut registry = self.registry.lock();
        let restored = names
            .iter()
            .filter(|name| registry.insert_restored(name, cached.remove(name.as_str())))
            .count();

        tracing::info!("Restored {} tracked cities", restored);
        restored
    }

    /// Start tracking a city.
    ///
    /// Nothing is persisted unless the current-weather fetch succeeds. A failed
    /// forecast fetch leaves the forecast empty but still adds the city.
    pub async fn add_city(&self, name: &str) -> Result<CityWeather, TrackError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackError::EmptyName);
        }
        if self.registry.lock().contains(name) {
            return Err(TrackError::DuplicateTracked(name.to_string()));
        }

        let snapshot = self
            .client
            .get_current_weather_for_city(name)
            .await
            .map_err(|e| TrackError::from_lookup(name, e))?;
        let forecast = self
            .client
            .get_forecast_for_city(name)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Adding '{}' without a forecast: {}", name, e);
                Vec::new()
            });

        // Another add may have won while we were fetching.
        if !self
            .registry
            .lock()
            .insert_added(name, snapshot.clone(), forecast.clone())
        {
            return Err(TrackError::DuplicateTracked(name.to_string()));
        }

        self.store.add_city(name);
        self.store.update_snapshot(name, &snapshot);
        tracing::info!("Now tracking '{}'", name);

        Ok(CityWeather { snapshot, forecast })
    }

    /// Stop tracking a city. The cached snapshot stays on disk.
    ///
    /// Returns false if the city was not tracked.
    pub fn remove_city(&self, name: &str) -> bool {
        let name = name.trim();
        if !self.registry.lock().remove(name) {
            tracing::debug!("Remove ignored, '{}' is not tracked", name);
            return false;
        }

        self.store.remove_city(name);
        tracing::info!("Stopped tracking '{}'", name);
        self.emit(WeatherEvent::CityRemoved {
            name: name.to_string(),
        });
        true
    }

    /// Refresh every tracked city, one after another, in registry order.
    ///
    /// Returns `None` without doing anything if a sweep is already running.
    pub async fn refresh_all(&self) -> Option<SweepReport> {
        let Some(_permit) = SweepPermit::acquire(&self.sweep_in_progress) else {
            tracing::debug!("Sweep already in progress, skipping");
            return None;
        };

        let names = self.registry.lock().names();
        tracing::info!("Refreshing {} cities", names.len());

        let mut refreshed = 0;
        let mut failed = 0;
        let mut dropped = Vec::new();

        for name in names {
            if !self.registry.lock().mark_stale(&name) {
                continue;
            }

            match self.fetch_city(&name).await {
                Ok((snapshot, forecast)) => {
                    let held =
                        self.registry
                            .lock()
                            .apply_refresh(&name, snapshot.clone(), forecast);
                    let Some(forecast) = held else {
                        tracing::debug!("'{}' was removed mid-refresh, dropping result", name);
                        dropped.push(name);
                        continue;
                    };

                    self.store.update_snapshot(&name, &snapshot);
                    refreshed += 1;
                    self.emit(WeatherEvent::CityRefreshed {
                        name,
                        snapshot,
                        forecast,
                    });
                }
                Err(e) => {
                    tracing::warn!("Keeping last-known weather for '{}': {}", name, e);
                    self.registry.lock().mark_failed(&name);
                    failed += 1;
                }
            }
        }

        let finished_at = Local::now();
        tracing::info!(
            "Sweep finished: {} refreshed, {} failed, {} dropped",
            refreshed,
            failed,
            dropped.len()
        );
        self.emit(WeatherEvent::SweepCompleted {
            finished_at,
            refreshed,
            failed,
        });

        Some(SweepReport {
            refreshed,
            failed,
            dropped,
            finished_at,
        })
    }

    /// Current conditions and forecast, each geocoded on its own. The forecast
    /// is best-effort.
    async fn fetch_city(
        &self,
        name: &str,
    ) -> Result<(WeatherSnapshot, Option<Vec<ForecastDay>>), WeatherError> {
        let snapshot = self.client.get_current_weather_for_city(name).await?;
        let forecast = self.client.get_forecast_for_city(name).await.ok();
        Ok((snapshot, forecast))
    }

    /// Tracked cities in registry order
    pub fn tracked_cities(&self) -> Vec<TrackedCity> {
        self.registry.lock().iter().cloned().collect()
    }

    pub fn city(&self, name: &str) -> Option<TrackedCity> {
        self.registry.lock().get(name.trim()).cloned()
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweep_in_progress.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn sweep_permit_is_exclusive() {
        let flag = AtomicBool::new(false);
        let permit = SweepPermit::acquire(&flag).unwrap();
        assert!(SweepPermit::acquire(&flag).is_none());
        drop(permit);
        assert!(!flag.load(Ordering::Acquire));
        assert!(SweepPermit::acquire(&flag).is_some());
    }

    #[test]
    fn track_error_user_messages() {
        assert_eq!(
            TrackError::DuplicateTracked("Paris".into()).user_message(),
            "City 'Paris' is already added!"
        );
        assert_eq!(
            TrackError::NotFound("Atlantis".into()).user_message(),
            "Could not find weather data for 'Atlantis'"
        );
        let transient = TrackError::Transient {
            city: "Paris".into(),
            source: WeatherError::Parse("truncated".into()),
        };
        assert!(transient.user_message().contains("try again"));
    }

    #[test]
    fn lookup_errors_are_classified() {
        let err = TrackError::from_lookup("Atlantis", WeatherError::NotFound("Atlantis".into()));
        assert!(matches!(err, TrackError::NotFound(ref c) if c == "Atlantis"));

        let err = TrackError::from_lookup(
            "Paris",
            WeatherError::Status {
                status: 502,
                body: String::new(),
            },
        );
        assert!(matches!(err, TrackError::Transient { .. }));
    }

    #[test]
    fn track_error_maps_to_app_error() {
        let app: AppError = TrackError::DuplicateTracked("Paris".into()).into();
        assert_eq!(app.user_message(), "That city is already being tracked.");

        let app: AppError = TrackError::Transient {
            city: "Paris".into(),
            source: WeatherError::Parse("bad".into()),
        }
        .into();
        assert!(matches!(app, AppError::Network(_)));
    }
}

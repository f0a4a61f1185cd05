//! Flat-file persistence for tracked cities and their last-known weather.
//!
//! Two independent JSON documents live in the data directory:
//! - `cities.json`: array of city names, in the order they were added
//! - `weather_data.json`: object mapping city name to its last snapshot
//!
//! Every public operation is fail-open. Read failures are logged and yield an
//! empty collection; write failures are logged and the write is dropped. The
//! remote provider is the source of truth, so losing the cache is tolerable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use skywatch_core::{AppError, StorageError};
use skywatch_weather::WeatherSnapshot;
use thiserror::Error;

pub const CITIES_FILE: &str = "cities.json";
pub const WEATHER_FILE: &str = "weather_data.json";

/// Cached snapshots keyed by city name
pub type SnapshotMap = BTreeMap<String, WeatherSnapshot>;

/// Local persistence errors. Never surfaced past the store's fail-open API.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    #[error("Failed to write {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },
}

impl StoreError {
    fn read(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    fn write(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Read { path, message } => AppError::Storage(StorageError::ReadFailed {
                path: path.display().to_string(),
                message,
            }),
            StoreError::Write { path, message } => AppError::Storage(StorageError::WriteFailed {
                path: path.display().to_string(),
                message,
            }),
        }
    }
}

/// Durable list of tracked cities plus their cached weather.
///
/// Read-modify-write operations are serialized within the process. There is no
/// protection against another process editing the files; last writer wins.
#[derive(Debug)]
pub struct CityStore {
    cities_path: PathBuf,
    weather_path: PathBuf,
    write_lock: Mutex<()>,
}

impl CityStore {
    /// Open the store in `data_dir`, creating empty documents if absent.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref();
        let store = Self {
            cities_path: data_dir.join(CITIES_FILE),
            weather_path: data_dir.join(WEATHER_FILE),
            write_lock: Mutex::new(()),
        };

        if let Err(e) = std::fs::create_dir_all(data_dir) {
            tracing::error!("Failed to create data directory {}: {}", data_dir.display(), e);
        }
        store.ensure_file(&store.cities_path, &Vec::<String>::new());
        store.ensure_file(&store.weather_path, &SnapshotMap::new());

        store
    }

    fn ensure_file<T: Serialize>(&self, path: &Path, empty: &T) {
        if path.exists() {
            return;
        }
        match write_json(path, empty) {
            Ok(()) => tracing::debug!("Created {}", path.display()),
            Err(e) => tracing::error!("{}", e),
        }
    }

    pub fn cities_path(&self) -> &Path {
        &self.cities_path
    }

    pub fn weather_path(&self) -> &Path {
        &self.weather_path
    }

    /// Load tracked city names, reporting read failures.
    pub fn try_load_cities(&self) -> Result<Vec<String>, StoreError> {
        read_json(&self.cities_path)
    }

    /// Load cached snapshots, reporting read failures.
    pub fn try_load_weather(&self) -> Result<SnapshotMap, StoreError> {
        read_json(&self.weather_path)
    }

    /// Load tracked city names; empty on failure.
    pub fn load_cities(&self) -> Vec<String> {
        self.try_load_cities().unwrap_or_else(|e| {
            tracing::error!("Error loading cities: {}", e);
            Vec::new()
        })
    }

    /// Replace the tracked city list; failures are logged and dropped.
    pub fn save_cities(&self, cities: &[String]) {
        if let Err(e) = write_json(&self.cities_path, &cities) {
            tracing::error!("Error saving cities: {}", e);
        }
    }

    /// Load cached snapshots; empty on failure.
    pub fn load_weather(&self) -> SnapshotMap {
        self.try_load_weather().unwrap_or_else(|e| {
            tracing::error!("Error loading weather data: {}", e);
            SnapshotMap::new()
        })
    }

    /// Replace all cached snapshots; failures are logged and dropped.
    pub fn save_weather(&self, weather: &SnapshotMap) {
        if let Err(e) = write_json(&self.weather_path, weather) {
            tracing::error!("Error saving weather data: {}", e);
        }
    }

    /// Append a city unless already present.
    pub fn add_city(&self, name: &str) {
        let _guard = self.write_lock.lock();
        let mut cities = self.load_cities();
        if cities.iter().any(|c| c == name) {
            return;
        }
        cities.push(name.to_string());
        self.save_cities(&cities);
    }

    /// Remove a city if present. The cached snapshot is left in place.
    pub fn remove_city(&self, name: &str) {
        let _guard = self.write_lock.lock();
        let mut cities = self.load_cities();
        let before = cities.len();
        cities.retain(|c| c != name);
        if cities.len() != before {
            self.save_cities(&cities);
        }
    }

    /// Insert or wholesale-replace the cached snapshot for `name`.
    pub fn update_snapshot(&self, name: &str, snapshot: &WeatherSnapshot) {
        let _guard = self.write_lock.lock();
        let mut weather = self.load_weather();
        weather.insert(name.to_string(), snapshot.clone());
        self.save_weather(&weather);
    }

    /// Cached snapshot for one city
    pub fn snapshot(&self, name: &str) -> Option<WeatherSnapshot> {
        self.load_weather().remove(name)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| StoreError::read(path, e))?;
    serde_json::from_str(&contents).map_err(|e| StoreError::read(path, e))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| StoreError::write(path, e))?;
    std::fs::write(path, json).map_err(|e| StoreError::write(path, e))
}

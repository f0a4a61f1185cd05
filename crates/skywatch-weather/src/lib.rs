//! Weather acquisition for Skywatch
//!
//! Resolves city names to coordinates and fetches current conditions and a
//! daily forecast from the Open-Meteo API. WMO condition codes are translated
//! through a fixed catalog.

pub mod client;
pub mod codes;
pub mod geocode;
pub mod types;

pub use client::GeoWeatherClient;
pub use codes::WeatherCodeCatalog;
pub use types::*;

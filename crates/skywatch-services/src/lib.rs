pub mod city_store;
pub mod orchestrator;
pub mod registry;
pub mod scheduler;

pub use city_store::{CityStore, SnapshotMap, StoreError};
pub use orchestrator::{CityWeather, RefreshOrchestrator, SweepReport, TrackError, WeatherEvent};
pub use registry::{CityState, TrackedCity, TrackedCityRegistry};
pub use scheduler::{spawn_refresh_loop, DEFAULT_REFRESH_PERIOD};

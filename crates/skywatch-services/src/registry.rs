//! In-memory registry of tracked cities and their refresh state.
//!
//! A city not in the registry is `Absent`. Entries keep insertion order, which
//! is also the order a sweep visits them.

use skywatch_weather::{ForecastDay, WeatherSnapshot};

/// Refresh state of a tracked city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CityState {
    /// Initial fetch succeeded.
    Added,
    /// A sweep has started and new data is not confirmed yet.
    Stale,
    /// Latest sweep succeeded. Treated the same as `Added`.
    Refreshed,
}

impl CityState {
    /// State once a sweep reaches this city.
    pub fn on_sweep_start(self) -> Self {
        CityState::Stale
    }

    /// State after new data was fetched.
    pub fn on_refresh_success(self) -> Self {
        CityState::Refreshed
    }

    /// State after a failed refresh: unchanged until the next success.
    pub fn on_refresh_failure(self) -> Self {
        self
    }
}

/// One tracked city with its last-known data
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedCity {
    pub name: String,
    pub state: CityState,
    /// `None` only for a restored city whose snapshot was never cached.
    pub snapshot: Option<WeatherSnapshot>,
    pub forecast: Vec<ForecastDay>,
}

#[derive(Debug, Default)]
pub struct TrackedCityRegistry {
    cities: Vec<TrackedCity>,
}

impl TrackedCityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cities.iter().any(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&TrackedCity> {
        self.cities.iter().find(|c| c.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut TrackedCity> {
        self.cities.iter_mut().find(|c| c.name == name)
    }

    /// Names in registry order
    pub fn names(&self) -> Vec<String> {
        self.cities.iter().map(|c| c.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedCity> {
        self.cities.iter()
    }

    /// Track a city after a successful initial fetch.
    ///
    /// Returns false if the name is already tracked.
    pub fn insert_added(
        &mut self,
        name: &str,
        snapshot: WeatherSnapshot,
        forecast: Vec<ForecastDay>,
    ) -> bool {
        if self.contains(name) {
            return false;
        }
        self.cities.push(TrackedCity {
            name: name.to_string(),
            state: CityState::Added,
            snapshot: Some(snapshot),
            forecast,
        });
        true
    }

    /// Track a city loaded from disk. It stays `Stale` until a sweep confirms it.
    ///
    /// Returns false if the name is already tracked.
    pub fn insert_restored(&mut self, name: &str, snapshot: Option<WeatherSnapshot>) -> bool {
        if self.contains(name) {
            return false;
        }
        self.cities.push(TrackedCity {
            name: name.to_string(),
            state: CityState::Stale,
            snapshot,
            forecast: Vec::new(),
        });
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.cities.len();
        self.cities.retain(|c| c.name != name);
        self.cities.len() != before
    }

    /// Mark a city as awaiting fresh data. Returns false if it is not tracked.
    pub fn mark_stale(&mut self, name: &str) -> bool {
        match self.get_mut(name) {
            Some(city) => {
                city.state = city.state.on_sweep_start();
                true
            }
            None => false,
        }
    }

    /// Record a failed refresh; the last-known data is kept.
    pub fn mark_failed(&mut self, name: &str) {
        if let Some(city) = self.get_mut(name) {
            city.state = city.state.on_refresh_failure();
        }
    }

    /// Replace a city's snapshot after a successful refresh.
    ///
    /// A `None` forecast keeps the previous one. Returns the forecast now held,
    /// or `None` if the city is no longer tracked.
    pub fn apply_refresh(
        &mut self,
        name: &str,
        snapshot: WeatherSnapshot,
        forecast: Option<Vec<ForecastDay>>,
    ) -> Option<Vec<ForecastDay>> {
        let city = self.get_mut(name)?;
        city.state = city.state.on_refresh_success();
        city.snapshot = Some(snapshot);
        if let Some(forecast) = forecast {
            city.forecast = forecast;
        }
        Some(city.forecast.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn snapshot(city: &str, temperature: i32) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature,
            humidity: 50,
            wind_speed: 5,
            description: "Clear sky".to_string(),
            city_name: city.to_string(),
        }
    }

    #[test]
    fn state_transitions() {
        assert_eq!(CityState::Added.on_sweep_start(), CityState::Stale);
        assert_eq!(CityState::Stale.on_refresh_success(), CityState::Refreshed);
        assert_eq!(CityState::Stale.on_refresh_failure(), CityState::Stale);
        assert_eq!(CityState::Refreshed.on_sweep_start(), CityState::Stale);
    }

    #[test]
    fn insert_rejects_duplicates() {
        let mut registry = TrackedCityRegistry::new();
        assert!(registry.insert_added("Paris", snapshot("Paris", 15), Vec::new()));
        assert!(!registry.insert_added("Paris", snapshot("Paris", 16), Vec::new()));
        assert!(!registry.insert_restored("Paris", None));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Paris").unwrap().snapshot, Some(snapshot("Paris", 15)));
    }

    #[test]
    fn names_keep_insertion_order() {
        let mut registry = TrackedCityRegistry::new();
        registry.insert_added("Tokyo", snapshot("Tokyo", 20), Vec::new());
        registry.insert_restored("Paris", None);
        registry.insert_added("Lima", snapshot("Lima", 18), Vec::new());
        assert_eq!(registry.names(), vec!["Tokyo", "Paris", "Lima"]);
    }

    #[test]
    fn restored_city_starts_stale() {
        let mut registry = TrackedCityRegistry::new();
        registry.insert_restored("Paris", Some(snapshot("Paris", 12)));
        let city = registry.get("Paris").unwrap();
        assert_eq!(city.state, CityState::Stale);
        assert!(city.forecast.is_empty());
    }

    #[test]
    fn refresh_cycle() {
        let mut registry = TrackedCityRegistry::new();
        registry.insert_added("Paris", snapshot("Paris", 15), Vec::new());

        assert!(registry.mark_stale("Paris"));
        assert_eq!(registry.get("Paris").unwrap().state, CityState::Stale);

        registry.mark_failed("Paris");
        let city = registry.get("Paris").unwrap();
        assert_eq!(city.state, CityState::Stale);
        assert_eq!(city.snapshot, Some(snapshot("Paris", 15)));

        let held = registry.apply_refresh("Paris", snapshot("Paris", 9), None);
        assert_eq!(held, Some(Vec::new()));
        let city = registry.get("Paris").unwrap();
        assert_eq!(city.state, CityState::Refreshed);
        assert_eq!(city.snapshot, Some(snapshot("Paris", 9)));
    }

    #[test]
    fn refresh_of_removed_city_is_ignored() {
        let mut registry = TrackedCityRegistry::new();
        registry.insert_added("Paris", snapshot("Paris", 15), Vec::new());
        assert!(registry.remove("Paris"));
        assert!(!registry.remove("Paris"));

        assert!(!registry.mark_stale("Paris"));
        assert_eq!(registry.apply_refresh("Paris", snapshot("Paris", 9), None), None);
        assert!(registry.is_empty());
    }
}

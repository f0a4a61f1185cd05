//! WMO weather interpretation codes as reported by Open-Meteo.
//! See: https://open-meteo.com/en/docs#weathervariables

/// Description returned for codes outside the table
pub const UNKNOWN_DESCRIPTION: &str = "Unknown";

const WMO_CODES: &[(i32, &str)] = &[
    (0, "Clear sky"),
    (1, "Mainly clear"),
    (2, "Partly cloudy"),
    (3, "Overcast"),
    (45, "Foggy"),
    (48, "Depositing rime fog"),
    (51, "Light drizzle"),
    (53, "Moderate drizzle"),
    (55, "Dense drizzle"),
    (61, "Slight rain"),
    (63, "Moderate rain"),
    (65, "Heavy rain"),
    (71, "Slight snow"),
    (73, "Moderate snow"),
    (75, "Heavy snow"),
    (77, "Snow grains"),
    (80, "Slight rain showers"),
    (81, "Moderate rain showers"),
    (82, "Violent rain showers"),
    (85, "Slight snow showers"),
    (86, "Heavy snow showers"),
    (95, "Thunderstorm"),
    (96, "Thunderstorm with slight hail"),
    (99, "Thunderstorm with heavy hail"),
];

/// Fixed mapping from condition code to description.
pub struct WeatherCodeCatalog;

impl WeatherCodeCatalog {
    /// Describe a condition code. Unknown codes map to `"Unknown"`.
    pub fn lookup(code: i32) -> &'static str {
        WMO_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, description)| *description)
            .unwrap_or(UNKNOWN_DESCRIPTION)
    }

    /// All documented codes, ascending
    pub fn entries() -> &'static [(i32, &'static str)] {
        WMO_CODES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_and_cloudy() {
        assert_eq!(WeatherCodeCatalog::lookup(0), "Clear sky");
        assert_eq!(WeatherCodeCatalog::lookup(1), "Mainly clear");
        assert_eq!(WeatherCodeCatalog::lookup(2), "Partly cloudy");
        assert_eq!(WeatherCodeCatalog::lookup(3), "Overcast");
    }

    #[test]
    fn test_fog() {
        assert_eq!(WeatherCodeCatalog::lookup(45), "Foggy");
        assert_eq!(WeatherCodeCatalog::lookup(48), "Depositing rime fog");
    }

    #[test]
    fn test_precipitation() {
        assert_eq!(WeatherCodeCatalog::lookup(53), "Moderate drizzle");
        assert_eq!(WeatherCodeCatalog::lookup(65), "Heavy rain");
        assert_eq!(WeatherCodeCatalog::lookup(77), "Snow grains");
        assert_eq!(WeatherCodeCatalog::lookup(82), "Violent rain showers");
        assert_eq!(WeatherCodeCatalog::lookup(86), "Heavy snow showers");
    }

    #[test]
    fn test_thunderstorm() {
        assert_eq!(WeatherCodeCatalog::lookup(95), "Thunderstorm");
        assert_eq!(WeatherCodeCatalog::lookup(96), "Thunderstorm with slight hail");
        assert_eq!(WeatherCodeCatalog::lookup(99), "Thunderstorm with heavy hail");
    }

    #[test]
    fn test_unknown_codes() {
        for code in [-1, 4, 44, 56, 67, 100, 999, i32::MAX] {
            assert_eq!(WeatherCodeCatalog::lookup(code), UNKNOWN_DESCRIPTION, "code {code}");
        }
    }

    #[test]
    fn test_every_documented_description() {
        let documented = [
            (0, "Clear sky"),
            (1, "Mainly clear"),
            (2, "Partly cloudy"),
            (3, "Overcast"),
            (45, "Foggy"),
            (48, "Depositing rime fog"),
            (51, "Light drizzle"),
            (53, "Moderate drizzle"),
            (55, "Dense drizzle"),
            (61, "Slight rain"),
            (63, "Moderate rain"),
            (65, "Heavy rain"),
            (71, "Slight snow"),
            (73, "Moderate snow"),
            (75, "Heavy snow"),
            (77, "Snow grains"),
            (80, "Slight rain showers"),
            (81, "Moderate rain showers"),
            (82, "Violent rain showers"),
            (85, "Slight snow showers"),
            (86, "Heavy snow showers"),
            (95, "Thunderstorm"),
            (96, "Thunderstorm with slight hail"),
            (99, "Thunderstorm with heavy hail"),
        ];

        for (code, description) in documented {
            assert_eq!(WeatherCodeCatalog::lookup(code), description, "code {code}");
        }
        assert_eq!(WeatherCodeCatalog::entries(), &documented[..]);
    }

    #[test]
    fn test_table_is_sorted_and_unique() {
        let entries = WeatherCodeCatalog::entries();
        assert_eq!(entries.len(), 24);
        assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        for (code, description) in entries {
            assert_eq!(WeatherCodeCatalog::lookup(*code), *description);
        }
    }
}

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

use crate::Config;

/// Main application state and lifecycle manager
pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance from the config file
    ///
    /// `config_path` overrides the platform config location.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let (config, _validation) = Config::load_validated(config_path)?;
        Self::with_config(config)
    }

    /// Create an application instance from an already-loaded config
    pub fn with_config(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!(
                "Failed to create data directory: {}",
                config.data_dir.display()
            )
        })?;

        tracing::info!("Using data directory {}", config.data_dir.display());

        Ok(Self {
            config,
        })
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Period between refresh sweeps, `None` when periodic refresh is disabled
    pub fn refresh_period(&self) -> Option<Duration> {
        match self.config.weather.refresh_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_with_config_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().join("data"),
            ..Config::default()
        };

        let app = App::with_config(config).unwrap();
        assert!(app.config().data_dir.is_dir());
        assert_eq!(app.refresh_period(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_refresh_period_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        config.weather.refresh_seconds = 0;

        let app = App::with_config(config).unwrap();
        assert_eq!(app.refresh_period(), None);
    }
}

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use skywatch_core::{App, AppError, Config};
use skywatch_services::{spawn_refresh_loop, CityStore, RefreshOrchestrator, WeatherEvent};
use skywatch_weather::{ForecastDay, GeoWeatherClient, WeatherSnapshot};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "skywatch", version, about = "Track cities and keep their weather up to date")]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start tracking a city and show its weather.
    Add { city: String },

    /// Stop tracking a city.
    Remove { city: String },

    /// List tracked cities with their last-known weather.
    List,

    /// Look up a city's weather without tracking it.
    Show { city: String },

    /// Refresh tracked cities periodically until interrupted.
    Watch,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let app = App::new(self.config.as_deref()).context("Failed to load configuration")?;
        let config = app.config();
        let client = GeoWeatherClient::from_config(&config.weather)
            .context("Failed to create weather client")?;

        let code = match self.command {
            Command::Show { city } => show(&client, &city).await,
            Command::Add { city } => add(&open(client, config), &city).await,
            Command::Remove { city } => remove(&open(client, config), &city),
            Command::List => {
                list(&open(client, config));
                ExitCode::SUCCESS
            }
            Command::Watch => {
                let orchestrator = Arc::new(open(client, config));
                watch(orchestrator, app.refresh_period(), std::io::stdout()).await;
                ExitCode::SUCCESS
            }
        };

        Ok(code)
    }
}

/// Orchestrator seeded with the persisted city list
fn open(client: GeoWeatherClient, config: &Config) -> RefreshOrchestrator {
    let orchestrator = RefreshOrchestrator::new(client, CityStore::open(&config.data_dir));
    orchestrator.restore();
    orchestrator
}

async fn add(orchestrator: &RefreshOrchestrator, city: &str) -> ExitCode {
    match orchestrator.add_city(city).await {
        Ok(weather) => {
            print_city(&weather.snapshot, &weather.forecast);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::debug!("Add failed: {}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn remove(orchestrator: &RefreshOrchestrator, city: &str) -> ExitCode {
    if orchestrator.remove_city(city) {
        println!("Stopped tracking {}", city.trim());
        ExitCode::SUCCESS
    } else {
        eprintln!("'{}' is not being tracked.", city.trim());
        ExitCode::FAILURE
    }
}

async fn show(client: &GeoWeatherClient, city: &str) -> ExitCode {
    let city = city.trim();
    let snapshot = match client.get_current_weather_for_city(city).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("{}", AppError::from(e).user_message());
            return ExitCode::FAILURE;
        }
    };
    let forecast = client.get_forecast_for_city(city).await.unwrap_or_else(|e| {
        tracing::warn!("Showing '{}' without a forecast: {}", city, e);
        Vec::new()
    });

    print_city(&snapshot, &forecast);
    ExitCode::SUCCESS
}

fn list(orchestrator: &RefreshOrchestrator) {
    if let Err(e) = orchestrator.store().try_load_cities() {
        eprintln!("{}", AppError::from(e).user_message());
    }

    let cities = orchestrator.tracked_cities();
    if cities.is_empty() {
        println!("No cities tracked. Add one with `skywatch add <CITY>`.");
        return;
    }

    for city in cities {
        match &city.snapshot {
            Some(snapshot) => println!("{}", summary_line(snapshot)),
            None => println!("{}: no cached weather", city.name),
        }
    }
}

/// Sweep until Ctrl-C (or once when periodic refresh is off), writing each
/// event to `out`. Returns `out` once every event has been written, or `None`
/// if the printer thread died.
async fn watch<W>(
    orchestrator: Arc<RefreshOrchestrator>,
    period: Option<Duration>,
    out: W,
) -> Option<W>
where
    W: Write + Send + 'static,
{
    let events = orchestrator.subscribe();
    let printer = std::thread::spawn(move || {
        let mut out = out;
        for event in events {
            if let Err(e) = write_event(&mut out, &event) {
                tracing::error!("Failed to write event: {}", e);
                break;
            }
        }
        out
    });

    match period {
        None => {
            tracing::info!("Periodic refresh disabled, sweeping once");
            orchestrator.refresh_all().await;
        }
        Some(period) => {
            let cancel = CancellationToken::new();
            let handle = spawn_refresh_loop(orchestrator.clone(), period, true, cancel.clone());

            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            cancel.cancel();
            if let Err(e) = handle.await {
                tracing::error!("Refresh loop ended abnormally: {}", e);
            }
        }
    }

    // Last handle: dropping it closes the event channel and ends the printer.
    drop(orchestrator);
    match tokio::task::spawn_blocking(move || printer.join()).await {
        Ok(Ok(out)) => Some(out),
        _ => {
            tracing::error!("Event printer stopped abnormally");
            None
        }
    }
}

fn write_event(out: &mut impl Write, event: &WeatherEvent) -> std::io::Result<()> {
    match event {
        WeatherEvent::CityRefreshed { snapshot, .. } => writeln!(out, "{}", summary_line(snapshot)),
        WeatherEvent::CityRemoved { name } => writeln!(out, "{} removed", name),
        WeatherEvent::SweepCompleted {
            finished_at,
            failed,
            ..
        } => {
            if *failed > 0 {
                writeln!(out, "{} cities kept their last-known weather", failed)?;
            }
            writeln!(out, "Last updated: {}", finished_at.format("%H:%M:%S"))?;
            out.flush()
        }
    }
}

fn summary_line(snapshot: &WeatherSnapshot) -> String {
    format!(
        "{}: {}°C, {}, humidity {}%, wind {} km/h",
        snapshot.city_name,
        snapshot.temperature,
        snapshot.description,
        snapshot.humidity,
        snapshot.wind_speed
    )
}

fn forecast_line(day: &ForecastDay) -> String {
    let precipitation = day
        .precipitation_probability
        .map(|p| format!("{:.0}%", p))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "  {}  {:>3}°C / {:>3}°C  rain {:>4}  wind {:>3} km/h  {}",
        day.date.format("%a %d %b"),
        day.temp_max,
        day.temp_min,
        precipitation,
        day.wind_speed,
        day.description
    )
}

fn print_city(snapshot: &WeatherSnapshot, forecast: &[ForecastDay]) {
    println!("{}", summary_line(snapshot));
    for day in forecast {
        println!("{}", forecast_line(day));
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::parse_from(["skywatch", "add", "New York"]);
        assert!(matches!(cli.command, Command::Add { ref city } if city == "New York"));

        let cli = Cli::parse_from(["skywatch", "watch", "--config", "/tmp/skywatch.toml"]);
        assert!(matches!(cli.command, Command::Watch));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/skywatch.toml")));
    }

    #[test]
    fn formats_forecast_line() {
        let day = ForecastDay {
            date: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            temp_max: 18,
            temp_min: 9,
            precipitation_probability: None,
            wind_speed: 15,
            description: "Mainly clear".to_string(),
        };
        let line = forecast_line(&day);
        assert!(line.contains("Sat 17 Oct"));
        assert!(line.contains("n/a"));
        assert!(line.ends_with("Mainly clear"));
    }

    fn offline_orchestrator(dir: &std::path::Path) -> Arc<RefreshOrchestrator> {
        let client = GeoWeatherClient::new(Duration::from_secs(2))
            .unwrap()
            .with_endpoints("http://127.0.0.1:9/v1/search", "http://127.0.0.1:9/v1/forecast");
        Arc::new(RefreshOrchestrator::new(client, CityStore::open(dir)))
    }

    #[tokio::test]
    async fn watch_once_writes_every_event_before_returning() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = offline_orchestrator(dir.path());
        orchestrator.store().save_cities(&["Paris".to_string()]);
        orchestrator.restore();

        let out = watch(orchestrator, None, Vec::new()).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1 cities kept their last-known weather"), "{text}");
        assert!(text.lines().last().unwrap().starts_with("Last updated: "));
    }
}

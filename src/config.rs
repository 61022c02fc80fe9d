//! Command line, runtime configuration and logging setup

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tui_dispatch_debug::DebugCliArgs;

use crate::api::{
    DEFAULT_CITIES_URL, DEFAULT_GEOCODE_URL, DEFAULT_GEOLOCATE_URL, DEFAULT_WEATHER_URL, Endpoints,
};
use crate::route::{Route, RouteError};
use crate::state::Units;

pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
const APP_DIR: &str = "city-weather";

/// City weather explorer
#[derive(Parser, Debug)]
#[command(name = "city-weather")]
#[command(about = "Search cities, compare temperatures and browse forecasts")]
pub struct Args {
    /// Route to open on start, e.g. `/weather/Lisbon?unit=imperial`
    #[arg(long)]
    pub open: Option<String>,

    /// Unit system for detail views
    #[arg(long, default_value = "metric", value_parser = ["metric", "imperial"])]
    pub units: String,

    /// Directory for the preferences store and log file
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// OpenWeatherMap API key (defaults to $OPENWEATHER_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_CITIES_URL)]
    pub cities_url: String,

    #[arg(long, default_value = DEFAULT_WEATHER_URL)]
    pub weather_url: String,

    #[arg(long, default_value = DEFAULT_GEOCODE_URL)]
    pub geocode_url: String,

    #[arg(long, default_value = DEFAULT_GEOLOCATE_URL)]
    pub geolocate_url: String,

    #[command(flatten)]
    pub debug: DebugCliArgs,
}

/// Settings shared with the effect handler
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub endpoints: Endpoints,
    pub api_key: String,
    pub data_dir: PathBuf,
    pub start_route: Route,
    pub units: Units,
    pub log_level: String,
}

impl RuntimeConfig {
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("city-weather.log")
    }
}

impl Args {
    /// Split into runtime settings and the debug session arguments.
    pub fn into_runtime(self) -> Result<(RuntimeConfig, DebugCliArgs), RouteError> {
        let flag_units = Units::from_query(&self.units);
        let start_route = match self.open.as_deref() {
            Some(path) => Route::parse_with_units(path, flag_units)?,
            None => Route::Home,
        };
        let units = start_route.units().unwrap_or(flag_units);
        let api_key = self
            .api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .unwrap_or_default();
        let data_dir = self.data_dir.unwrap_or_else(default_data_dir);

        let config = RuntimeConfig {
            endpoints: Endpoints {
                cities: self.cities_url,
                weather: self.weather_url,
                geocode: self.geocode_url,
                geolocate: self.geolocate_url,
            },
            api_key,
            data_dir,
            start_route,
            units,
            log_level: self.log_level,
        };
        Ok((config, self.debug))
    }
}

fn default_data_dir() -> PathBuf {
    dirs_next::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Route tracing output to a log file; the terminal belongs to the UI.
pub fn init_tracing(log_path: &Path, level: &str) -> io::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| io::Error::other(format!("tracing init failed: {e}")))
}

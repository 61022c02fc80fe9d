//! Application state - single source of truth

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tui_dispatch::DataResource;

use crate::prefs::Preferences;
use crate::route::Route;
use crate::search::SearchSession;
use crate::view::{self, ViewFilterState};

/// A city row from the directory service, optionally enriched with temperatures
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct City {
    pub name: String,
    pub country: String,
    pub timezone: String,
    /// Daily high in °C, `None` when enrichment failed
    pub high_temp: Option<f64>,
    /// Daily low in °C, `None` when enrichment failed
    pub low_temp: Option<f64>,
}

impl City {
    pub fn new(
        name: impl Into<String>,
        country: impl Into<String>,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            timezone: timezone.into(),
            high_temp: None,
            low_temp: None,
        }
    }

    pub fn with_temps(mut self, high: f64, low: f64) -> Self {
        self.high_temp = Some(high);
        self.low_temp = Some(low);
        self
    }
}

/// Unit system used for detail requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn toggle(&self) -> Self {
        match self {
            Units::Metric => Units::Imperial,
            Units::Imperial => Units::Metric,
        }
    }

    /// Value of the `units` / `unit` query parameter
    pub fn as_query(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    /// Unknown values fall back to metric.
    pub fn from_query(value: &str) -> Self {
        if value.eq_ignore_ascii_case("imperial") {
            Units::Imperial
        } else {
            Units::Metric
        }
    }

    pub fn temp_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    pub fn wind_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "m/s",
            Units::Imperial => "mph",
        }
    }

    pub fn format_temp(&self, value: f64) -> String {
        format!("{:.1}{}", value, self.temp_suffix())
    }

    pub fn format_wind(&self, value: f64) -> String {
        format!("{:.1} {}", value, self.wind_suffix())
    }
}

/// Which input of the explorer receives key events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Focus {
    #[default]
    Search,
    CityFilter,
    CountryFilter,
    TimezoneFilter,
    Table,
}

impl Focus {
    const ORDER: [Focus; 5] = [
        Focus::Search,
        Focus::CityFilter,
        Focus::CountryFilter,
        Focus::TimezoneFilter,
        Focus::Table,
    ];

    fn index(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|focus| focus == self)
            .unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    pub fn prev(&self) -> Self {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Weather category derived from an OpenWeatherMap condition id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Condition {
    Thunderstorm,
    Rain,
    Snow,
    Haze,
    Mist,
    Clear,
    Cloudy,
    Default,
}

impl Condition {
    /// Missing ids are treated as clear sky (800).
    pub fn from_id(id: Option<u16>) -> Self {
        match id.unwrap_or(800) {
            200..=299 => Condition::Thunderstorm,
            300..=399 | 500..=599 => Condition::Rain,
            600..=699 => Condition::Snow,
            721 => Condition::Haze,
            700..=799 => Condition::Mist,
            800 => Condition::Clear,
            801..=809 => Condition::Cloudy,
            _ => Condition::Default,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Condition::Thunderstorm => "Thunderstorm",
            Condition::Rain => "Rain",
            Condition::Snow => "Snow",
            Condition::Haze => "Haze",
            Condition::Mist => "Mist",
            Condition::Clear => "Clear",
            Condition::Cloudy => "Cloudy",
            Condition::Default => "Weather",
        }
    }
}

/// Current conditions for the detail view
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CurrentWeather {
    pub name: String,
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub description: String,
    pub condition_id: Option<u16>,
    pub wind_speed: f64,
    pub lat: f64,
    pub lon: f64,
}

impl CurrentWeather {
    pub fn condition(&self) -> Condition {
        Condition::from_id(self.condition_id)
    }
}

/// One day of the forecast (every 8th 3-hour slot)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub high: f64,
    pub low: f64,
    pub description: String,
}

/// Everything the detail view renders for one location
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CityWeather {
    pub current: CurrentWeather,
    pub forecast: Vec<ForecastDay>,
    /// Raw current-weather payload, stored as the history snapshot
    pub raw: serde_json::Value,
}

/// Rows taken by the search bar, filters, table header/borders and status bar.
pub const TABLE_CHROME_ROWS: u16 = 10;

/// Application state - everything the UI needs to render
#[derive(Clone, Debug, tui_dispatch::DebugState, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppState {
    // --- Search session ---
    #[debug(section = "Search", label = "Query", debug_fmt)]
    pub search: SearchSession,

    /// Accumulated, deduplicated rows for the active query
    #[debug(skip)]
    pub cities: Vec<City>,

    #[debug(section = "Search", label = "Suggestions", debug_fmt)]
    pub suggestions: Vec<String>,

    // --- Table view ---
    #[debug(section = "View", label = "Filters", debug_fmt)]
    pub filters: ViewFilterState,

    /// Selected index into the derived rows
    #[debug(section = "View", label = "Selected")]
    pub selected: usize,

    #[debug(section = "View", label = "Focus", debug_fmt)]
    pub focus: Focus,

    #[debug(section = "View", label = "Terminal", debug_fmt)]
    pub terminal_size: (u16, u16),

    // --- Preferences ---
    #[debug(section = "Preferences", label = "Store", debug_fmt)]
    pub prefs: Preferences,

    // --- Detail view ---
    #[debug(section = "Detail", label = "Route", debug_fmt)]
    pub route: Route,

    #[debug(section = "Detail", label = "Weather", debug_fmt)]
    pub detail: DataResource<CityWeather>,

    #[debug(section = "Detail", label = "Place", debug_fmt)]
    pub place_name: Option<String>,

    #[debug(section = "Detail", label = "Units", debug_fmt)]
    pub units: Units,
}

impl AppState {
    /// Display units follow the route's own units when it has any.
    pub fn new(route: Route, units: Units, prefs: Preferences) -> Self {
        let units = route.units().unwrap_or(units);
        Self {
            search: SearchSession::default(),
            cities: Vec::new(),
            suggestions: Vec::new(),
            filters: ViewFilterState::default(),
            selected: 0,
            focus: Focus::default(),
            terminal_size: (80, 24),
            prefs,
            route,
            detail: DataResource::Empty,
            place_name: None,
            units,
        }
    }

    /// Filtered and sorted rows as shown in the table
    pub fn rows(&self) -> Vec<City> {
        view::derive(&self.cities, &self.search.query, &self.filters)
    }

    /// Same as `rows().len()` without cloning
    pub fn row_count(&self) -> usize {
        self.cities
            .iter()
            .filter(|city| view::matches(city, &self.search.query, &self.filters))
            .count()
    }

    pub fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.row_count().saturating_sub(1));
    }

    /// Number of table rows visible at the current terminal height
    pub fn table_viewport(&self) -> usize {
        self.terminal_size.1.saturating_sub(TABLE_CHROME_ROWS).max(1) as usize
    }

    pub fn in_detail(&self) -> bool {
        !matches!(self.route, Route::Home)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Route::Home, Units::default(), Preferences::default())
    }
}

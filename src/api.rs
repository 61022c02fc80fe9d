//! HTTP clients for the city directory, OpenWeatherMap, Nominatim and
//! IP geolocation

use std::time::Duration;

use chrono::DateTime;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::state::{City, CityWeather, CurrentWeather, ForecastDay, Units};
use crate::suggest::{self, SUGGESTION_LIMIT};

// ============================================================================
// Configuration
// ============================================================================

pub const DATASET: &str = "geonames-all-cities-with-a-population-1000";
pub const DEFAULT_CITIES_URL: &str = "https://public.opendatasoft.com/api/records/1.0/search/";
pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_GEOCODE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_GEOLOCATE_URL: &str = "http://ip-api.com";

const USER_AGENT: &str = concat!("city-weather/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// One-shot position lookup timeout
pub const GEOLOCATE_TIMEOUT: Duration = Duration::from_secs(10);
/// Forecast entries are 3-hourly; one per day
const FORECAST_STRIDE: usize = 8;
const MAP_DELTA: f64 = 0.05;

/// Base URLs of every collaborator
#[derive(Clone, Debug, PartialEq)]
pub struct Endpoints {
    pub cities: String,
    pub weather: String,
    pub geocode: String,
    pub geolocate: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            cities: DEFAULT_CITIES_URL.into(),
            weather: DEFAULT_WEATHER_URL.into(),
            geocode: DEFAULT_GEOCODE_URL.into(),
            geolocate: DEFAULT_GEOLOCATE_URL.into(),
        }
    }
}

impl Endpoints {
    /// All services served from one base URL (mock servers)
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            cities: format!("{base}/search"),
            weather: format!("{base}/data/2.5"),
            geocode: base.to_string(),
            geolocate: base.to_string(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Weather API error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("{0}")]
    Failed(&'static str),
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response is missing `{0}`")]
    MissingField(&'static str),
    #[error("Invalid city name.")]
    InvalidCity,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    records: Vec<SearchRecord>,
    #[serde(default)]
    nhits: u64,
}

#[derive(Debug, Deserialize)]
struct SearchRecord {
    #[serde(default)]
    fields: RecordFields,
}

#[derive(Debug, Default, Deserialize)]
struct RecordFields {
    #[serde(default)]
    name: String,
    cou_name_en: Option<String>,
    timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    name: String,
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    #[serde(default)]
    wind: WindBlock,
    #[serde(default)]
    coord: CoordBlock,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    pressure: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ConditionBlock {
    id: Option<u16>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct WindBlock {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
struct CoordBlock {
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: ForecastMain,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct ForecastMain {
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeolocateResponse {
    lat: Option<f64>,
    lon: Option<f64>,
}

// ============================================================================
// Results
// ============================================================================

/// Raw (unenriched) directory page
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CityPage {
    pub cities: Vec<City>,
    pub total: u64,
}

/// Temperatures attached to a directory city
#[derive(Clone, Debug, PartialEq)]
pub struct Enrichment {
    pub high: f64,
    pub low: f64,
    pub raw: Value,
}

// ============================================================================
// Client
// ============================================================================

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    endpoints: Endpoints,
    api_key: String,
}

impl ApiClient {
    pub fn new(endpoints: Endpoints, api_key: impl Into<String>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoints,
            api_key: api_key.into(),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn search_url(&self, query: &str, rows: usize, start: usize) -> String {
        let query = query.trim();
        let mut url = format!(
            "{}?dataset={}&q={}&rows={}&start={}",
            self.endpoints.cities,
            DATASET,
            urlencoding::encode(query),
            rows,
            start
        );
        if query.is_empty() {
            url.push_str("&sort=population");
        }
        url
    }

    /// One page of the city directory. An empty query browses by population.
    pub async fn search_cities(
        &self,
        query: &str,
        rows: usize,
        start: usize,
    ) -> Result<CityPage, ApiError> {
        let url = self.search_url(query, rows, start);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let data: SearchResponse = response.json().await?;

        let cities = data
            .records
            .into_iter()
            .map(|record| {
                let fields = record.fields;
                City::new(
                    fields.name,
                    fields.cou_name_en.unwrap_or_default(),
                    fields.timezone.unwrap_or_default(),
                )
            })
            .collect();

        Ok(CityPage {
            cities,
            total: data.nhits,
        })
    }

    /// Today's high/low for a city, in °C. Never fails; `None` when the
    /// lookup does not yield both temperatures.
    pub async fn enrich(&self, city_name: &str) -> Option<Enrichment> {
        let url = format!(
            "{}/weather?q={}&appid={}&units=metric",
            self.endpoints.weather,
            urlencoding::encode(city_name),
            self.api_key
        );

        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(city = city_name, "enrichment request failed: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::debug!(
                city = city_name,
                "enrichment returned status {}",
                response.status()
            );
            return None;
        }

        let raw: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(city = city_name, "enrichment parse error: {}", e);
                return None;
            }
        };

        let high = raw.pointer("/main/temp_max").and_then(Value::as_f64)?;
        let low = raw.pointer("/main/temp_min").and_then(Value::as_f64)?;
        Some(Enrichment { high, low, raw })
    }

    /// Up to five distinct city names matching `term`. No request for a blank term.
    pub async fn fetch_suggestions(&self, term: &str) -> Result<Vec<String>, ApiError> {
        if term.trim().is_empty() {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}?dataset={}&q={}&rows={}",
            self.endpoints.cities,
            DATASET,
            urlencoding::encode(term.trim()),
            SUGGESTION_LIMIT
        );
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let data: SearchResponse = response.json().await?;

        Ok(suggest::distinct_names(
            data.records.into_iter().map(|record| record.fields.name),
        ))
    }

    /// Current conditions and forecast for a named city, fetched concurrently.
    pub async fn fetch_city_weather(
        &self,
        city_name: &str,
        units: Units,
    ) -> Result<CityWeather, ApiError> {
        let city_name = city_name.trim();
        if city_name.is_empty() {
            return Err(ApiError::InvalidCity);
        }
        let location = format!("q={}", urlencoding::encode(city_name));

        let (current, forecast) = tokio::join!(
            self.get_weather("weather", &location, units),
            self.get_weather("forecast", &location, units)
        );
        let current = current?;
        let forecast = forecast?;

        if !current.status().is_success() {
            return Err(ApiError::Failed("Failed to fetch current weather"));
        }
        if !forecast.status().is_success() {
            return Err(ApiError::Failed("Failed to fetch forecast"));
        }

        build_city_weather(current.json().await?, forecast.json().await?)
    }

    /// Current conditions and forecast at a position, fetched concurrently.
    pub async fn fetch_coords_weather(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<CityWeather, ApiError> {
        let location = format!("lat={lat}&lon={lon}");

        let (current, forecast) = tokio::join!(
            self.get_weather("weather", &location, units),
            self.get_weather("forecast", &location, units)
        );
        let current = checked(current?).await?;
        let forecast = checked(forecast?).await?;

        build_city_weather(current.json().await?, forecast.json().await?)
    }

    async fn get_weather(
        &self,
        resource: &str,
        location: &str,
        units: Units,
    ) -> Result<Response, reqwest::Error> {
        let url = format!(
            "{}/{}?{}&appid={}&units={}",
            self.endpoints.weather,
            resource,
            location,
            self.api_key,
            units.as_query()
        );
        self.http.get(&url).send().await
    }

    /// Place name for a position, falling back to the formatted coordinates.
    pub async fn reverse_geocode(&self, lat: f64, lon: f64) -> String {
        let fallback = || format!("{lat:.4}, {lon:.4}");
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=json",
            self.endpoints.geocode, lat, lon
        );

        let response = match self.http.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!("reverse geocode returned status {}", r.status());
                return fallback();
            }
            Err(e) => {
                tracing::debug!("reverse geocode request failed: {}", e);
                return fallback();
            }
        };

        let body: NominatimResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("reverse geocode parse error: {}", e);
                return fallback();
            }
        };

        body.address
            .and_then(|addr| addr.city.or(addr.town).or(addr.village))
            .unwrap_or_else(fallback)
    }

    /// One-shot position lookup. Never cached.
    pub async fn geolocate(&self) -> Result<(f64, f64), ApiError> {
        let url = format!("{}/json", self.endpoints.geolocate);
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .timeout(GEOLOCATE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let body: GeolocateResponse = response.json().await?;

        let lat = body.lat.ok_or(ApiError::MissingField("lat"))?;
        let lon = body.lon.ok_or(ApiError::MissingField("lon"))?;
        tracing::info!(lat, lon, "geolocated");
        Ok((lat, lon))
    }
}

async fn checked(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

fn build_city_weather(raw: Value, forecast: Value) -> Result<CityWeather, ApiError> {
    let current: CurrentResponse = serde_json::from_value(raw.clone())?;
    let forecast: ForecastResponse = serde_json::from_value(forecast)?;
    let condition = current.weather.into_iter().next().unwrap_or_default();

    Ok(CityWeather {
        current: CurrentWeather {
            name: current.name,
            temp: current.main.temp,
            feels_like: current.main.feels_like,
            humidity: current.main.humidity,
            pressure: current.main.pressure,
            description: condition.description,
            condition_id: condition.id,
            wind_speed: current.wind.speed,
            lat: current.coord.lat,
            lon: current.coord.lon,
        },
        forecast: forecast_days(forecast.list)?,
        raw,
    })
}

/// Every 8th 3-hour slot, one per day.
fn forecast_days(list: Vec<ForecastEntry>) -> Result<Vec<ForecastDay>, ApiError> {
    list.into_iter()
        .step_by(FORECAST_STRIDE)
        .map(|entry| {
            let date = DateTime::from_timestamp(entry.dt, 0)
                .ok_or(ApiError::MissingField("list.dt"))?
                .date_naive();
            let description = entry
                .weather
                .into_iter()
                .next()
                .map(|c| c.description)
                .unwrap_or_default();
            Ok(ForecastDay {
                date,
                high: entry.main.temp_max,
                low: entry.main.temp_min,
                description,
            })
        })
        .collect()
}

/// OpenStreetMap embed URL centred on a position
pub fn map_url(lat: f64, lon: f64) -> String {
    format!(
        "https://www.openstreetmap.org/export/embed.html?bbox={},{},{},{}&layer=mapnik&marker={},{}",
        lon - MAP_DELTA,
        lat - MAP_DELTA,
        lon + MAP_DELTA,
        lat + MAP_DELTA,
        lat,
        lon
    )
}

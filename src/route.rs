//! Navigation routes: `/`, `/weather/{city}` and `/weather/coords`

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::Units;

#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error("unknown route: {0}")]
    UnknownPath(String),
    #[error("invalid coordinate `{0}`")]
    InvalidCoordinate(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum Route {
    /// City explorer
    #[default]
    Home,
    /// Detail view for a named city
    City { name: String, units: Units },
    /// Detail view by coordinates; `None` until geolocation resolves
    Coords {
        position: Option<(f64, f64)>,
        units: Units,
    },
}

impl Route {
    pub fn city(name: impl Into<String>, units: Units) -> Self {
        Route::City {
            name: name.into(),
            units,
        }
    }

    pub fn parse(input: &str) -> Result<Self, RouteError> {
        Self::parse_with_units(input, Units::default())
    }

    /// Parse a route, using `fallback` when the path carries no `unit` parameter.
    pub fn parse_with_units(input: &str, fallback: Units) -> Result<Self, RouteError> {
        let input = input.trim();
        let (path, query) = input.split_once('?').unwrap_or((input, ""));
        let params = QueryParams::parse(query);
        let units = params
            .get("unit")
            .map(|unit| Units::from_query(&unit))
            .unwrap_or(fallback);

        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return Ok(Route::Home);
        }

        let Some(segment) = path.strip_prefix("/weather/") else {
            return Err(RouteError::UnknownPath(input.to_string()));
        };
        if segment.contains('/') {
            return Err(RouteError::UnknownPath(input.to_string()));
        }

        if segment == "coords" {
            let position = match (params.get("lat"), params.get("lon")) {
                (Some(lat), Some(lon)) => {
                    Some((parse_coordinate(&lat)?, parse_coordinate(&lon)?))
                }
                _ => None,
            };
            return Ok(Route::Coords { position, units });
        }

        Ok(Route::City {
            name: decode(segment),
            units,
        })
    }

    pub fn to_path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::City { name, units } => format!(
                "/weather/{}?unit={}",
                urlencoding::encode(name),
                units.as_query()
            ),
            Route::Coords {
                position: Some((lat, lon)),
                units,
            } => format!(
                "/weather/coords?lat={}&lon={}&unit={}",
                lat,
                lon,
                units.as_query()
            ),
            Route::Coords {
                position: None,
                units,
            } => format!("/weather/coords?unit={}", units.as_query()),
        }
    }

    pub fn units(&self) -> Option<Units> {
        match self {
            Route::Home => None,
            Route::City { units, .. } | Route::Coords { units, .. } => Some(*units),
        }
    }

    /// Same location in another unit system
    pub fn with_units(&self, new_units: Units) -> Self {
        match self {
            Route::Home => Route::Home,
            Route::City { name, .. } => Route::City {
                name: name.clone(),
                units: new_units,
            },
            Route::Coords { position, .. } => Route::Coords {
                position: *position,
                units: new_units,
            },
        }
    }
}

fn decode(value: &str) -> String {
    let value = value.replace('+', " ");
    match urlencoding::decode(&value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value,
    }
}

fn parse_coordinate(value: &str) -> Result<f64, RouteError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RouteError::InvalidCoordinate(value.to_string()))
}

struct QueryParams<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> QueryParams<'a> {
    fn parse(query: &'a str) -> Self {
        let pairs = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .collect();
        Self { pairs }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| decode(v))
    }
}

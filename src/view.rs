//! Filter/sort view model over the accumulated city list

use std::cmp::Ordering;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::City;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SortColumn {
    Name,
    Country,
    Timezone,
    HighTemp,
    LowTemp,
}

impl SortColumn {
    pub const ALL: [SortColumn; 5] = [
        SortColumn::Name,
        SortColumn::Country,
        SortColumn::Timezone,
        SortColumn::HighTemp,
        SortColumn::LowTemp,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SortColumn::Name => "City",
            SortColumn::Country => "Country",
            SortColumn::Timezone => "Timezone",
            SortColumn::HighTemp => "High",
            SortColumn::LowTemp => "Low",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggle(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortOrder::Asc => "▲",
            SortOrder::Desc => "▼",
        }
    }
}

/// Column filter inputs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum FilterColumn {
    City,
    Country,
    Timezone,
}

/// Per-column filters and sort selection. Never persisted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ViewFilterState {
    pub city_filter: String,
    pub country_filter: String,
    pub timezone_filter: String,
    pub sort_column: Option<SortColumn>,
    pub sort_order: SortOrder,
}

impl ViewFilterState {
    /// Same column flips the order; a new column starts ascending.
    pub fn toggle_sort(&mut self, column: SortColumn) {
        if self.sort_column == Some(column) {
            self.sort_order = self.sort_order.toggle();
        } else {
            self.sort_column = Some(column);
            self.sort_order = SortOrder::Asc;
        }
    }

    pub fn set_filter(&mut self, column: FilterColumn, value: String) {
        match column {
            FilterColumn::City => self.city_filter = value,
            FilterColumn::Country => self.country_filter = value,
            FilterColumn::Timezone => self.timezone_filter = value,
        }
    }

    pub fn filter(&self, column: FilterColumn) -> &str {
        match column {
            FilterColumn::City => &self.city_filter,
            FilterColumn::Country => &self.country_filter,
            FilterColumn::Timezone => &self.timezone_filter,
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    needle.is_empty() || haystack.to_lowercase().contains(&needle)
}

/// Row predicate: every non-empty filter must match as a substring.
pub fn matches(city: &City, search: &str, filters: &ViewFilterState) -> bool {
    contains_ci(&city.name, search)
        && contains_ci(&city.name, &filters.city_filter)
        && contains_ci(&city.country, &filters.country_filter)
        && contains_ci(&city.timezone, &filters.timezone_filter)
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Missing values go last regardless of `order`.
fn compare_temp(a: Option<f64>, b: Option<f64>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => a.total_cmp(&b),
            SortOrder::Desc => b.total_cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare(a: &City, b: &City, column: SortColumn, order: SortOrder) -> Ordering {
    let directed = |ordering: Ordering| match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    };
    match column {
        SortColumn::Name => directed(compare_text(&a.name, &b.name)),
        SortColumn::Country => directed(compare_text(&a.country, &b.country)),
        SortColumn::Timezone => directed(compare_text(&a.timezone, &b.timezone)),
        SortColumn::HighTemp => compare_temp(a.high_temp, b.high_temp, order),
        SortColumn::LowTemp => compare_temp(a.low_temp, b.low_temp, order),
    }
}

/// Filtered then (stably) sorted copy of `cities`.
pub fn derive(cities: &[City], search: &str, filters: &ViewFilterState) -> Vec<City> {
    let mut rows: Vec<City> = cities
        .iter()
        .filter(|city| matches(city, search, filters))
        .cloned()
        .collect();

    if let Some(column) = filters.sort_column {
        rows.sort_by(|a, b| compare(a, b, column, filters.sort_order));
    }
    rows
}

//! Actions - intents from the UI and results from async tasks

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::route::Route;
use crate::search::{PageRequest, PageResult};
use crate::state::{CityWeather, Focus};
use crate::view::{FilterColumn, SortColumn};

/// Application actions with automatic category inference
#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[action(infer_categories)]
pub enum Action {
    /// Startup: load the first page and the start route
    Init,

    // ===== Search category =====
    /// Search text changed; restarts the session
    SearchQueryChange(String),

    /// Result: one page of enriched cities
    SearchPageDidLoad {
        request: PageRequest,
        result: PageResult,
    },

    /// Result: page request failed
    SearchPageDidError { request: PageRequest, error: String },

    /// Replace the search text with the ghost completion
    SearchAcceptGhost,

    // ===== Suggest category =====
    SuggestDidLoad { term: String, names: Vec<String> },

    SuggestDidError { term: String },

    // ===== Table category =====
    /// Move the selection by a number of rows
    TableMove(i16),

    /// Move the selection by whole viewports
    TablePage(i16),

    // ===== View category =====
    /// Sort by a column (repeat to flip the order)
    ViewSortBy(SortColumn),

    ViewFilterChange { column: FilterColumn, value: String },

    // ===== Focus category =====
    FocusNext,
    FocusPrev,
    FocusSet(Focus),

    // ===== Favorite category =====
    FavoriteToggle(String),

    /// Open the favorite at the given index
    FavoriteOpen(usize),

    // ===== Detail category =====
    /// Open the detail view for a city name
    DetailOpen(String),

    /// Back to the explorer
    DetailClose,

    DetailRefresh,

    /// Result: detail weather for `route`
    DetailDidLoad {
        route: Route,
        weather: CityWeather,
        place: Option<String>,
        fetched_at: DateTime<Utc>,
    },

    DetailDidError { route: Route, error: String },

    // ===== Location category =====
    /// Open the detail view for the current position
    LocationRequest,

    LocationDidResolve { lat: f64, lon: f64 },

    LocationDidError(String),

    // ===== UI category =====
    /// Switch metric/imperial (re-fetches the open detail)
    UiToggleUnits,

    UiTerminalResize(u16, u16),

    /// Force a re-render (for cursor movement, etc.)
    Render,

    // ===== Uncategorized (global) =====
    Quit,
}

//! Favorites and view history

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Most recent entries kept in history
pub const HISTORY_LIMIT: usize = 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HistoryEntry {
    pub city: String,
    pub timestamp: DateTime<Utc>,
    /// Weather payload captured when the city was viewed
    #[serde(default)]
    pub weather: serde_json::Value,
}

/// Persisted user preferences
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Preferences {
    /// Insertion ordered, no duplicates
    pub favorites: Vec<String>,
    /// Most recent first
    pub history: Vec<HistoryEntry>,
}

impl Preferences {
    pub fn is_favorite(&self, city: &str) -> bool {
        self.favorites.iter().any(|name| name == city)
    }

    /// Add `city` if absent, remove it otherwise. Returns whether it is now a favorite.
    pub fn toggle_favorite(&mut self, city: &str) -> bool {
        if let Some(index) = self.favorites.iter().position(|name| name == city) {
            self.favorites.remove(index);
            false
        } else {
            self.favorites.push(city.to_string());
            true
        }
    }

    pub fn add_history(&mut self, entry: HistoryEntry) {
        self.history.insert(0, entry);
        self.history.truncate(HISTORY_LIMIT);
    }

    /// Replace the contents with a stored snapshot, restoring the invariants
    /// a hand-edited file may have broken.
    pub fn load(&mut self, snapshot: Preferences) {
        let mut favorites: Vec<String> = Vec::with_capacity(snapshot.favorites.len());
        for name in snapshot.favorites {
            if !favorites.contains(&name) {
                favorites.push(name);
            }
        }

        let mut history = snapshot.history;
        history.truncate(HISTORY_LIMIT);

        *self = Self { favorites, history };
    }

    /// Parse a stored snapshot. Missing fields take their defaults.
    pub fn from_snapshot(json: &str) -> Result<Self, serde_json::Error> {
        let snapshot: Preferences = serde_json::from_str(json)?;
        let mut prefs = Preferences::default();
        prefs.load(snapshot);
        Ok(prefs)
    }

    pub fn to_snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

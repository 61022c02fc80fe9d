//! Effects - side effects declared by the reducer

use crate::prefs::Preferences;
use crate::route::Route;
use crate::search::PageRequest;

/// Side effects that can be triggered by actions
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Debounced page-1 request for a new query
    FetchFirstPage(PageRequest),
    /// Immediate request for the next page
    FetchNextPage(PageRequest),
    /// Debounced suggestion lookup; a blank term cancels the pending one
    FetchSuggestions { term: String },
    /// Current weather and forecast for a city or coordinates route
    FetchDetail(Route),
    /// One-shot position lookup
    Geolocate,
    /// Write the preferences snapshot
    PersistPreferences(Preferences),
}

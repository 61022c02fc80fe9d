//! Reducer - pure function: (state, action) -> DispatchResult

use tui_dispatch::{DataResource, DispatchResult};

use crate::action::Action;
use crate::effect::Effect;
use crate::prefs::HistoryEntry;
use crate::route::Route;
use crate::scroll::{ScrollMetrics, should_request_next_page};
use crate::state::AppState;
use crate::suggest::ghost_completion;

/// The reducer handles all state transitions
pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init => {
            let request = state.search.restart(state.search.query.clone());
            state.cities.clear();
            state.selected = 0;

            let mut effects = vec![Effect::FetchFirstPage(request)];
            effects.extend(detail_effect(state));
            DispatchResult::changed_with_many(effects)
        }

        // ===== Search actions =====
        Action::SearchQueryChange(query) => {
            if query == state.search.query {
                return DispatchResult::unchanged();
            }
            DispatchResult::changed_with_many(start_search(state, query))
        }

        Action::SearchAcceptGhost => {
            match ghost_completion(&state.search.query, &state.suggestions) {
                Some(completion) => {
                    DispatchResult::changed_with_many(start_search(state, completion))
                }
                None => DispatchResult::unchanged(),
            }
        }

        Action::SearchPageDidLoad { request, result } => {
            if !state.search.is_current(&request) {
                return DispatchResult::unchanged();
            }
            state.search.commit(&mut state.cities, &request, result);
            state.clamp_selection();
            DispatchResult::changed()
        }

        Action::SearchPageDidError { request, error } => {
            if !state.search.is_current(&request) {
                return DispatchResult::unchanged();
            }
            state.search.fail(error);
            DispatchResult::changed()
        }

        // ===== Suggest actions =====
        Action::SuggestDidLoad { term, names } => {
            if term != state.search.query {
                return DispatchResult::unchanged();
            }
            state.suggestions = names;
            DispatchResult::changed()
        }

        Action::SuggestDidError { term } => {
            if term != state.search.query || state.suggestions.is_empty() {
                return DispatchResult::unchanged();
            }
            state.suggestions.clear();
            DispatchResult::changed()
        }

        // ===== Table actions =====
        Action::TableMove(delta) => move_selection(state, delta as isize),

        Action::TablePage(pages) => {
            let delta = pages as isize * state.table_viewport() as isize;
            move_selection(state, delta)
        }

        // ===== View actions =====
        Action::ViewSortBy(column) => {
            state.filters.toggle_sort(column);
            state.selected = 0;
            DispatchResult::changed()
        }

        Action::ViewFilterChange { column, value } => {
            if state.filters.filter(column) == value {
                return DispatchResult::unchanged();
            }
            state.filters.set_filter(column, value);
            state.clamp_selection();
            DispatchResult::changed()
        }

        // ===== Focus actions =====
        Action::FocusNext => {
            state.focus = state.focus.next();
            DispatchResult::changed()
        }

        Action::FocusPrev => {
            state.focus = state.focus.prev();
            DispatchResult::changed()
        }

        Action::FocusSet(focus) => {
            if state.focus == focus {
                return DispatchResult::unchanged();
            }
            state.focus = focus;
            DispatchResult::changed()
        }

        // ===== Favorite actions =====
        Action::FavoriteToggle(city) => {
            if city.trim().is_empty() {
                return DispatchResult::unchanged();
            }
            state.prefs.toggle_favorite(&city);
            DispatchResult::changed_with(Effect::PersistPreferences(state.prefs.clone()))
        }

        Action::FavoriteOpen(index) => match state.prefs.favorites.get(index).cloned() {
            Some(city) => {
                let route = Route::city(city, state.units);
                open_detail(state, route)
            }
            None => DispatchResult::unchanged(),
        },

        // ===== Detail actions =====
        Action::DetailOpen(city) => {
            let route = Route::city(city, state.units);
            open_detail(state, route)
        }

        Action::DetailClose => {
            if !state.in_detail() {
                return DispatchResult::unchanged();
            }
            state.route = Route::Home;
            state.detail = DataResource::Empty;
            state.place_name = None;
            DispatchResult::changed()
        }

        Action::DetailRefresh => match detail_effect(state) {
            Some(effect) => DispatchResult::changed_with(effect),
            None => DispatchResult::unchanged(),
        },

        Action::DetailDidLoad {
            route,
            weather,
            place,
            fetched_at,
        } => {
            if route != state.route {
                return DispatchResult::unchanged();
            }
            let snapshot = weather.raw.clone();
            state.detail = DataResource::Loaded(weather);
            state.place_name = place;

            let Route::City { name, .. } = route else {
                return DispatchResult::changed();
            };
            let already_latest = state
                .prefs
                .history
                .first()
                .is_some_and(|entry| entry.city == name);
            if already_latest {
                return DispatchResult::changed();
            }
            state.prefs.add_history(HistoryEntry {
                city: name,
                timestamp: fetched_at,
                weather: snapshot,
            });
            DispatchResult::changed_with(Effect::PersistPreferences(state.prefs.clone()))
        }

        Action::DetailDidError { route, error } => {
            if route != state.route {
                return DispatchResult::unchanged();
            }
            state.detail = DataResource::Failed(error);
            DispatchResult::changed()
        }

        // ===== Location actions =====
        Action::LocationRequest => {
            state.route = Route::Coords {
                position: None,
                units: state.units,
            };
            state.detail = DataResource::Loading;
            state.place_name = None;
            DispatchResult::changed_with(Effect::Geolocate)
        }

        Action::LocationDidResolve { lat, lon } => {
            let Route::Coords {
                position: None,
                units,
            } = state.route
            else {
                return DispatchResult::unchanged();
            };
            let route = Route::Coords {
                position: Some((lat, lon)),
                units,
            };
            state.route = route.clone();
            state.detail = DataResource::Loading;
            DispatchResult::changed_with(Effect::FetchDetail(route))
        }

        Action::LocationDidError(error) => {
            if !matches!(state.route, Route::Coords { position: None, .. }) {
                return DispatchResult::unchanged();
            }
            state.detail = DataResource::Failed(format!("Failed to get location: {error}"));
            DispatchResult::changed()
        }

        // ===== UI actions =====
        Action::UiToggleUnits => {
            state.units = state.units.toggle();
            if !state.in_detail() {
                return DispatchResult::changed();
            }
            state.route = state.route.with_units(state.units);
            match detail_effect(state) {
                Some(effect) => DispatchResult::changed_with(effect),
                None => DispatchResult::changed(),
            }
        }

        Action::UiTerminalResize(width, height) => {
            if state.terminal_size == (width, height) {
                return DispatchResult::unchanged();
            }
            state.terminal_size = (width, height);
            DispatchResult::changed()
        }

        Action::Render => DispatchResult::changed(),

        // ===== Global actions =====
        Action::Quit => DispatchResult::unchanged(),
    }
}

/// Restart the search session for `query`.
fn start_search(state: &mut AppState, query: String) -> Vec<Effect> {
    let request = state.search.restart(query);
    state.cities.clear();
    state.selected = 0;
    if request.query.trim().is_empty() {
        state.suggestions.clear();
    }
    let term = request.query.clone();
    vec![
        Effect::FetchFirstPage(request),
        Effect::FetchSuggestions { term },
    ]
}

fn open_detail(state: &mut AppState, route: Route) -> DispatchResult<Effect> {
    state.route = route;
    state.place_name = None;
    match detail_effect(state) {
        Some(effect) => DispatchResult::changed_with(effect),
        None => DispatchResult::changed(),
    }
}

/// Mark the detail as loading and build the request for the current route.
fn detail_effect(state: &mut AppState) -> Option<Effect> {
    let effect = match &state.route {
        Route::Home => return None,
        Route::Coords { position: None, .. } => Effect::Geolocate,
        route => Effect::FetchDetail(route.clone()),
    };
    state.detail = DataResource::Loading;
    Some(effect)
}

/// Move the selection and request the next page when it nears the end.
fn move_selection(state: &mut AppState, delta: isize) -> DispatchResult<Effect> {
    let rows = state.row_count();
    let before = state.selected;
    if rows > 0 {
        state.selected = (before as isize + delta).clamp(0, rows as isize - 1) as usize;
    }

    let metrics = ScrollMetrics::for_selection(state.selected, state.table_viewport(), rows);
    if should_request_next_page(&metrics, &state.search) {
        if let Some(request) = state.search.advance() {
            return DispatchResult::changed_with(Effect::FetchNextPage(request));
        }
    }

    if state.selected != before {
        DispatchResult::changed()
    } else {
        DispatchResult::unchanged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{PageRequest, PageResult};
    use crate::state::{City, CityWeather, Units};
    use chrono::Utc;

    fn cities(count: usize) -> Vec<City> {
        (0..count)
            .map(|i| City::new(format!("City {i}"), "Country", "UTC"))
            .collect()
    }

    /// State with page 1 of a browse session committed
    fn loaded_state(count: usize, has_more: bool) -> AppState {
        let mut state = AppState::default();
        let request = state.search.restart(String::new());
        state.search.commit(
            &mut state.cities,
            &request,
            PageResult {
                cities: cities(count),
                has_more,
                total: 1000,
            },
        );
        state
    }

    #[test]
    fn test_init_fetches_first_page() {
        let mut state = AppState::default();

        let result = reducer(&mut state, Action::Init);

        assert!(result.changed);
        assert!(state.search.loading);
        assert_eq!(result.effects.len(), 1);
        assert!(matches!(
            &result.effects[0],
            Effect::FetchFirstPage(PageRequest { page: 1, .. })
        ));
    }

    #[test]
    fn test_init_with_city_route_loads_detail() {
        let mut state = AppState {
            route: Route::city("Lima", Units::Metric),
            ..Default::default()
        };

        let result = reducer(&mut state, Action::Init);

        assert_eq!(result.effects.len(), 2);
        assert!(state.detail.is_loading());
        assert_eq!(
            result.effects[1],
            Effect::FetchDetail(Route::city("Lima", Units::Metric))
        );
    }

    #[test]
    fn test_query_change_resets_session() {
        let mut state = loaded_state(50, true);
        state.selected = 10;
        let generation = state.search.generation;

        let result = reducer(&mut state, Action::SearchQueryChange("ber".into()));

        assert!(result.changed);
        assert!(state.cities.is_empty());
        assert_eq!(state.selected, 0);
        assert_eq!(state.search.generation, generation + 1);
        assert_eq!(result.effects.len(), 2);
        assert!(matches!(result.effects[0], Effect::FetchFirstPage(_)));
        assert_eq!(
            result.effects[1],
            Effect::FetchSuggestions { term: "ber".into() }
        );
    }

    #[test]
    fn test_same_query_is_ignored() {
        let mut state = AppState::default();
        reducer(&mut state, Action::SearchQueryChange("ber".into()));
        let result = reducer(&mut state, Action::SearchQueryChange("ber".into()));
        assert!(!result.changed);
        assert!(result.effects.is_empty());
    }

    #[test]
    fn test_clearing_query_clears_suggestions() {
        let mut state = AppState::default();
        reducer(&mut state, Action::SearchQueryChange("o".into()));
        state.suggestions = vec!["Oslo".into()];

        reducer(&mut state, Action::SearchQueryChange(String::new()));

        assert!(state.suggestions.is_empty());
    }

    #[test]
    fn test_stale_page_is_discarded() {
        let mut state = AppState::default();
        let stale = state.search.restart("a".into());
        reducer(&mut state, Action::SearchQueryChange("ab".into()));

        let result = reducer(
            &mut state,
            Action::SearchPageDidLoad {
                request: stale,
                result: PageResult {
                    cities: cities(3),
                    has_more: false,
                    total: 3,
                },
            },
        );

        assert!(!result.changed);
        assert!(state.cities.is_empty());
        assert!(state.search.loading);
    }

    #[test]
    fn test_move_near_bottom_requests_next_page_once() {
        let mut state = loaded_state(20, true);
        state.terminal_size = (100, 21);

        // 11 visible rows: selection 16 shows rows 6..=16, within 3 of the end
        let result = reducer(&mut state, Action::TableMove(15));
        assert!(result.effects.is_empty());

        let result = reducer(&mut state, Action::TableMove(1));
        assert_eq!(state.selected, 16);
        assert_eq!(result.effects.len(), 1);
        assert!(matches!(
            &result.effects[0],
            Effect::FetchNextPage(PageRequest { page: 2, .. })
        ));

        let result = reducer(&mut state, Action::TableMove(1));
        assert!(result.effects.is_empty());
        assert_eq!(state.selected, 17);
    }

    #[test]
    fn test_move_without_more_pages_only_moves() {
        let mut state = loaded_state(5, false);
        let result = reducer(&mut state, Action::TableMove(10));
        assert_eq!(state.selected, 4);
        assert!(result.effects.is_empty());

        let result = reducer(&mut state, Action::TableMove(1));
        assert!(!result.changed);
    }

    #[test]
    fn test_filter_change_clamps_selection() {
        let mut state = loaded_state(20, false);
        state.selected = 15;

        reducer(
            &mut state,
            Action::ViewFilterChange {
                column: crate::view::FilterColumn::City,
                value: "City 1".into(),
            },
        );

        // "City 1" and "City 10".."City 19"
        assert_eq!(state.row_count(), 11);
        assert_eq!(state.selected, 10);
    }

    #[test]
    fn test_suggestions_for_old_term_are_dropped() {
        let mut state = AppState::default();
        reducer(&mut state, Action::SearchQueryChange("pa".into()));

        let result = reducer(
            &mut state,
            Action::SuggestDidLoad {
                term: "p".into(),
                names: vec!["Paris".into()],
            },
        );
        assert!(!result.changed);

        reducer(
            &mut state,
            Action::SuggestDidLoad {
                term: "pa".into(),
                names: vec!["Paris".into()],
            },
        );
        assert_eq!(state.suggestions, vec!["Paris".to_string()]);
    }

    #[test]
    fn test_accept_ghost_restarts_search() {
        let mut state = AppState::default();
        reducer(&mut state, Action::SearchQueryChange("par".into()));
        state.suggestions = vec!["Paris".into()];

        let result = reducer(&mut state, Action::SearchAcceptGhost);

        assert_eq!(state.search.query, "paris");
        assert!(matches!(result.effects[0], Effect::FetchFirstPage(_)));
    }

    #[test]
    fn test_favorite_toggle_persists() {
        let mut state = AppState::default();
        let result = reducer(&mut state, Action::FavoriteToggle("Oslo".into()));

        assert!(state.prefs.is_favorite("Oslo"));
        assert_eq!(
            result.effects,
            vec![Effect::PersistPreferences(state.prefs.clone())]
        );
    }

    #[test]
    fn test_detail_load_records_history() {
        let mut state = AppState::default();
        reducer(&mut state, Action::DetailOpen("Oslo".into()));
        assert!(state.detail.is_loading());

        let route = state.route.clone();
        let load = Action::DetailDidLoad {
            route,
            weather: CityWeather::default(),
            place: None,
            fetched_at: Utc::now(),
        };
        let result = reducer(&mut state, load.clone());

        assert!(state.detail.is_loaded());
        assert_eq!(state.prefs.history.len(), 1);
        assert_eq!(state.prefs.history[0].city, "Oslo");
        assert_eq!(result.effects.len(), 1);

        // A refresh of the same city does not add a second entry
        let result = reducer(&mut state, load);
        assert_eq!(state.prefs.history.len(), 1);
        assert!(result.effects.is_empty());
    }

    #[test]
    fn test_detail_result_for_other_route_ignored() {
        let mut state = AppState::default();
        reducer(&mut state, Action::DetailOpen("Oslo".into()));

        let result = reducer(
            &mut state,
            Action::DetailDidError {
                route: Route::city("Bergen", Units::Metric),
                error: "boom".into(),
            },
        );

        assert!(!result.changed);
        assert!(state.detail.is_loading());
    }

    #[test]
    fn test_toggle_units_refetches_detail() {
        let mut state = AppState::default();
        reducer(&mut state, Action::DetailOpen("Oslo".into()));

        let result = reducer(&mut state, Action::UiToggleUnits);

        assert_eq!(state.units, Units::Imperial);
        assert_eq!(state.route, Route::city("Oslo", Units::Imperial));
        assert_eq!(
            result.effects,
            vec![Effect::FetchDetail(Route::city("Oslo", Units::Imperial))]
        );
    }

    #[test]
    fn test_location_flow() {
        let mut state = AppState::default();
        let result = reducer(&mut state, Action::LocationRequest);
        assert_eq!(result.effects, vec![Effect::Geolocate]);

        let result = reducer(&mut state, Action::LocationDidResolve { lat: 1.5, lon: 2.5 });
        let expected = Route::Coords {
            position: Some((1.5, 2.5)),
            units: Units::Metric,
        };
        assert_eq!(state.route, expected);
        assert_eq!(result.effects, vec![Effect::FetchDetail(expected)]);
    }

    #[test]
    fn test_location_error_message() {
        let mut state = AppState::default();
        reducer(&mut state, Action::LocationRequest);

        reducer(&mut state, Action::LocationDidError("timed out".into()));

        assert_eq!(state.detail.error(), Some("Failed to get location: timed out"));
    }
}

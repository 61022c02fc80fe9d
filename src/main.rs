//! City weather explorer - tui-dispatch application

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use city_weather::action::Action;
use city_weather::api::ApiClient;
use city_weather::components::{Component, DetailView, DetailViewProps, Explorer, ExplorerProps};
use city_weather::config::{Args, init_tracing};
use city_weather::effect::Effect;
use city_weather::reducer::reducer;
use city_weather::route::Route;
use city_weather::search::{self, SEARCH_DEBOUNCE};
use city_weather::state::AppState;
use city_weather::store::{JsonFileStorage, PreferencesStore};
use city_weather::suggest::SUGGEST_DEBOUNCE;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use parking_lot::Mutex;
use ratatui::{Frame, Terminal, backend::CrosstermBackend, layout::Rect};
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventBus, EventContext, EventKind,
    EventRoutingState, HandlerResponse, Keybindings, RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{DebugRunOutput, DebugSession, DebugSessionError, ReplayItem};

#[derive(tui_dispatch::ComponentId, Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum ExplorerComponentId {
    Explorer,
    Detail,
}

#[derive(tui_dispatch::BindingContext, Clone, Copy, PartialEq, Eq, Hash)]
enum ExplorerContext {
    Explorer,
    Detail,
}

impl EventRoutingState<ExplorerComponentId, ExplorerContext> for AppState {
    fn focused(&self) -> Option<ExplorerComponentId> {
        if self.in_detail() {
            Some(ExplorerComponentId::Detail)
        } else {
            Some(ExplorerComponentId::Explorer)
        }
    }

    fn modal(&self) -> Option<ExplorerComponentId> {
        if self.in_detail() {
            Some(ExplorerComponentId::Detail)
        } else {
            None
        }
    }

    fn binding_context(&self, id: ExplorerComponentId) -> ExplorerContext {
        match id {
            ExplorerComponentId::Explorer => ExplorerContext::Explorer,
            ExplorerComponentId::Detail => ExplorerContext::Detail,
        }
    }

    fn default_context(&self) -> ExplorerContext {
        ExplorerContext::Explorer
    }
}

/// Shared handles used by the effect handler
struct Services {
    api: ApiClient,
    store: Mutex<PreferencesStore>,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let (config, debug_args) = Args::parse()
        .into_runtime()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    init_tracing(&config.log_path(), &config.log_level)?;
    tracing::info!(route = %config.start_route.to_path(), "starting");

    let debug = DebugSession::new(debug_args);

    // Export JSON schemas if requested
    debug.save_state_schema::<AppState>().map_err(debug_error)?;
    debug.save_actions_schema::<Action>().map_err(debug_error)?;

    let mut store = PreferencesStore::hydrate(Box::new(JsonFileStorage::new(config.store_path())));
    store.subscribe(|prefs| {
        tracing::debug!(
            favorites = prefs.favorites.len(),
            history = prefs.history.len(),
            "preferences changed"
        );
    });

    let prefs = store.preferences().clone();
    let start_route = config.start_route.clone();
    let units = config.units;
    let state = debug
        .load_state_or_else_async(move || async move {
            let mut state = AppState::new(start_route, units, prefs);
            if let Ok(size) = crossterm::terminal::size() {
                state.terminal_size = size;
            }
            Ok::<AppState, io::Error>(state)
        })
        .await
        .map_err(debug_error)?;

    let api = ApiClient::new(config.endpoints.clone(), config.api_key.clone())
        .map_err(|e| io::Error::other(format!("http client: {e}")))?;
    tracing::debug!(
        cities = %api.endpoints().cities,
        weather = %api.endpoints().weather,
        "api endpoints"
    );
    if config.api_key.is_empty() {
        tracing::warn!("no API key configured; weather requests will fail");
    }
    let services = Arc::new(Services {
        api,
        store: Mutex::new(store),
    });

    let replay_actions = debug.load_replay_items().map_err(debug_error)?;

    let (middleware, action_recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    // ===== Terminal setup =====
    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(
        &mut terminal,
        &debug,
        store,
        replay_actions,
        Arc::clone(&services),
    )
    .await;

    // ===== Cleanup =====
    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    if let Err(e) = services.store.lock().flush() {
        tracing::error!(error = %e, "failed to flush preferences");
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug
        .save_actions(action_recorder.as_ref())
        .map_err(debug_error)?;

    tracing::info!("exiting");
    Ok(())
}

struct ExplorerUi {
    explorer: Explorer,
    detail: DetailView,
}

impl ExplorerUi {
    fn new() -> Self {
        Self {
            explorer: Explorer::new(),
            detail: DetailView,
        }
    }

    fn render(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        state: &AppState,
        render_ctx: RenderContext,
        event_ctx: &mut EventContext<ExplorerComponentId>,
    ) {
        if state.in_detail() {
            event_ctx
                .component_areas
                .remove(&ExplorerComponentId::Explorer);
            event_ctx.set_component_area(ExplorerComponentId::Detail, area);
            let props = DetailViewProps {
                state,
                is_focused: render_ctx.is_focused(),
            };
            self.detail.render(frame, area, props);
        } else {
            event_ctx
                .component_areas
                .remove(&ExplorerComponentId::Detail);
            event_ctx.set_component_area(ExplorerComponentId::Explorer, area);
            let props = ExplorerProps {
                state,
                is_focused: render_ctx.is_focused(),
            };
            self.explorer.render(frame, area, props);
        }
    }

    fn handle_explorer_event(
        &mut self,
        event: &EventKind,
        state: &AppState,
    ) -> HandlerResponse<Action> {
        let props = ExplorerProps {
            state,
            is_focused: true,
        };
        let actions: Vec<_> = self
            .explorer
            .handle_event(event, props)
            .into_iter()
            .collect();
        respond(actions)
    }

    fn handle_detail_event(
        &mut self,
        event: &EventKind,
        state: &AppState,
    ) -> HandlerResponse<Action> {
        let props = DetailViewProps {
            state,
            is_focused: true,
        };
        let actions: Vec<_> = self.detail.handle_event(event, props).into_iter().collect();
        respond(actions)
    }
}

fn respond(actions: Vec<Action>) -> HandlerResponse<Action> {
    if actions.is_empty() {
        HandlerResponse::ignored()
    } else {
        HandlerResponse {
            actions,
            consumed: true,
            needs_render: false,
        }
    }
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
    services: Arc<Services>,
) -> io::Result<DebugRunOutput<AppState>> {
    let ui = Rc::new(RefCell::new(ExplorerUi::new()));
    let mut bus: EventBus<AppState, Action, ExplorerComponentId, ExplorerContext> =
        EventBus::new();
    let keybindings: Keybindings<ExplorerContext> = Keybindings::new();

    let ui_explorer = Rc::clone(&ui);
    bus.register(ExplorerComponentId::Explorer, move |event, state| {
        ui_explorer
            .borrow_mut()
            .handle_explorer_event(&event.kind, state)
    });

    let ui_detail = Rc::clone(&ui);
    bus.register(ExplorerComponentId::Detail, move |event, state| {
        ui_detail
            .borrow_mut()
            .handle_detail_event(&event.kind, state)
    });

    bus.register_global(|event, _state| match event.kind {
        EventKind::Resize(width, height) => {
            HandlerResponse::action(Action::UiTerminalResize(width, height)).with_render()
        }
        EventKind::Key(key)
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            HandlerResponse::action(Action::Quit)
        }
        _ => HandlerResponse::ignored(),
    });

    debug
        .run_effect_app_with_bus(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |_runtime| {},
            &mut bus,
            &keybindings,
            |frame, area, state, render_ctx, event_ctx| {
                ui.borrow_mut()
                    .render(frame, area, state, render_ctx, event_ctx);
            },
            |action| matches!(action, Action::Quit),
            move |effect, ctx| handle_effect(effect, ctx, Arc::clone(&services)),
        )
        .await
}

/// Handle effects by spawning tasks
fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>, services: Arc<Services>) {
    match effect {
        Effect::FetchFirstPage(request) => {
            ctx.tasks()
                .debounce("city_search", SEARCH_DEBOUNCE, async move {
                    match search::fetch_page(&services.api, &request).await {
                        Ok(result) => Action::SearchPageDidLoad { request, result },
                        Err(e) => Action::SearchPageDidError {
                            request,
                            error: e.to_string(),
                        },
                    }
                });
        }
        Effect::FetchNextPage(request) => {
            ctx.tasks().spawn("city_page", async move {
                match search::fetch_page(&services.api, &request).await {
                    Ok(result) => Action::SearchPageDidLoad { request, result },
                    Err(e) => Action::SearchPageDidError {
                        request,
                        error: e.to_string(),
                    },
                }
            });
        }
        Effect::FetchSuggestions { term } => {
            if term.trim().is_empty() {
                ctx.tasks().cancel(&TaskKey::new("suggest"));
                return;
            }
            ctx.tasks()
                .debounce("suggest", SUGGEST_DEBOUNCE, async move {
                    match services.api.fetch_suggestions(&term).await {
                        Ok(names) => Action::SuggestDidLoad { term, names },
                        Err(e) => {
                            tracing::debug!(error = %e, term = %term, "suggestions failed");
                            Action::SuggestDidError { term }
                        }
                    }
                });
        }
        Effect::FetchDetail(route) => {
            ctx.tasks().spawn("detail", async move {
                let api = &services.api;
                let fetched = match &route {
                    Route::City { name, units } => api
                        .fetch_city_weather(name, *units)
                        .await
                        .map(|weather| (weather, None)),
                    Route::Coords {
                        position: Some((lat, lon)),
                        units,
                    } => {
                        let (weather, place) = tokio::join!(
                            api.fetch_coords_weather(*lat, *lon, *units),
                            api.reverse_geocode(*lat, *lon)
                        );
                        weather.map(|weather| (weather, Some(place)))
                    }
                    Route::Coords { position: None, .. } | Route::Home => {
                        return Action::DetailDidError {
                            route: route.clone(),
                            error: "No location to fetch.".to_string(),
                        };
                    }
                };
                match fetched {
                    Ok((weather, place)) => Action::DetailDidLoad {
                        route,
                        weather,
                        place,
                        fetched_at: Utc::now(),
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, route = %route.to_path(), "detail fetch failed");
                        Action::DetailDidError {
                            route,
                            error: e.to_string(),
                        }
                    }
                }
            });
        }
        Effect::Geolocate => {
            ctx.tasks().spawn("geolocate", async move {
                match services.api.geolocate().await {
                    Ok((lat, lon)) => {
                        tracing::info!(lat, lon, "location resolved");
                        Action::LocationDidResolve { lat, lon }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "geolocation failed");
                        Action::LocationDidError(e.to_string())
                    }
                }
            });
        }
        Effect::PersistPreferences(prefs) => {
            if let Err(e) = services.store.lock().commit(prefs) {
                tracing::error!(error = %e, "failed to persist preferences");
            }
        }
    }
}

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use tui_dispatch::EventKind;
use tui_dispatch_components::{
    StatusBar, StatusBarHint, StatusBarItem, StatusBarProps, StatusBarSection, StatusBarStyle,
};

use super::{
    ACCENT_GOLD, CityTable, CityTableProps, Component, FilterBar, FilterBarProps, SearchBar,
    SearchBarProps, TEXT_DIM, panel_block,
};
use crate::action::Action;
use crate::state::{AppState, City, Focus};
use crate::suggest::ghost_completion;

/// Minimum width at which the favorites/history sidebar is shown
const SIDEBAR_MIN_WIDTH: u16 = 100;
const SIDEBAR_WIDTH: u16 = 30;
const SIDEBAR_HISTORY_ROWS: usize = 8;

/// City explorer screen: search, filters, table and sidebar
pub struct Explorer {
    search: SearchBar,
    filters: FilterBar,
    table: CityTable,
}

pub struct ExplorerProps<'a> {
    pub state: &'a AppState,
    pub is_focused: bool,
}

impl Default for Explorer {
    fn default() -> Self {
        Self {
            search: SearchBar::new(),
            filters: FilterBar::new(),
            table: CityTable,
        }
    }
}

impl Explorer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn table_props<'a>(state: &'a AppState, rows: &'a [City], is_focused: bool) -> CityTableProps<'a> {
    CityTableProps {
        rows,
        selected: state.selected,
        filters: &state.filters,
        prefs: &state.prefs,
        session: &state.search,
        is_focused,
    }
}

fn sidebar_lines(state: &AppState) -> Vec<Line<'static>> {
    let dim = Style::default().fg(TEXT_DIM);
    let heading = Style::default().add_modifier(Modifier::BOLD);

    let mut lines = vec![Line::styled("Favorites", heading)];
    if state.prefs.favorites.is_empty() {
        lines.push(Line::styled("press f on a row", dim));
    }
    for (index, name) in state.prefs.favorites.iter().enumerate() {
        let shortcut = if index < 9 {
            format!("alt+{} ", index + 1)
        } else {
            "      ".to_string()
        };
        lines.push(Line::from(vec![
            Span::styled(shortcut, dim),
            Span::styled("★ ", Style::default().fg(ACCENT_GOLD)),
            Span::raw(name.clone()),
        ]));
    }

    lines.push(Line::default());
    lines.push(Line::styled("Recent", heading));
    if state.prefs.history.is_empty() {
        lines.push(Line::styled("nothing viewed yet", dim));
    }
    for entry in state.prefs.history.iter().take(SIDEBAR_HISTORY_ROWS) {
        lines.push(Line::from(vec![
            Span::styled(entry.timestamp.format("%H:%M ").to_string(), dim),
            Span::raw(entry.city.clone()),
        ]));
    }
    lines
}

impl Component<Action> for Explorer {
    type Props<'a> = ExplorerProps<'a>;

    fn handle_event(
        &mut self,
        event: &EventKind,
        props: Self::Props<'_>,
    ) -> impl IntoIterator<Item = Action> {
        if !props.is_focused {
            return Vec::new();
        }
        let state = props.state;

        if let EventKind::Scroll { .. } = event {
            let rows = state.rows();
            let actions: Vec<_> = self
                .table
                .handle_event(event, table_props(state, &rows, true))
                .into_iter()
                .collect();
            return actions;
        }

        match state.focus {
            Focus::Search => {
                let ghost = ghost_completion(&state.search.query, &state.suggestions);
                let props = SearchBarProps {
                    query: &state.search.query,
                    ghost: ghost.as_deref(),
                    is_focused: true,
                };
                let actions: Vec<_> = self.search.handle_event(event, props).into_iter().collect();
                actions
            }
            focus if FilterBar::owns(focus) => {
                let props = FilterBarProps {
                    filters: &state.filters,
                    focus,
                };
                self.filters.handle_event(event, props).into_iter().collect()
            }
            _ => {
                if let EventKind::Key(key) = event {
                    if !key.modifiers.contains(KeyModifiers::ALT) {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => return vec![Action::Quit],
                            KeyCode::Char('l') => return vec![Action::LocationRequest],
                            KeyCode::Char('u') => return vec![Action::UiToggleUnits],
                            _ => {}
                        }
                    }
                }
                let rows = state.rows();
                let actions: Vec<_> = self
                    .table
                    .handle_event(event, table_props(state, &rows, true))
                    .into_iter()
                    .collect();
                actions
            }
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>) {
        let state = props.state;
        let focus = if props.is_focused {
            Some(state.focus)
        } else {
            None
        };

        let chunks = Layout::vertical([
            Constraint::Length(3), // Search
            Constraint::Length(3), // Filters
            Constraint::Min(4),    // Table + sidebar
            Constraint::Length(1), // Status bar
        ])
        .split(area);

        let ghost = ghost_completion(&state.search.query, &state.suggestions);
        self.search.render(
            frame,
            chunks[0],
            SearchBarProps {
                query: &state.search.query,
                ghost: ghost.as_deref(),
                is_focused: focus == Some(Focus::Search),
            },
        );

        self.filters.render(
            frame,
            chunks[1],
            FilterBarProps {
                filters: &state.filters,
                focus: focus.unwrap_or(Focus::Table),
            },
        );

        let (table_area, sidebar_area) = if chunks[2].width >= SIDEBAR_MIN_WIDTH {
            let body = Layout::horizontal([Constraint::Min(40), Constraint::Length(SIDEBAR_WIDTH)])
                .split(chunks[2]);
            (body[0], Some(body[1]))
        } else {
            (chunks[2], None)
        };

        let rows = state.rows();
        self.table.render(
            frame,
            table_area,
            table_props(state, &rows, focus == Some(Focus::Table)),
        );

        if let Some(sidebar_area) = sidebar_area {
            frame.render_widget(
                Paragraph::new(sidebar_lines(state)).block(panel_block(" Saved ", false)),
                sidebar_area,
            );
        }

        let units = Span::styled(state.units.as_query(), Style::default().fg(TEXT_DIM));
        let status_items = [StatusBarItem::span(units)];
        let mut status_bar = StatusBar::new();
        <StatusBar as Component<Action>>::render(
            &mut status_bar,
            frame,
            chunks[3],
            StatusBarProps {
                left: StatusBarSection::empty(),
                center: StatusBarSection::hints(&[
                    StatusBarHint::new("/", "search"),
                    StatusBarHint::new("tab", "focus"),
                    StatusBarHint::new("1-5", "sort"),
                    StatusBarHint::new("enter", "open"),
                    StatusBarHint::new("f", "favorite"),
                    StatusBarHint::new("l", "locate"),
                    StatusBarHint::new("q", "quit"),
                ]),
                right: StatusBarSection::items(&status_items),
                style: StatusBarStyle::default(),
                is_focused: false,
            },
        );
    }
}

use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use tui_dispatch::{DataResource, EventKind};
use tui_dispatch_components::{
    StatusBar, StatusBarHint, StatusBarProps, StatusBarSection, StatusBarStyle,
};

use super::{ACCENT, ACCENT_GOLD, Component, ERROR_RED, TEXT_DIM, panel_block};
use crate::action::Action;
use crate::api::map_url;
use crate::route::Route;
use crate::state::{AppState, CityWeather, Condition, Units};

/// Current conditions and forecast for the active route
#[derive(Default)]
pub struct DetailView;

pub struct DetailViewProps<'a> {
    pub state: &'a AppState,
    pub is_focused: bool,
}

fn condition_color(condition: Condition) -> Color {
    match condition {
        Condition::Thunderstorm => Color::Rgb(170, 140, 230),
        Condition::Rain => Color::Rgb(110, 160, 230),
        Condition::Snow => Color::Rgb(220, 230, 245),
        Condition::Haze | Condition::Mist => Color::Rgb(170, 170, 160),
        Condition::Clear => ACCENT_GOLD,
        Condition::Cloudy => Color::Rgb(150, 160, 175),
        Condition::Default => ACCENT,
    }
}

/// Title for the view: place name, route city, or a placeholder
fn title(state: &AppState) -> String {
    if let Some(place) = &state.place_name {
        return place.clone();
    }
    match &state.route {
        Route::City { name, .. } => name.clone(),
        Route::Coords {
            position: Some(_), ..
        } => "Current location".to_string(),
        Route::Coords { position: None, .. } => "Locating...".to_string(),
        Route::Home => String::new(),
    }
}

fn favorite_name(state: &AppState) -> Option<String> {
    match &state.route {
        Route::City { name, .. } => Some(name.clone()),
        _ => state.place_name.clone(),
    }
}

fn weather_lines(weather: &CityWeather, units: Units) -> Vec<Line<'static>> {
    let current = &weather.current;
    let condition = current.condition();
    let dim = Style::default().fg(TEXT_DIM);

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                units.format_temp(current.temp),
                Style::default()
                    .fg(condition_color(condition))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                condition.label(),
                Style::default().fg(condition_color(condition)),
            ),
            Span::styled(format!(" · {}", current.description), dim),
        ]),
        Line::from(vec![
            Span::styled("Feels like ", dim),
            Span::raw(units.format_temp(current.feels_like)),
            Span::styled("   Humidity ", dim),
            Span::raw(format!("{:.0}%", current.humidity)),
            Span::styled("   Pressure ", dim),
            Span::raw(format!("{:.0} hPa", current.pressure)),
            Span::styled("   Wind ", dim),
            Span::raw(units.format_wind(current.wind_speed)),
        ]),
        Line::default(),
        Line::styled("Forecast", Style::default().add_modifier(Modifier::BOLD)),
    ];

    if weather.forecast.is_empty() {
        lines.push(Line::styled("No forecast available.", dim));
    }
    for day in &weather.forecast {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<12}", day.date.format("%a %d %b").to_string()), dim),
            Span::raw(format!(
                "{:>9} / {:<9}",
                units.format_temp(day.high),
                units.format_temp(day.low)
            )),
            Span::styled(day.description.clone(), dim),
        ]));
    }

    lines.push(Line::default());
    lines.push(Line::from(vec![
        Span::styled("Map ", dim),
        Span::styled(
            map_url(current.lat, current.lon),
            Style::default().fg(ACCENT).add_modifier(Modifier::UNDERLINED),
        ),
    ]));
    lines
}

impl Component<Action> for DetailView {
    type Props<'a> = DetailViewProps<'a>;

    fn handle_event(
        &mut self,
        event: &EventKind,
        props: Self::Props<'_>,
    ) -> impl IntoIterator<Item = Action> {
        if !props.is_focused {
            return None;
        }

        match event {
            EventKind::Key(key) => match key.code {
                KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => {
                    Some(Action::DetailClose)
                }
                KeyCode::Char('r') | KeyCode::F(5) => Some(Action::DetailRefresh),
                KeyCode::Char('u') => Some(Action::UiToggleUnits),
                KeyCode::Char('f') => favorite_name(props.state).map(Action::FavoriteToggle),
                KeyCode::Char('l') => Some(Action::LocationRequest),
                KeyCode::Char('q') => Some(Action::Quit),
                _ => None,
            },
            _ => None,
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, props: DetailViewProps<'_>) {
        let state = props.state;
        let chunks = Layout::vertical([
            Constraint::Min(1),    // Main content
            Constraint::Length(1), // Help bar
        ])
        .split(area);

        let mut heading = format!(" {} ", title(state));
        if favorite_name(state).is_some_and(|name| state.prefs.is_favorite(&name)) {
            heading.push_str("★ ");
        }
        let block = panel_block(&heading, props.is_focused).title_bottom(Line::styled(
            format!(" {} ", state.route.to_path()),
            Style::default().fg(TEXT_DIM),
        ));

        let lines = match &state.detail {
            DataResource::Loaded(weather) => weather_lines(weather, state.units),
            DataResource::Failed(error) => {
                vec![Line::styled(error.clone(), Style::default().fg(ERROR_RED))]
            }
            DataResource::Loading => {
                vec![Line::styled("Loading weather...", Style::default().fg(TEXT_DIM))]
            }
            DataResource::Empty => Vec::new(),
        };
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
            chunks[0],
        );

        let mut status_bar = StatusBar::new();
        <StatusBar as Component<Action>>::render(
            &mut status_bar,
            frame,
            chunks[1],
            StatusBarProps {
                left: StatusBarSection::empty(),
                center: StatusBarSection::hints(&[
                    StatusBarHint::new("esc", "back"),
                    StatusBarHint::new("r", "refresh"),
                    StatusBarHint::new("u", "units"),
                    StatusBarHint::new("f", "favorite"),
                    StatusBarHint::new("q", "quit"),
                ]),
                right: StatusBarSection::empty(),
                style: StatusBarStyle::default(),
                is_focused: false,
            },
        );
    }
}

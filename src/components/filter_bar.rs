use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
};
use tui_dispatch::EventKind;
use tui_dispatch_components::{TextInput, TextInputProps};

use super::{Component, input_style, panel_block, ui_render};
use crate::action::Action;
use crate::state::Focus;
use crate::view::{FilterColumn, ViewFilterState};

/// Column filters for city, country and timezone
pub struct FilterBar {
    inputs: [TextInput; 3],
}

pub struct FilterBarProps<'a> {
    pub filters: &'a ViewFilterState,
    pub focus: Focus,
}

const COLUMNS: [(FilterColumn, Focus, &str); 3] = [
    (FilterColumn::City, Focus::CityFilter, " City "),
    (FilterColumn::Country, Focus::CountryFilter, " Country "),
    (FilterColumn::Timezone, Focus::TimezoneFilter, " Timezone "),
];

fn city_changed(value: String) -> Action {
    Action::ViewFilterChange {
        column: FilterColumn::City,
        value,
    }
}

fn country_changed(value: String) -> Action {
    Action::ViewFilterChange {
        column: FilterColumn::Country,
        value,
    }
}

fn timezone_changed(value: String) -> Action {
    Action::ViewFilterChange {
        column: FilterColumn::Timezone,
        value,
    }
}

fn on_change_for(column: FilterColumn) -> fn(String) -> Action {
    match column {
        FilterColumn::City => city_changed,
        FilterColumn::Country => country_changed,
        FilterColumn::Timezone => timezone_changed,
    }
}

fn submit_filter(_: String) -> Action {
    Action::FocusSet(Focus::Table)
}

impl Default for FilterBar {
    fn default() -> Self {
        Self {
            inputs: [TextInput::new(), TextInput::new(), TextInput::new()],
        }
    }
}

impl FilterBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owns(focus: Focus) -> bool {
        COLUMNS.iter().any(|(_, f, _)| *f == focus)
    }
}

impl Component<Action> for FilterBar {
    type Props<'a> = FilterBarProps<'a>;

    fn handle_event(
        &mut self,
        event: &EventKind,
        props: Self::Props<'_>,
    ) -> impl IntoIterator<Item = Action> {
        let Some(index) = COLUMNS.iter().position(|(_, f, _)| *f == props.focus) else {
            return Vec::new();
        };
        let EventKind::Key(key) = event else {
            return Vec::new();
        };

        match key.code {
            KeyCode::Tab => return vec![Action::FocusNext],
            KeyCode::BackTab => return vec![Action::FocusPrev],
            KeyCode::Down | KeyCode::Esc => return vec![Action::FocusSet(Focus::Table)],
            _ => {}
        }

        let (column, _, _) = COLUMNS[index];
        let input_props = TextInputProps {
            value: props.filters.filter(column),
            placeholder: "filter",
            is_focused: true,
            style: input_style(),
            on_change: on_change_for(column),
            on_submit: submit_filter,
            on_cursor_move: Some(ui_render),
        };
        self.inputs[index]
            .handle_event(event, input_props)
            .into_iter()
            .collect()
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>) {
        let chunks = Layout::horizontal([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

        for (index, (column, focus, title)) in COLUMNS.iter().enumerate() {
            let is_focused = props.focus == *focus;
            let block = panel_block(title, is_focused);
            let inner = block.inner(chunks[index]);
            frame.render_widget(block, chunks[index]);

            let input_props = TextInputProps {
                value: props.filters.filter(*column),
                placeholder: "filter",
                is_focused,
                style: input_style(),
                on_change: on_change_for(*column),
                on_submit: submit_filter,
                on_cursor_move: Some(ui_render),
            };
            self.inputs[index].render(frame, inner, input_props);
        }
    }
}

use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
};
use tui_dispatch::EventKind;
use tui_dispatch_components::{TextInput, TextInputProps};

use super::{Component, TEXT_DIM, input_style, panel_block, ui_render};
use crate::action::Action;
use crate::state::Focus;

/// Search text input with inline ghost completion
pub struct SearchBar {
    input: TextInput,
}

pub struct SearchBarProps<'a> {
    pub query: &'a str,
    /// Completion offered for `query`, accepted with Enter/Tab
    pub ghost: Option<&'a str>,
    pub is_focused: bool,
}

impl Default for SearchBar {
    fn default() -> Self {
        Self {
            input: TextInput::new(),
        }
    }
}

impl SearchBar {
    pub fn new() -> Self {
        Self::default()
    }
}

fn submit_search(_: String) -> Action {
    Action::FocusSet(Focus::Table)
}

impl Component<Action> for SearchBar {
    type Props<'a> = SearchBarProps<'a>;

    fn handle_event(
        &mut self,
        event: &EventKind,
        props: Self::Props<'_>,
    ) -> impl IntoIterator<Item = Action> {
        if !props.is_focused {
            return Vec::new();
        }
        let EventKind::Key(key) = event else {
            return Vec::new();
        };

        match key.code {
            KeyCode::Enter | KeyCode::Tab if props.ghost.is_some() => {
                return vec![Action::SearchAcceptGhost];
            }
            KeyCode::Tab => return vec![Action::FocusNext],
            KeyCode::BackTab => return vec![Action::FocusPrev],
            KeyCode::Down | KeyCode::Esc => return vec![Action::FocusSet(Focus::Table)],
            _ => {}
        }

        let input_props = TextInputProps {
            value: props.query,
            placeholder: "Search cities...",
            is_focused: true,
            style: input_style(),
            on_change: Action::SearchQueryChange,
            on_submit: submit_search,
            on_cursor_move: Some(ui_render),
        };
        self.input
            .handle_event(event, input_props)
            .into_iter()
            .collect()
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>) {
        let mut block = panel_block(" Search ", props.is_focused);
        if let Some(ghost) = props.ghost {
            let hint = Line::from(vec![
                Span::styled("tab ", Style::default().fg(TEXT_DIM)),
                Span::styled(
                    ghost.to_string(),
                    Style::default().fg(TEXT_DIM).add_modifier(Modifier::ITALIC),
                ),
                Span::raw(" "),
            ])
            .right_aligned();
            block = block.title(hint);
        }
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let input_props = TextInputProps {
            value: props.query,
            placeholder: "Search cities...",
            is_focused: props.is_focused,
            style: input_style(),
            on_change: Action::SearchQueryChange,
            on_submit: submit_search,
            on_cursor_move: Some(ui_render),
        };
        self.input.render(frame, inner, input_props);
    }
}

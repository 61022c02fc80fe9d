pub mod city_table;
pub mod detail_view;
pub mod explorer;
pub mod filter_bar;
pub mod search_bar;

// Re-export core Component trait
pub use tui_dispatch::Component;

pub use city_table::{CityTable, CityTableProps};
pub use detail_view::{DetailView, DetailViewProps};
pub use explorer::{Explorer, ExplorerProps};
pub use filter_bar::{FilterBar, FilterBarProps};
pub use search_bar::{SearchBar, SearchBarProps};

use ratatui::{
    style::{Color, Style},
    widgets::{Block, BorderType, Borders},
};
use tui_dispatch_components::{BaseStyle, Padding, TextInputStyle};

use crate::action::Action;

pub const TEXT_DIM: Color = Color::Rgb(140, 140, 150);
pub const ACCENT: Color = Color::Rgb(126, 200, 180);
pub const ACCENT_GOLD: Color = Color::Rgb(222, 196, 120);
pub const ERROR_RED: Color = Color::Rgb(204, 90, 90);

/// Bordered panel whose border lights up when focused
pub fn panel_block<'a>(title: &'a str, is_focused: bool) -> Block<'a> {
    let border = if is_focused { ACCENT } else { TEXT_DIM };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
}

pub fn input_style() -> TextInputStyle {
    TextInputStyle {
        base: BaseStyle {
            border: None,
            padding: Padding::xy(1, 0),
            bg: None,
            fg: None,
        },
        placeholder_style: Some(Style::default().fg(TEXT_DIM)),
        cursor_style: None,
    }
}

pub(crate) fn ui_render(_: usize) -> Action {
    Action::Render
}

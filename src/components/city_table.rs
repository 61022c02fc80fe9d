use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Cell, Row, Table, TableState},
};
use tui_dispatch::EventKind;

use super::{ACCENT, ACCENT_GOLD, Component, ERROR_RED, TEXT_DIM, panel_block};
use crate::action::Action;
use crate::prefs::Preferences;
use crate::scroll::ScrollMetrics;
use crate::search::SearchSession;
use crate::state::{City, Focus};
use crate::view::{SortColumn, ViewFilterState};

/// Scrollable, sortable table of accumulated cities
#[derive(Default)]
pub struct CityTable;

pub struct CityTableProps<'a> {
    pub rows: &'a [City],
    pub selected: usize,
    pub filters: &'a ViewFilterState,
    pub prefs: &'a Preferences,
    pub session: &'a SearchSession,
    pub is_focused: bool,
}

fn format_temp(value: Option<f64>) -> String {
    value.map_or_else(|| "—".to_string(), |v| format!("{v:.1}°C"))
}

fn header_cell(column: SortColumn, filters: &ViewFilterState) -> Cell<'static> {
    let index = SortColumn::ALL
        .iter()
        .position(|c| *c == column)
        .map_or(0, |i| i + 1);
    let arrow = if filters.sort_column == Some(column) {
        filters.sort_order.arrow()
    } else {
        ""
    };
    Cell::from(format!("{}{} [{}]", column.title(), arrow, index))
}

/// Footer text under the table
fn footer(props: &CityTableProps<'_>) -> Line<'static> {
    let session = props.session;
    if let Some(error) = &session.error {
        return Line::styled(format!(" {error} "), Style::default().fg(ERROR_RED));
    }
    if session.loading {
        let text = if session.page > 1 {
            " Loading more... "
        } else {
            " Loading... "
        };
        return Line::styled(text, Style::default().fg(ACCENT));
    }
    if !session.has_more && !props.rows.is_empty() {
        return Line::styled(" End of list. ", Style::default().fg(TEXT_DIM));
    }
    match session.total {
        Some(total) => Line::styled(
            format!(" {} shown of {} ", props.rows.len(), total),
            Style::default().fg(TEXT_DIM),
        ),
        None => Line::default(),
    }
}

impl Component<Action> for CityTable {
    type Props<'a> = CityTableProps<'a>;

    fn handle_event(
        &mut self,
        event: &EventKind,
        props: Self::Props<'_>,
    ) -> impl IntoIterator<Item = Action> {
        if !props.is_focused {
            return None;
        }

        match event {
            EventKind::Key(key) => {
                if key.modifiers.contains(KeyModifiers::ALT) {
                    return match key.code {
                        KeyCode::Char(c @ '1'..='9') => {
                            Some(Action::FavoriteOpen(c as usize - '1' as usize))
                        }
                        _ => None,
                    };
                }
                let selected = || props.rows.get(props.selected).map(|c| c.name.clone());
                match key.code {
                    KeyCode::Down | KeyCode::Char('j') => Some(Action::TableMove(1)),
                    KeyCode::Up | KeyCode::Char('k') => Some(Action::TableMove(-1)),
                    KeyCode::PageDown => Some(Action::TablePage(1)),
                    KeyCode::PageUp => Some(Action::TablePage(-1)),
                    KeyCode::Home | KeyCode::Char('g') => Some(Action::TableMove(i16::MIN)),
                    KeyCode::End | KeyCode::Char('G') => Some(Action::TableMove(i16::MAX)),
                    KeyCode::Enter => selected().map(Action::DetailOpen),
                    KeyCode::Char('f') => selected().map(Action::FavoriteToggle),
                    KeyCode::Char(c @ '1'..='5') => {
                        let index = c as usize - '1' as usize;
                        Some(Action::ViewSortBy(SortColumn::ALL[index]))
                    }
                    KeyCode::Char('/') => Some(Action::FocusSet(Focus::Search)),
                    KeyCode::Tab => Some(Action::FocusNext),
                    KeyCode::BackTab => Some(Action::FocusPrev),
                    _ => None,
                }
            }
            EventKind::Scroll { delta, .. } => Some(Action::TableMove((*delta * 3) as i16)),
            _ => None,
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>) {
        let header = Row::new(vec![
            Cell::from(" "),
            header_cell(SortColumn::Name, props.filters),
            header_cell(SortColumn::Country, props.filters),
            header_cell(SortColumn::Timezone, props.filters),
            header_cell(SortColumn::HighTemp, props.filters),
            header_cell(SortColumn::LowTemp, props.filters),
        ])
        .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = props.rows.iter().map(|city| {
            let star = if props.prefs.is_favorite(&city.name) {
                Cell::from("★").style(Style::default().fg(ACCENT_GOLD))
            } else {
                Cell::from(" ")
            };
            Row::new(vec![
                star,
                Cell::from(city.name.clone()),
                Cell::from(city.country.clone()),
                Cell::from(city.timezone.clone()),
                Cell::from(format_temp(city.high_temp)),
                Cell::from(format_temp(city.low_temp)),
            ])
        });

        let widths = [
            Constraint::Length(2),
            Constraint::Fill(3),
            Constraint::Fill(2),
            Constraint::Fill(2),
            Constraint::Length(10),
            Constraint::Length(10),
        ];

        let block = panel_block(" Cities ", props.is_focused).title_bottom(footer(&props));
        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(
                Style::default()
                    .bg(Color::Rgb(45, 55, 70))
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");

        // Header row and borders take three lines
        let viewport = area.height.saturating_sub(3) as usize;
        let metrics = ScrollMetrics::for_selection(props.selected, viewport, props.rows.len());
        let selected = (!props.rows.is_empty()).then_some(props.selected);
        let mut table_state = TableState::default()
            .with_offset(metrics.scroll_top)
            .with_selected(selected);
        frame.render_stateful_widget(table, area, &mut table_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tui_dispatch::testing::*;

    fn sample_rows() -> Vec<City> {
        vec![
            City::new("Nairobi", "Kenya", "Africa/Nairobi").with_temps(24.0, 13.5),
            City::new("Mombasa", "Kenya", "Africa/Nairobi"),
        ]
    }

    fn handle(code: &str, rows: &[City]) -> Vec<Action> {
        let filters = ViewFilterState::default();
        let prefs = Preferences::default();
        let session = SearchSession::default();
        let props = CityTableProps {
            rows,
            selected: 0,
            filters: &filters,
            prefs: &prefs,
            session: &session,
            is_focused: true,
        };
        CityTable
            .handle_event(&EventKind::Key(key(code)), props)
            .into_iter()
            .collect()
    }

    #[test]
    fn test_navigation_keys() {
        let rows = sample_rows();
        handle("j", &rows).assert_first(Action::TableMove(1));
        handle("k", &rows).assert_first(Action::TableMove(-1));
        handle("3", &rows).assert_first(Action::ViewSortBy(SortColumn::Timezone));
    }

    #[test]
    fn test_row_actions_use_selected_city() {
        let rows = sample_rows();
        handle("f", &rows).assert_first(Action::FavoriteToggle("Nairobi".into()));
        handle("f", &[]).assert_empty();
    }

    #[test]
    fn test_render_rows_and_missing_temps() {
        let rows = sample_rows();
        let filters = ViewFilterState::default();
        let mut prefs = Preferences::default();
        prefs.toggle_favorite("Nairobi");
        let session = SearchSession {
            has_more: false,
            ..Default::default()
        };

        let mut render = RenderHarness::new(90, 8);
        let output = render.render_to_string_plain(|frame| {
            let props = CityTableProps {
                rows: &rows,
                selected: 0,
                filters: &filters,
                prefs: &prefs,
                session: &session,
                is_focused: true,
            };
            CityTable.render(frame, frame.area(), props);
        });

        assert!(output.contains("Nairobi"));
        assert!(output.contains("24.0°C"));
        assert!(output.contains("★"));
        assert!(output.contains("—"));
        assert!(output.contains("End of list."));
    }
}

//! Infinite-scroll trigger

use crate::search::SearchSession;

/// Rows from the end of the content at which the next page is requested
pub const NEAR_BOTTOM_ROWS: usize = 3;

/// Scroll position of the city table, in rows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub scroll_top: usize,
    pub viewport: usize,
    pub content: usize,
}

impl ScrollMetrics {
    /// The table keeps the selection on its last visible row when scrolling down.
    pub fn for_selection(selected: usize, viewport: usize, content: usize) -> Self {
        Self {
            scroll_top: (selected + 1).saturating_sub(viewport),
            viewport,
            content,
        }
    }

    pub fn near_bottom(&self) -> bool {
        self.scroll_top + self.viewport + NEAR_BOTTOM_ROWS >= self.content
    }
}

pub fn should_request_next_page(metrics: &ScrollMetrics, session: &SearchSession) -> bool {
    metrics.near_bottom() && session.can_advance()
}

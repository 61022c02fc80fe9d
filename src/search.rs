//! Paginated search driver
//!
//! `SearchSession` holds the per-query pagination state and is replaced
//! wholesale whenever the query changes. `fetch_page` performs one page
//! request and enriches every city of the batch concurrently.

use std::collections::HashSet;
use std::time::Duration;

use futures_util::future::join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::accumulator::accumulate;
use crate::api::{ApiClient, ApiError};
use crate::state::City;

/// Delay between the last query keystroke and the page-1 request
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);
pub const QUERY_PAGE_SIZE: usize = 20;
/// Browsing (empty query) pulls larger pages sorted by population
pub const BROWSE_PAGE_SIZE: usize = 50;

pub fn page_size(query: &str) -> usize {
    if query.trim().is_empty() {
        BROWSE_PAGE_SIZE
    } else {
        QUERY_PAGE_SIZE
    }
}

pub fn offset(page: usize, size: usize) -> usize {
    page.saturating_sub(1) * size
}

pub fn has_more(total: u64, offset: usize, size: usize) -> bool {
    total > (offset + size) as u64
}

/// One page request, tagged with the session generation it was issued for
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PageRequest {
    pub query: String,
    pub page: usize,
    pub generation: u64,
}

impl PageRequest {
    pub fn size(&self) -> usize {
        page_size(&self.query)
    }

    pub fn offset(&self) -> usize {
        offset(self.page, self.size())
    }

    pub fn is_browse(&self) -> bool {
        self.query.trim().is_empty()
    }
}

/// Enriched cities of one page
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageResult {
    pub cities: Vec<City>,
    pub has_more: bool,
    /// Total hits reported by the directory
    pub total: u64,
}

/// Pagination state for the active query
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchSession {
    pub query: String,
    pub page: usize,
    pub has_more: bool,
    pub loading: bool,
    pub generation: u64,
    /// Identity keys of every accumulated city for this query
    pub seen_keys: HashSet<String>,
    pub total: Option<u64>,
    pub error: Option<String>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self {
            query: String::new(),
            page: 1,
            has_more: true,
            loading: false,
            generation: 0,
            seen_keys: HashSet::new(),
            total: None,
            error: None,
        }
    }
}

impl SearchSession {
    /// Start a new session for `query` and return its page-1 request.
    ///
    /// The caller clears the accumulated rows; `seen_keys` is reset here.
    pub fn restart(&mut self, query: String) -> PageRequest {
        *self = Self {
            query,
            loading: true,
            generation: self.generation + 1,
            ..Self::default()
        };
        self.request()
    }

    fn request(&self) -> PageRequest {
        PageRequest {
            query: self.query.clone(),
            page: self.page,
            generation: self.generation,
        }
    }

    pub fn can_advance(&self) -> bool {
        !self.loading && self.has_more
    }

    /// Move to the next page if the previous one has committed.
    pub fn advance(&mut self) -> Option<PageRequest> {
        if !self.can_advance() {
            return None;
        }
        self.page += 1;
        self.loading = true;
        self.error = None;
        Some(self.request())
    }

    /// Whether a response for `request` still belongs to this session
    pub fn is_current(&self, request: &PageRequest) -> bool {
        request.generation == self.generation && request.page == self.page
    }

    /// Merge a page into `cities`. Returns the number of rows appended.
    pub fn commit(
        &mut self,
        cities: &mut Vec<City>,
        request: &PageRequest,
        result: PageResult,
    ) -> usize {
        if request.page == 1 {
            cities.clear();
            self.seen_keys.clear();
        }
        let merged = accumulate(&self.seen_keys, result.cities);
        let added = merged.new_cities.len();
        cities.extend(merged.new_cities);
        self.seen_keys = merged.updated_keys;
        self.has_more = result.has_more;
        self.total = Some(result.total);
        self.loading = false;
        self.error = None;
        added
    }

    /// Record a failed page. A failed advance rolls back so the next
    /// scroll retries it; a failed first page ends the session.
    pub fn fail(&mut self, error: String) {
        self.loading = false;
        if self.page > 1 {
            self.page -= 1;
        } else {
            self.has_more = false;
        }
        self.error = Some(error);
    }
}

/// Fetch one page and enrich its cities with current temperatures.
pub async fn fetch_page(api: &ApiClient, request: &PageRequest) -> Result<PageResult, ApiError> {
    let size = request.size();
    let start = request.offset();
    let page = api.search_cities(&request.query, size, start).await?;

    let enrichments = join_all(page.cities.iter().map(|city| api.enrich(&city.name))).await;
    let cities = page
        .cities
        .into_iter()
        .zip(enrichments)
        .map(|(city, enrichment)| match enrichment {
            Some(e) => city.with_temps(e.high, e.low),
            None => city,
        })
        .collect();

    tracing::debug!(
        query = %request.query,
        page = request.page,
        total = page.total,
        "city page loaded"
    );

    Ok(PageResult {
        cities,
        has_more: has_more(page.total, start, size),
        total: page.total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page_of(names: &[&str], has_more: bool) -> PageResult {
        PageResult {
            cities: names
                .iter()
                .map(|name| City::new(*name, "Country", "UTC"))
                .collect(),
            has_more,
            total: 100,
        }
    }

    #[test]
    fn test_page_size_depends_on_trimmed_query() {
        assert_eq!(page_size(""), BROWSE_PAGE_SIZE);
        assert_eq!(page_size("   "), BROWSE_PAGE_SIZE);
        assert_eq!(page_size("par"), QUERY_PAGE_SIZE);
    }

    #[test]
    fn test_offset_and_has_more() {
        assert_eq!(offset(1, 20), 0);
        assert_eq!(offset(3, 20), 40);
        assert!(has_more(41, 20, 20));
        assert!(!has_more(40, 20, 20));
        assert!(!has_more(5, 0, 20));
    }

    #[test]
    fn test_restart_replaces_session() {
        let mut session = SearchSession {
            query: "old".into(),
            page: 4,
            has_more: false,
            generation: 7,
            seen_keys: ["a|b|c".to_string()].into(),
            ..Default::default()
        };

        let request = session.restart("new".into());

        assert_eq!(
            request,
            PageRequest {
                query: "new".into(),
                page: 1,
                generation: 8,
            }
        );
        assert_eq!(session.page, 1);
        assert!(session.has_more);
        assert!(session.loading);
        assert!(session.seen_keys.is_empty());
    }

    #[test]
    fn test_advance_gated_on_loading_and_has_more() {
        let mut session = SearchSession::default();
        session.restart("x".into());
        assert_eq!(session.advance(), None);

        let mut cities = Vec::new();
        let first = PageRequest {
            query: "x".into(),
            page: 1,
            generation: 1,
        };
        session.commit(&mut cities, &first, page_of(&["A", "B"], true));

        let next = session.advance().expect("page 2 request");
        assert_eq!(next.page, 2);
        assert!(session.loading);
        assert_eq!(session.advance(), None);

        session.commit(&mut cities, &next, page_of(&["C"], false));
        assert!(!session.has_more);
        assert_eq!(session.advance(), None);
        assert_eq!(cities.len(), 3);
    }

    #[test]
    fn test_commit_appends_only_unseen_cities() {
        let mut session = SearchSession::default();
        let first = session.restart("s".into());
        let mut cities = Vec::new();

        assert_eq!(session.commit(&mut cities, &first, page_of(&["A", "B"], true)), 2);
        let second = session.advance().expect("page 2 request");
        assert_eq!(session.commit(&mut cities, &second, page_of(&["B", "C"], true)), 1);

        let names: Vec<_> = cities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(session.seen_keys.len(), 3);
    }

    #[test]
    fn test_stale_generation_is_not_current() {
        let mut session = SearchSession::default();
        let stale = session.restart("a".into());
        let fresh = session.restart("ab".into());

        assert!(!session.is_current(&stale));
        assert!(session.is_current(&fresh));
    }

    #[test]
    fn test_fail_rolls_back_advance() {
        let mut session = SearchSession::default();
        let first = session.restart("q".into());
        let mut cities = Vec::new();
        session.commit(&mut cities, &first, page_of(&["A"], true));
        session.advance();

        session.fail("boom".into());

        assert_eq!(session.page, 1);
        assert!(!session.loading);
        assert!(session.has_more);
        assert_eq!(session.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_fail_on_first_page_ends_session() {
        let mut session = SearchSession::default();
        session.restart("q".into());

        session.fail("offline".into());

        assert!(!session.has_more);
        assert!(!session.can_advance());
    }
}

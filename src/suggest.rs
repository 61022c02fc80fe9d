//! Suggestion engine: top distinct city names and inline ghost completion

use std::collections::HashSet;
use std::time::Duration;

pub const SUGGESTION_LIMIT: usize = 5;
/// Independent of the search debounce
pub const SUGGEST_DEBOUNCE: Duration = Duration::from_millis(300);

/// Exact (case-sensitive) dedup in first-seen order, then truncate.
pub fn distinct_names<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .take(SUGGESTION_LIMIT)
        .collect()
}

/// Typed text extended with the remainder of the first suggestion.
///
/// Only offered when the suggestion starts with the search text
/// (case-insensitively) and actually adds characters.
pub fn ghost_completion(search: &str, suggestions: &[String]) -> Option<String> {
    if search.is_empty() {
        return None;
    }
    let first = suggestions.first()?;
    if !first.to_lowercase().starts_with(&search.to_lowercase()) {
        return None;
    }

    let rest: String = first.chars().skip(search.chars().count()).collect();
    if rest.is_empty() {
        return None;
    }
    Some(format!("{search}{rest}"))
}

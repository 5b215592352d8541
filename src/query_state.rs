//! Query state controller: the single source of truth for what to fetch.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::ControllerConfig;
use crate::debounce::Debounced;
use crate::filter::{FilterState, FilterValue};
use crate::key::RequestKey;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort column and direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// How a state change wants the list to be refetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refetch {
    /// The request key did not change.
    None,
    /// A discrete change (filter, page, sort, reset): fetch right away.
    Immediate,
    /// A search keystroke: fetch once the debounce window elapses.
    Debounced(Instant),
}

impl Refetch {
    pub fn is_none(&self) -> bool {
        matches!(self, Refetch::None)
    }
}

/// Owns filters, search text, sort and current page for one list.
///
/// Every mutator reports a [`Refetch`] so the caller can schedule the fetch;
/// nothing here performs I/O.
#[derive(Debug, Clone)]
pub struct QueryState {
    initial_filters: FilterState,
    initial_sort: Option<Sort>,
    filters: FilterState,
    search_raw: String,
    search: Debounced<String>,
    sort: Option<Sort>,
    page: u32,
    search_param: String,
    sort_param: String,
    order_param: String,
}

impl QueryState {
    /// New state with the given initial filters and default parameter names.
    pub fn new(initial_filters: FilterState, debounce: Duration) -> Self {
        let config = ControllerConfig {
            debounce_ms: u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX),
            ..ControllerConfig::default()
        };
        Self::with_config(initial_filters, &config)
    }

    pub fn with_config(initial_filters: FilterState, config: &ControllerConfig) -> Self {
        Self {
            filters: initial_filters.clone(),
            initial_filters,
            initial_sort: None,
            search_raw: String::new(),
            search: Debounced::new(String::new(), config.debounce()),
            sort: None,
            page: 1,
            search_param: config.search_param.clone(),
            sort_param: config.sort_param.clone(),
            order_param: config.order_param.clone(),
        }
    }

    /// Initial sort, restored by [`reset`](Self::reset).
    pub fn with_initial_sort(mut self, sort: Sort) -> Self {
        self.initial_sort = Some(sort.clone());
        self.sort = Some(sort);
        self
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// The search text as typed, for display.
    pub fn search_term(&self) -> &str {
        &self.search_raw
    }

    /// The search text used for fetching.
    pub fn debounced_search(&self) -> &str {
        self.search.value()
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Quiet period applied to search input.
    pub fn search_delay(&self) -> Duration {
        self.search.delay()
    }

    /// When a pending search term will settle.
    pub fn search_deadline(&self) -> Option<Instant> {
        self.search.deadline()
    }

    /// Update one filter. Always resets the page to 1.
    pub fn set_filter(&mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Refetch {
        self.change(|state| {
            state.filters.set(name, value);
            state.page = 1;
        })
    }

    /// Update the raw search input; the fetched term lags by the debounce window.
    pub fn set_search_term(&mut self, raw: impl Into<String>, now: Instant) -> Refetch {
        let raw = raw.into();
        self.search_raw = raw.clone();
        let deadline = self.search.set(raw, now);
        if self.search.is_pending() {
            Refetch::Debounced(deadline)
        } else {
            Refetch::None
        }
    }

    /// Propagate a pending search term whose window elapsed by `now`.
    ///
    /// A newly settled term resets the page to 1.
    pub fn poll_search(&mut self, now: Instant) -> Refetch {
        let before = self.search.value().trim().to_string();
        if self.search.poll(now).is_none() {
            return Refetch::None;
        }
        // Whitespace-only edits settle without changing what is sent.
        if self.search.value().trim() == before {
            return Refetch::None;
        }
        self.change(|state| state.page = 1)
    }

    /// Change the sort. Resets the page to 1.
    pub fn set_sort(&mut self, sort: Option<Sort>) -> Refetch {
        self.change(|state| {
            state.sort = sort;
            state.page = 1;
        })
    }

    /// Toggle direction when sorting by the same field again, otherwise sort ascending.
    pub fn toggle_sort(&mut self, field: &str) -> Refetch {
        let next = match &self.sort {
            Some(sort) if sort.field == field => Sort::new(field, sort.direction.reversed()),
            _ => Sort::new(field, SortDirection::Asc),
        };
        self.set_sort(Some(next))
    }

    /// Set the current page.
    ///
    /// The range is not checked; a [`Cursor`](crate::Cursor) should have
    /// disabled out-of-range navigation.
    pub fn set_page(&mut self, page: u32) -> Refetch {
        self.change(|state| state.page = page)
    }

    /// Restore the initial filters and sort, clear the search and go to page 1.
    pub fn reset(&mut self) -> Refetch {
        self.change(|state| {
            state.filters = state.initial_filters.clone();
            state.sort = state.initial_sort.clone();
            state.search_raw.clear();
            state.search.force(String::new());
            state.page = 1;
        })
    }

    /// Pruned filters, debounced search and sort, without the page.
    ///
    /// A filter named like the search or sort parameter is sent as is until a
    /// search term or sort is active, which then takes its place.
    pub fn filter_params(&self) -> std::collections::BTreeMap<String, String> {
        let mut params = self.filters.to_params();
        let search = self.search.value().trim();
        if !search.is_empty() {
            params.insert(self.search_param.clone(), search.to_string());
        }
        if let Some(sort) = &self.sort {
            params.insert(self.sort_param.clone(), sort.field.clone());
            params.insert(self.order_param.clone(), sort.direction.as_str().to_string());
        }
        params
    }

    /// The key for the current state.
    pub fn request_key(&self) -> RequestKey {
        RequestKey::new(self.filter_params(), self.page)
    }

    fn change(&mut self, apply: impl FnOnce(&mut Self)) -> Refetch {
        let before = self.request_key();
        apply(self);
        if self.request_key() == before {
            Refetch::None
        } else {
            Refetch::Immediate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    fn state() -> QueryState {
        QueryState::new(
            FilterState::new().with("status", "all").with("role", "all"),
            WINDOW,
        )
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut state = state();
        state.set_page(4);
        assert_eq!(state.page(), 4);

        assert_eq!(state.set_filter("status", "active"), Refetch::Immediate);
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_noop_filter_change_on_first_page_does_not_refetch() {
        let mut state = state();
        assert_eq!(state.set_filter("status", "all"), Refetch::None);
        // "all" and "" prune to the same key.
        assert_eq!(state.set_filter("status", ""), Refetch::None);
    }

    #[test]
    fn test_empty_filters_pruned_from_key() {
        let mut state = state();
        state.set_filter("search", "");
        state.set_filter("role", "admin");
        state.set_page(2);

        let key = state.request_key();
        assert_eq!(key.params().len(), 1);
        assert_eq!(key.param("role"), Some("admin"));
        assert_eq!(key.page(), 2);
    }

    #[test]
    fn test_search_is_debounced_and_resets_page() {
        let start = Instant::now();
        let mut state = state();
        state.set_page(3);

        let refetch = state.set_search_term("abc", start);
        assert_eq!(refetch, Refetch::Debounced(start + WINDOW));
        assert_eq!(state.search_term(), "abc");
        assert_eq!(state.debounced_search(), "");
        assert_eq!(state.request_key().param("search"), None);

        assert_eq!(state.poll_search(start + WINDOW), Refetch::Immediate);
        assert_eq!(state.request_key().param("search"), Some("abc"));
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_whitespace_search_is_pruned() {
        let start = Instant::now();
        let mut state = state();
        state.set_search_term("   ", start);
        assert_eq!(state.poll_search(start + WINDOW), Refetch::None);
        assert_eq!(state.request_key().param("search"), None);
    }

    #[test]
    fn test_whitespace_search_keeps_page() {
        let start = Instant::now();
        let mut state = state();
        state.set_page(3);

        state.set_search_term("   ", start);
        assert_eq!(state.poll_search(start + WINDOW), Refetch::None);
        assert_eq!(state.page(), 3);
        assert_eq!(state.request_key().to_string(), "page=3");

        // Padding around an already settled term is not a change either.
        state.set_search_term("abc", start + WINDOW);
        state.poll_search(start + WINDOW * 2);
        state.set_page(2);
        state.set_search_term(" abc ", start + WINDOW * 2);
        assert_eq!(state.poll_search(start + WINDOW * 3), Refetch::None);
        assert_eq!(state.page(), 2);
    }

    #[test]
    fn test_filter_named_search_is_sent_until_a_term_settles() {
        let start = Instant::now();
        let mut state = QueryState::new(FilterState::new().with("role", "admin"), WINDOW);

        assert_eq!(state.set_filter("search", "bob"), Refetch::Immediate);
        assert_eq!(state.request_key().param("search"), Some("bob"));

        state.set_search_term("ann", start);
        assert_eq!(state.poll_search(start + WINDOW), Refetch::Immediate);
        assert_eq!(state.request_key().param("search"), Some("ann"));

        state.set_search_term("", start + WINDOW);
        state.poll_search(start + WINDOW * 2);
        assert_eq!(state.request_key().param("search"), Some("bob"));
    }

    #[test]
    fn test_filter_named_sort_by_is_sent_without_active_sort() {
        let mut state = QueryState::new(FilterState::new().with("sort_by", "created_at"), WINDOW);
        assert_eq!(state.request_key().param("sort_by"), Some("created_at"));

        state.set_sort(Some(Sort::new("name", SortDirection::Asc)));
        assert_eq!(state.request_key().param("sort_by"), Some("name"));

        state.set_sort(None);
        assert_eq!(state.request_key().param("sort_by"), Some("created_at"));
        assert_eq!(state.request_key().param("sort_order"), None);
    }

    #[test]
    fn test_oversized_debounce_saturates() {
        let state = QueryState::new(FilterState::new(), Duration::MAX);
        assert_eq!(state.search_delay(), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_sort_renders_params_and_toggles() {
        let mut state = state();
        state.set_page(2);
        assert_eq!(state.toggle_sort("name"), Refetch::Immediate);
        assert_eq!(state.page(), 1);
        let key = state.request_key();
        assert_eq!(key.param("sort_by"), Some("name"));
        assert_eq!(key.param("sort_order"), Some("asc"));

        state.toggle_sort("name");
        assert_eq!(state.request_key().param("sort_order"), Some("desc"));
    }

    #[test]
    fn test_reset_restores_initial_snapshot() {
        let start = Instant::now();
        let mut state = state().with_initial_sort(Sort::new("created_at", SortDirection::Desc));
        let initial = state.request_key();

        state.set_filter("role", "trainer");
        state.set_search_term("bob", start);
        state.poll_search(start + WINDOW);
        state.toggle_sort("name");
        state.set_page(5);

        assert_eq!(state.reset(), Refetch::Immediate);
        assert_eq!(state.request_key(), initial);
        assert_eq!(state.search_term(), "");
        assert!(state.search_deadline().is_none());
    }
}

//! Request keys: the canonical "what to fetch right now".

use std::collections::BTreeMap;
use std::fmt;

/// Name of the page parameter on list endpoints.
pub const PAGE_PARAM: &str = "page";

/// Pruned request parameters plus the current page.
///
/// Two keys are equal exactly when they would produce the same list request,
/// which is what the fetcher uses to de-duplicate and to detect staleness.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    params: BTreeMap<String, String>,
    page: u32,
}

impl RequestKey {
    /// Build a key from already-pruned parameters.
    ///
    /// Empty values are dropped here as well, so a key never carries them.
    pub fn new(params: BTreeMap<String, String>, page: u32) -> Self {
        let params = params.into_iter().filter(|(_, v)| !v.is_empty()).collect();
        Self { params, page }
    }

    /// Key for the given page with no parameters.
    pub fn page_only(page: u32) -> Self {
        Self::new(BTreeMap::new(), page)
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Same parameters, different page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            params: self.params.clone(),
            page,
        }
    }

    /// Parameters followed by `page`, ready for a query string.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.push((PAGE_PARAM.to_string(), self.page.to_string()));
        pairs
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.params {
            write!(f, "{}={}&", name, value)?;
        }
        write!(f, "{}={}", PAGE_PARAM, self.page)
    }
}

//! Filter state owned by a query controller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Filter value meaning "no restriction" in select boxes.
pub const ALL: &str = "all";

/// A single filter value.
///
/// `Unset`, the empty string and [`ALL`] are all "default" values and are
/// never sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// No value selected (`null`).
    #[default]
    Unset,
    /// A concrete value: a status, a role, a date bound, ...
    Value(String),
}

impl FilterValue {
    /// Returns `true` if this value must be pruned from requests.
    pub fn is_default(&self) -> bool {
        match self {
            FilterValue::Unset => true,
            FilterValue::Value(v) => v.is_empty() || v == ALL,
        }
    }

    /// The value to send, or `None` if it is a default.
    pub fn active(&self) -> Option<&str> {
        match self {
            FilterValue::Value(v) if !self.is_default() => Some(v.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Value(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Value(value)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FilterValue::Unset, Into::into)
    }
}

/// Mapping from filter name to value.
///
/// Ordered so that the derived request parameters are stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterState {
    values: BTreeMap<String, FilterValue>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for initial snapshots.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set one filter, returning the previous value.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Option<FilterValue> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.values.get(name)
    }

    /// All filters, including default ones.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Filters that survive pruning.
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter_map(|(k, v)| v.active().map(|v| (k.as_str(), v)))
    }

    /// Pruned filters as owned request parameters.
    pub fn to_params(&self) -> BTreeMap<String, String> {
        self.active()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for FilterState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut state = FilterState::new();
        for (k, v) in iter {
            state.set(k, v);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values_are_pruned() {
        let filters = FilterState::new()
            .with("status", "all")
            .with("search", "")
            .with("role", "admin")
            .with("from", FilterValue::Unset);

        let params = filters.to_params();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("role").map(String::as_str), Some("admin"));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(FilterValue::from(None::<&str>), FilterValue::Unset);
        assert_eq!(
            FilterValue::from(Some("2024-01-01")),
            FilterValue::Value("2024-01-01".into())
        );
    }

    #[test]
    fn test_set_returns_previous() {
        let mut filters = FilterState::new();
        assert_eq!(filters.set("status", "active"), None);
        assert_eq!(
            filters.set("status", "inactive"),
            Some(FilterValue::Value("active".into()))
        );
    }

    #[test]
    fn test_deserialize_from_json_with_nulls() {
        let filters: FilterState =
            serde_json::from_str(r#"{"status":"all","role":"admin","to":null}"#).unwrap();
        assert_eq!(filters.get("to"), Some(&FilterValue::Unset));
        assert_eq!(filters.active().collect::<Vec<_>>(), vec![("role", "admin")]);
    }
}

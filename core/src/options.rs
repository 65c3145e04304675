//! Optional query parameters for a lookup.
//!
//! # Design
//! A [`QueryOption`] is a named, typed entry that sets exactly one key of a
//! [`QueryParams`] map. Options are applied in slice order and every apply is
//! an overwrite, so when two options set the same key the later one wins and
//! applying the same option twice is a no-op.

use std::collections::BTreeMap;

pub const API_KEY_PARAM: &str = "apiKey";
pub const IP_PARAM: &str = "ip";
pub const OUTPUT_FORMAT_PARAM: &str = "outputFormat";
pub const FROM_PARAM: &str = "from";

/// Query parameters of a single request, kept sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// An optional parameter of a lookup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOption {
    /// Response format, `JSON` or `XML`. Only affects the raw path: typed
    /// lookups always request JSON.
    OutputFormat(String),

    /// Pagination cursor: the last domain name of the previous page.
    From(String),
}

impl QueryOption {
    pub fn output_format(format: impl Into<String>) -> Self {
        QueryOption::OutputFormat(format.into())
    }

    pub fn from_cursor(name: impl Into<String>) -> Self {
        QueryOption::From(name.into())
    }

    /// The query key this option writes.
    pub fn key(&self) -> &'static str {
        match self {
            QueryOption::OutputFormat(_) => OUTPUT_FORMAT_PARAM,
            QueryOption::From(_) => FROM_PARAM,
        }
    }

    pub fn apply(&self, params: &mut QueryParams) {
        match self {
            QueryOption::OutputFormat(format) => params.set(self.key(), format.to_uppercase()),
            QueryOption::From(name) => params.set(self.key(), name.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied(opts: &[QueryOption]) -> QueryParams {
        let mut params = QueryParams::new();
        for opt in opts {
            opt.apply(&mut params);
        }
        params
    }

    #[test]
    fn output_format_is_uppercased() {
        let params = applied(&[QueryOption::output_format("xml")]);
        assert_eq!(params.get("outputFormat"), Some("XML"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn from_sets_cursor_verbatim() {
        let params = applied(&[QueryOption::from_cursor("test.com")]);
        assert_eq!(params.get("from"), Some("test.com"));
    }

    #[test]
    fn last_write_wins() {
        let params = applied(&[
            QueryOption::from_cursor("a.com"),
            QueryOption::from_cursor("b.com"),
        ]);
        assert_eq!(params.get("from"), Some("b.com"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn repeated_apply_is_idempotent() {
        let opt = QueryOption::output_format("JSON");
        let once = applied(&[opt.clone()]);
        let twice = applied(&[opt.clone(), opt]);
        assert_eq!(once, twice);
    }

    #[test]
    fn distinct_keys_commute() {
        let a = QueryOption::output_format("JSON");
        let b = QueryOption::from_cursor("1");
        assert_eq!(applied(&[a.clone(), b.clone()]), applied(&[b, a]));
    }

    #[test]
    fn iter_is_sorted_by_key() {
        let mut params = QueryParams::new();
        params.set("ip", "8.8.8.8");
        params.set("apiKey", "k");
        params.set("from", "1");
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["apiKey", "from", "ip"]);
    }
}

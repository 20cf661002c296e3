//! Query parameter table.
//!
//! An ordered multimap of query-string parameters. Lookups are ASCII
//! case-insensitive on the parameter name, matching OGC service conventions
//! (`SERVICE=WMS` and `service=wms` are the same request).

use url::form_urlencoded;

/// Ordered multimap of query-string parameters.
///
/// Insertion order is preserved, and a name may appear more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamTable {
    entries: Vec<(String, String)>,
}

impl ParamTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an URL-encoded query string (without the leading `?`).
    ///
    /// ```
    /// use tilebridge::engine::ParamTable;
    ///
    /// let params = ParamTable::parse("SERVICE=WMS&REQUEST=GetCapabilities");
    /// assert_eq!(params.get("service"), Some("WMS"));
    /// ```
    pub fn parse(query_string: &str) -> Self {
        let entries = form_urlencoded::parse(query_string.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { entries }
    }

    /// Append a parameter, keeping any existing values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for `name`, compared ASCII case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All entries, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

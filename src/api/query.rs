//! Search helpers for Foreman collections.
//!
//! Collection endpoints answer with an envelope carrying the match count and
//! the current page of results.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::decode::Fields;

/// Envelope returned by Foreman collection endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse<T> {
    /// Objects in the collection before filtering
    pub total: i64,
    /// Objects matching the search
    pub subtotal: i64,
    /// Page number
    pub page: i64,
    /// Page size
    pub per_page: i64,
    /// The search expression Foreman applied
    pub search: String,
    /// Objects on this page
    pub results: Vec<T>,
}

/// How many objects a search matched.
#[derive(Debug, Clone, PartialEq)]
pub enum Match<T> {
    /// Nothing matched.
    None,
    /// Exactly one object matched.
    One(T),
    /// More than one object matched.
    Many(usize),
}

impl<T> QueryResponse<T> {
    /// Number of matched objects, falling back to the page length when
    /// Foreman omits or zeroes the subtotal.
    pub fn matched(&self) -> usize {
        match usize::try_from(self.subtotal) {
            Ok(n) if n > 0 => n.max(self.results.len()),
            _ => self.results.len(),
        }
    }

    /// Collapse the response into a single-object match.
    pub fn into_match(mut self) -> Match<T> {
        match (self.matched(), self.results.pop()) {
            (1, Some(only)) => Match::One(only),
            (0, _) | (_, None) => Match::None,
            (n, Some(_)) => Match::Many(n),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for QueryResponse<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let fields = Fields::new(&value);
        let results = match fields.get("results") {
            Some(Value::Array(items)) => items.clone(),
            // Puppet classes come back grouped by module name.
            Some(Value::Object(groups)) => groups
                .values()
                .flat_map(|group| match group {
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                })
                .collect(),
            _ => Vec::new(),
        };
        let results = results
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(serde::de::Error::custom)?;

        Ok(Self {
            total: fields.i64("total"),
            subtotal: fields.i64("subtotal"),
            page: fields.i64("page"),
            per_page: fields.i64("per_page"),
            search: fields.string("search"),
            results,
        })
    }
}

/// Build an exact-match scoped-search expression, e.g. `name="dc1"`.
pub fn search_expression(field: &str, value: &str) -> String {
    format!("{}=\"{}\"", field, value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Named {
        name: String,
    }

    #[test]
    fn test_search_expression() {
        assert_eq!(search_expression("name", "dc1"), r#"name="dc1""#);
        assert_eq!(search_expression("match", r#"fqdn="a""#), r#"match="fqdn=\"a\"""#);
    }

    #[test]
    fn test_decode_envelope() {
        let response: QueryResponse<Named> = serde_json::from_value(json!({
            "total": "12",
            "subtotal": 1,
            "page": 1,
            "per_page": 20,
            "search": "name=\"dc1\"",
            "results": [{"name": "dc1"}]
        }))
        .unwrap();

        assert_eq!(response.total, 12);
        assert_eq!(response.subtotal, 1);
        assert_eq!(response.search, "name=\"dc1\"");
        assert_eq!(response.into_match(), Match::One(Named { name: "dc1".into() }));
    }

    #[test]
    fn test_grouped_results_are_flattened() {
        let response: QueryResponse<Named> = serde_json::from_value(json!({
            "subtotal": 3,
            "results": {
                "ntp": [{"name": "ntp"}, {"name": "ntp::config"}],
                "apache": [{"name": "apache"}]
            }
        }))
        .unwrap();

        assert_eq!(response.results.len(), 3);
        assert_eq!(response.into_match(), Match::Many(3));
    }

    #[test]
    fn test_no_results() {
        let response: QueryResponse<Named> =
            serde_json::from_value(json!({"subtotal": 0, "results": []})).unwrap();
        assert_eq!(response.into_match(), Match::None);

        let response: QueryResponse<Named> = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.into_match(), Match::None);
    }

    #[test]
    fn test_missing_subtotal_counts_results() {
        let response: QueryResponse<Named> = serde_json::from_value(json!({
            "results": [{"name": "a"}, {"name": "b"}]
        }))
        .unwrap();
        assert_eq!(response.matched(), 2);
        assert_eq!(response.into_match(), Match::Many(2));
    }
}

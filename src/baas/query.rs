//! PostgREST query string builder
//!
//! Provides a fluent API for the filter, ordering and projection parameters
//! the table endpoints understand.
//!
//! ```ignore
//! let query = Query::new()
//!     .select("id, role, approved")
//!     .eq("role", "student")
//!     .order("grade", true)
//!     .build();
//! // "?select=id,role,approved&role=eq.student&order=grade.asc"
//! ```

use std::fmt::Display;

/// Builder for PostgREST query parameters
#[derive(Debug, Clone, Default)]
pub struct Query {
    params: Vec<(String, String)>,
    order: Vec<String>,
}

impl Query {
    /// Create a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the returned columns. Whitespace in the list is dropped.
    pub fn select(self, columns: &str) -> Self {
        let columns: String = columns.chars().filter(|c| !c.is_whitespace()).collect();
        self.raw("select", columns)
    }

    /// `column = value`
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.op(column, "eq", value)
    }

    /// `column >= value`
    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.op(column, "gte", value)
    }

    /// `column <= value`
    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.op(column, "lte", value)
    }

    /// `column IN (values...)`
    pub fn is_in<T: Display>(self, column: &str, values: &[T]) -> Self {
        let list = values
            .iter()
            .map(|v| format!("\"{}\"", v.to_string().replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(",");
        self.raw(column, format!("in.({})", list))
    }

    /// Append an ordering term; terms apply in the order they were added.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{}.{}", column, direction));
        self
    }

    /// Cap the number of returned rows.
    pub fn limit(self, n: usize) -> Self {
        self.raw("limit", n)
    }

    fn op(self, column: &str, op: &str, value: impl Display) -> Self {
        self.raw(column, format!("{}.{}", op, value))
    }

    fn raw(mut self, key: &str, value: impl Display) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Build the query string.
    ///
    /// Returns an empty string if no parameters were added,
    /// otherwise returns "?key1=value1&key2=value2...".
    pub fn build(&self) -> String {
        let mut pairs: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, encode_value(v)))
            .collect();

        if !self.order.is_empty() {
            pairs.push(format!("order={}", self.order.join(",")));
        }

        if pairs.is_empty() {
            String::new()
        } else {
            format!("?{}", pairs.join("&"))
        }
    }
}

/// Percent-encode a value while keeping PostgREST's operator syntax readable.
fn encode_value(value: &str) -> String {
    urlencoding::encode(value)
        .replace("%2C", ",")
        .replace("%28", "(")
        .replace("%29", ")")
}

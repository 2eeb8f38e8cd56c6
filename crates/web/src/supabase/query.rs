//! Query-string builder for the Data API.
//!
//! Each filter becomes one `column=operator.value` pair, which `PostgREST`
//! combines with AND.

use std::fmt::Display;

/// Filters, ordering and paging for a table request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    /// Empty query (all columns, no filters).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict returned columns.
    #[must_use]
    pub fn select(self, columns: &str) -> Self {
        self.push("select", columns.to_string())
    }

    /// `column = value`
    #[must_use]
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.push(column, format!("eq.{value}"))
    }

    /// `column IN (values)`
    #[must_use]
    pub fn in_list<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let joined = values
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.push(column, format!("in.({joined})"))
    }

    /// `column >= value`
    #[must_use]
    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.push(column, format!("gte.{value}"))
    }

    /// `column < value`
    #[must_use]
    pub fn lt(self, column: &str, value: impl Display) -> Self {
        self.push(column, format!("lt.{value}"))
    }

    /// Case-insensitive substring match.
    #[must_use]
    pub fn ilike(self, column: &str, term: &str) -> Self {
        let term = sanitize_term(term);
        self.push(column, format!("ilike.*{term}*"))
    }

    /// Case-insensitive substring match on any of `columns`.
    #[must_use]
    pub fn ilike_any(self, columns: &[&str], term: &str) -> Self {
        let term = sanitize_term(term);
        let clauses = columns
            .iter()
            .map(|column| format!("{column}.ilike.*{term}*"))
            .collect::<Vec<_>>()
            .join(",");
        self.push("or", format!("({clauses})"))
    }

    /// Sort by `column`.
    #[must_use]
    pub fn order(self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.push("order", format!("{column}.{direction}"))
    }

    /// Maximum number of rows.
    #[must_use]
    pub fn limit(self, limit: usize) -> Self {
        self.push("limit", limit.to_string())
    }

    /// Query-string pairs in insertion order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.params
    }

    fn push(mut self, key: &str, value: String) -> Self {
        self.params.push((key.to_string(), value));
        self
    }
}

/// Drop characters that carry meaning inside filter expressions.
fn sanitize_term(term: &str) -> String {
    term.trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '%' | '"' | '\\' | ':'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(query: &Query) -> Vec<(&str, &str)> {
        query
            .pairs()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_filters_are_anded_pairs() {
        let query = Query::new()
            .eq("store_id", "s1")
            .eq("category", "Snacks")
            .order("created_at", false)
            .limit(5);
        assert_eq!(
            pairs(&query),
            vec![
                ("store_id", "eq.s1"),
                ("category", "eq.Snacks"),
                ("order", "created_at.desc"),
                ("limit", "5"),
            ]
        );
    }

    #[test]
    fn test_in_list() {
        let query = Query::new().in_list("id", ["a", "b", "c"]);
        assert_eq!(pairs(&query), vec![("id", "in.(a,b,c)")]);
    }

    #[test]
    fn test_ilike_sanitizes_term() {
        let query = Query::new().ilike("name", " Chai (500g)* ");
        assert_eq!(pairs(&query), vec![("name", "ilike.*Chai 500g*")]);
    }

    #[test]
    fn test_ilike_any() {
        let query = Query::new().ilike_any(&["name", "phone"], "98");
        assert_eq!(
            pairs(&query),
            vec![("or", "(name.ilike.*98*,phone.ilike.*98*)")]
        );
    }
}

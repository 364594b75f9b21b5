//! Outbound search queries

use serde::{Deserialize, Serialize};
use std::fmt;

const ORDER_BY_KEYWORD: &str = "ORDER BY";

/// A search query in the tracker's query language.
///
/// The caller's own constraints (`base`) and a trailing ordering clause are
/// kept apart so restrictions can be inserted between them. Restrictions only
/// ever narrow the result set: they are joined with `AND`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    base: String,
    restrictions: Vec<String>,
    order_by: Option<String>,
}

impl SearchQuery {
    /// Split a raw query into its constraints and its trailing `ORDER BY` clause.
    ///
    /// Only an `ORDER BY` outside string literals is recognised. A query
    /// with an unterminated literal is kept whole.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        match find_order_by(raw) {
            Some(idx) => Self {
                base: raw[..idx].trim_end().to_string(),
                restrictions: Vec::new(),
                order_by: Some(raw[idx..].to_string()),
            },
            None => Self {
                base: raw.to_string(),
                restrictions: Vec::new(),
                order_by: None,
            },
        }
    }

    /// The caller's constraints, untouched
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The ordering clause including its `ORDER BY` keyword
    pub fn order_by(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    pub fn restrictions(&self) -> &[String] {
        &self.restrictions
    }

    pub fn has_restriction(&self, clause: &str) -> bool {
        self.restrictions.iter().any(|r| r == clause)
    }

    /// Append a restriction (logical AND)
    pub fn and(mut self, clause: impl Into<String>) -> Self {
        self.restrictions.push(clause.into());
        self
    }

    /// Render the query back into the tracker's query language
    pub fn to_query_string(&self) -> String {
        let mut out = if self.restrictions.is_empty() {
            self.base.clone()
        } else {
            let mut parts = Vec::with_capacity(self.restrictions.len() + 1);
            if !self.base.is_empty() {
                parts.push(format!("({})", self.base));
            }
            parts.extend(self.restrictions.iter().cloned());
            parts.join(" AND ")
        };

        if let Some(order_by) = &self.order_by {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(order_by);
        }

        out
    }
}

/// Byte offset of the last `ORDER BY` that starts a word outside quotes
fn find_order_by(raw: &str) -> Option<usize> {
    // ASCII uppercasing keeps byte offsets intact
    let upper = raw.to_ascii_uppercase();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut found = None;

    for (idx, c) in raw.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            _ if upper[idx..].starts_with(ORDER_BY_KEYWORD)
                && (idx == 0 || raw[..idx].ends_with(char::is_whitespace)) =>
            {
                found = Some(idx);
            }
            _ => {}
        }
    }

    if quote.is_some() { None } else { found }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query_string())
    }
}

impl From<&str> for SearchQuery {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_without_ordering() {
        let q = SearchQuery::parse("project = BP");
        assert_eq!(q.base(), "project = BP");
        assert_eq!(q.order_by(), None);
        assert_eq!(q.to_query_string(), "project = BP");
    }

    #[test]
    fn parse_splits_ordering() {
        let q = SearchQuery::parse("project = BP order by created DESC");
        assert_eq!(q.base(), "project = BP");
        assert_eq!(q.order_by(), Some("order by created DESC"));
        assert_eq!(q.to_query_string(), "project = BP order by created DESC");
    }

    #[test]
    fn ordering_keyword_inside_a_word_is_not_split() {
        let q = SearchQuery::parse("summary ~ \"BORDER BY\"");
        assert_eq!(q.order_by(), None);
    }

    #[test]
    fn ordering_keyword_inside_quotes_is_not_split() {
        let q = SearchQuery::parse("summary ~ \"sort ORDER BY date\"")
            .and("(assignee = currentUser())");
        assert_eq!(q.base(), "summary ~ \"sort ORDER BY date\"");
        assert_eq!(q.order_by(), None);
        assert_eq!(
            q.to_query_string(),
            "(summary ~ \"sort ORDER BY date\") AND (assignee = currentUser())"
        );

        let q = SearchQuery::parse("summary ~ 'a ORDER BY b' ORDER BY key");
        assert_eq!(q.base(), "summary ~ 'a ORDER BY b'");
        assert_eq!(q.order_by(), Some("ORDER BY key"));
    }

    #[test]
    fn escaped_quotes_stay_inside_the_literal() {
        let q = SearchQuery::parse(r#"summary ~ "say \" ORDER BY x" ORDER BY created"#);
        assert_eq!(q.base(), r#"summary ~ "say \" ORDER BY x""#);
        assert_eq!(q.order_by(), Some("ORDER BY created"));
    }

    #[test]
    fn unterminated_literal_is_not_split() {
        let q = SearchQuery::parse("summary ~ \"open ORDER BY key");
        assert_eq!(q.base(), "summary ~ \"open ORDER BY key");
        assert_eq!(q.order_by(), None);
    }

    #[test]
    fn restrictions_go_before_ordering() {
        let q = SearchQuery::parse("project = BP OR project = OPS ORDER BY key")
            .and("(assignee = currentUser())");
        assert_eq!(
            q.to_query_string(),
            "(project = BP OR project = OPS) AND (assignee = currentUser()) ORDER BY key"
        );
    }

    #[test]
    fn restriction_on_empty_query() {
        let q = SearchQuery::parse("ORDER BY updated").and("(reporter = currentUser())");
        assert_eq!(q.base(), "");
        assert_eq!(q.to_query_string(), "(reporter = currentUser()) ORDER BY updated");
    }
}

//! Listing options and their composition from raw query parameters.
//!
//! Pagination values that are absent or fail to parse fall back to the
//! configured sentinel, which means "no pagination constraint". Composition
//! never fails.

use serde::{Deserialize, Serialize};

/// Default sentinel for page and per-page: no pagination applied.
pub const UNCONSTRAINED: i64 = -1;

/// Sentinel values used when a pagination parameter is absent or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationDefaults {
    /// Page used when `page` is absent or unparsable.
    pub page: i64,
    /// Page size used when `per_page` is absent or unparsable.
    pub per_page: i64,
}

impl Default for PaginationDefaults {
    fn default() -> Self {
        Self {
            page: UNCONSTRAINED,
            per_page: UNCONSTRAINED,
        }
    }
}

/// Options for listing nodes.
///
/// Each builder method writes exactly one field, so applying the same method
/// twice is idempotent and the order of application does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGetOptions {
    /// Case-insensitive substring the name must contain ("" = any).
    pub term_in_name: String,
    /// Case-insensitive substring the description must contain ("" = any).
    pub term_in_description: String,
    /// Zero-based page number.
    pub page: i64,
    /// Page size; `<= 0` disables pagination.
    pub per_page: i64,
}

impl NodeGetOptions {
    /// Options with no filters and the given pagination sentinels.
    pub fn new(defaults: PaginationDefaults) -> Self {
        Self {
            term_in_name: String::new(),
            term_in_description: String::new(),
            page: defaults.page,
            per_page: defaults.per_page,
        }
    }

    /// Set the name filter.
    pub fn with_term_in_name(mut self, term: impl Into<String>) -> Self {
        self.term_in_name = term.into();
        self
    }

    /// Set the description filter.
    pub fn with_term_in_description(mut self, term: impl Into<String>) -> Self {
        self.term_in_description = term.into();
        self
    }

    /// Set the page number.
    pub fn with_page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    /// Set the page size.
    pub fn with_per_page(mut self, per_page: i64) -> Self {
        self.per_page = per_page;
        self
    }

    /// Resolve pagination into `(limit, offset)`.
    ///
    /// Returns `None` when unconstrained (`per_page <= 0`). A negative page
    /// with a positive page size is treated as the first page.
    /// The offset saturates at `i64::MAX` so it always binds as a
    /// non-negative SQL integer.
    pub fn limit_offset(&self) -> Option<(i64, i64)> {
        if self.per_page <= 0 {
            return None;
        }
        let offset = self.page.max(0).saturating_mul(self.per_page);
        Some((self.per_page, offset))
    }

    /// Whether a node's name and description satisfy the substring filters.
    pub fn matches(&self, name: &str, description: &str) -> bool {
        contains_ignore_case(name, &self.term_in_name)
            && contains_ignore_case(description, &self.term_in_description)
    }
}

impl Default for NodeGetOptions {
    fn default() -> Self {
        Self::new(PaginationDefaults::default())
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Raw, unvalidated listing parameters as they arrive in a query string.
///
/// All fields are kept textual so that a malformed page never rejects the
/// request at extraction time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNodeQuery {
    /// Raw `term_in_name`.
    pub term_in_name: Option<String>,
    /// Raw `term_in_description`.
    pub term_in_description: Option<String>,
    /// Raw `page`.
    pub page: Option<String>,
    /// Raw `per_page`.
    pub per_page: Option<String>,
}

impl RawNodeQuery {
    /// Collect listing parameters from decoded query pairs.
    ///
    /// The first occurrence of a repeated key wins; unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "term_in_name" => &mut query.term_in_name,
                "term_in_description" => &mut query.term_in_description,
                "page" => &mut query.page,
                "per_page" => &mut query.per_page,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }

    /// Compose validated listing options.
    ///
    /// Substring filters pass through verbatim. Pagination values are parsed
    /// as integers and fall back to `defaults` on absence or parse failure.
    pub fn compose(&self, defaults: PaginationDefaults) -> NodeGetOptions {
        NodeGetOptions {
            term_in_name: self.term_in_name.clone().unwrap_or_default(),
            term_in_description: self.term_in_description.clone().unwrap_or_default(),
            page: parse_or(self.page.as_deref(), defaults.page),
            per_page: parse_or(self.per_page.as_deref(), defaults.per_page),
        }
    }
}

fn parse_or(raw: Option<&str>, fallback: i64) -> i64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(page: Option<&str>, per_page: Option<&str>) -> RawNodeQuery {
        RawNodeQuery {
            page: page.map(str::to_string),
            per_page: per_page.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_compose_empty_query_is_unconstrained() {
        let options = RawNodeQuery::default().compose(PaginationDefaults::default());
        assert_eq!(options, NodeGetOptions::default());
        assert_eq!(options.limit_offset(), None);
    }

    #[test]
    fn test_compose_malformed_pagination_falls_back() {
        let options = raw(Some("abc"), Some("1.5")).compose(PaginationDefaults::default());
        assert_eq!(options.page, UNCONSTRAINED);
        assert_eq!(options.per_page, UNCONSTRAINED);

        let options = raw(Some(" 2"), Some("")).compose(PaginationDefaults::default());
        assert_eq!(options.page, UNCONSTRAINED);
        assert_eq!(options.per_page, UNCONSTRAINED);
    }

    #[test]
    fn test_compose_uses_configured_defaults() {
        let defaults = PaginationDefaults { page: 0, per_page: 25 };
        let options = raw(Some("x"), None).compose(defaults);
        assert_eq!(options.page, 0);
        assert_eq!(options.per_page, 25);
    }

    #[test]
    fn test_compose_passes_terms_verbatim() {
        let query = RawNodeQuery {
            term_in_name: Some("  Alg%_ ".to_string()),
            term_in_description: Some("intro".to_string()),
            page: Some("2".to_string()),
            per_page: Some("10".to_string()),
        };
        let options = query.compose(PaginationDefaults::default());
        assert_eq!(options.term_in_name, "  Alg%_ ");
        assert_eq!(options.term_in_description, "intro");
        assert_eq!(options.limit_offset(), Some((10, 20)));
    }

    #[test]
    fn test_from_pairs_keeps_first_value() {
        let pairs = [
            ("page", "1"),
            ("page", "abc"),
            ("per_page", "10"),
            ("per_page", "x"),
            ("term_in_name", "alg"),
            ("unrelated", "y"),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string()));
        let query = RawNodeQuery::from_pairs(pairs);

        assert_eq!(query.page.as_deref(), Some("1"));
        assert_eq!(query.per_page.as_deref(), Some("10"));
        assert_eq!(query.term_in_name.as_deref(), Some("alg"));
        assert_eq!(query.term_in_description, None);
    }

    #[test]
    fn test_limit_offset_saturates_for_huge_pages() {
        let options = NodeGetOptions::default().with_per_page(10).with_page(i64::MAX);
        let (limit, offset) = options.limit_offset().unwrap();
        assert_eq!(limit, 10);
        assert_eq!(offset, i64::MAX);

        let options = NodeGetOptions::default().with_per_page(i64::MAX).with_page(2);
        assert_eq!(options.limit_offset(), Some((i64::MAX, i64::MAX)));
    }

    #[test]
    fn test_limit_offset_negative_page_is_first_page() {
        let options = NodeGetOptions::default().with_per_page(5).with_page(-3);
        assert_eq!(options.limit_offset(), Some((5, 0)));
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let options = NodeGetOptions::default().with_term_in_name("alg");
        assert!(options.matches("Linear Algebra", "anything"));
        assert!(!options.matches("Geometry", "algebra"));
    }
}

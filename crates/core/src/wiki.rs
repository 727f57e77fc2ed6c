//! Wiki page slugs, publication status, validation, and list pagination.
//!
//! Page slugs are titles with whitespace replaced by underscores
//! (`Main page` -> `Main_page`), so a slug can always be turned back into a
//! readable title.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CONTENT_LEN: usize = 100_000;
pub const MAX_DESCRIPTION_LEN: usize = 400;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LEN: usize = 50;

/// Default and ceiling for feed-style `limit` parameters.
pub const DEFAULT_FEED_LIMIT: i64 = 20;
pub const MAX_FEED_LIMIT: i64 = 100;

// ---------------------------------------------------------------------------
// Publication status
// ---------------------------------------------------------------------------

/// Publication status of a page, stored as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Draft,
    Published,
}

impl PageStatus {
    pub const DRAFT_ID: i16 = 1;
    pub const PUBLISHED_ID: i16 = 2;

    pub fn id(&self) -> i16 {
        match self {
            Self::Draft => Self::DRAFT_ID,
            Self::Published => Self::PUBLISHED_ID,
        }
    }

    pub fn from_id(id: i16) -> Result<Self, CoreError> {
        match id {
            Self::DRAFT_ID => Ok(Self::Draft),
            Self::PUBLISHED_ID => Ok(Self::Published),
            other => Err(CoreError::Validation(format!(
                "Invalid page status {other}. Must be 1 (draft) or 2 (published)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\s]+").expect("valid regex"));

/// Turn a title into a slug: every whitespace run becomes `_`.
pub fn urlize_title(title: &str) -> String {
    WHITESPACE_RUN.replace_all(title, "_").into_owned()
}

/// Turn a slug back into a title: runs of `_` and whitespace become one
/// space.
pub fn deurlize_title(slug: &str) -> String {
    SEPARATOR_RUN.replace_all(slug, " ").into_owned()
}

/// The canonical form of a requested slug, or `None` if it already is
/// canonical.
pub fn canonical_slug(requested: &str) -> Option<String> {
    let canonical = urlize_title(requested);
    (canonical != requested).then_some(canonical)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a page title (non-empty, <= 200 chars).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a page slug (non-empty, no whitespace, no `/`).
pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.is_empty() {
        return Err(CoreError::Validation("Slug must not be empty".into()));
    }
    if slug.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(CoreError::Validation(
            "Slug must not contain whitespace or '/'".into(),
        ));
    }
    Ok(())
}

/// Validate page content (max 100 000 chars).
pub fn validate_content(content: &str) -> Result<(), CoreError> {
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(CoreError::Validation(format!(
            "Content must be at most {MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate an edit summary (max 400 chars, may be empty).
pub fn validate_description(description: &str) -> Result<(), CoreError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(CoreError::Validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate page tags (each non-empty, <= 50 chars, max 20 tags).
pub fn validate_tags(tags: &[String]) -> Result<(), CoreError> {
    if tags.len() > MAX_TAGS {
        return Err(CoreError::Validation(format!(
            "A maximum of {MAX_TAGS} tags is allowed"
        )));
    }
    for tag in tags {
        if tag.trim().is_empty() {
            return Err(CoreError::Validation("Tags must not be empty".into()));
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(CoreError::Validation(format!(
                "Each tag must be at most {MAX_TAG_LEN} characters"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Clamp a client-supplied limit into `1..=max`, using `default` when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

/// Offset for 1-based `page` numbers; anything below 1 is page 1.
pub fn page_offset(page: Option<i64>, per_page: i64) -> i64 {
    (page.unwrap_or(1).max(1) - 1).saturating_mul(per_page)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- slugs ---------------------------------------------------------------

    #[test]
    fn urlize_replaces_whitespace_runs() {
        assert_eq!(urlize_title("Main page"), "Main_page");
        assert_eq!(urlize_title("Foo  \t Bar"), "Foo_Bar");
        assert_eq!(urlize_title("Already_slug"), "Already_slug");
    }

    #[test]
    fn deurlize_collapses_separators() {
        assert_eq!(deurlize_title("Main_page"), "Main page");
        assert_eq!(deurlize_title("Foo__ _Bar"), "Foo Bar");
    }

    #[test]
    fn canonical_slug_only_when_different() {
        assert_eq!(canonical_slug("Main page"), Some("Main_page".into()));
        assert_eq!(canonical_slug("Main_page"), None);
    }

    // -- status --------------------------------------------------------------

    #[test]
    fn status_ids_round_trip() {
        assert_eq!(PageStatus::from_id(1).unwrap(), PageStatus::Draft);
        assert_eq!(PageStatus::from_id(2).unwrap(), PageStatus::Published);
        assert_eq!(PageStatus::Published.id(), 2);
        assert!(PageStatus::from_id(3).is_err());
        assert_eq!(PageStatus::Draft.to_string(), "draft");
    }

    // -- validate_title ------------------------------------------------------

    #[test]
    fn title_valid() {
        assert!(validate_title("My Page").is_ok());
    }

    #[test]
    fn title_empty_rejected() {
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
    }

    #[test]
    fn title_too_long_rejected() {
        assert!(validate_title(&"a".repeat(201)).is_err());
        assert!(validate_title(&"é".repeat(200)).is_ok());
    }

    // -- validate_slug -------------------------------------------------------

    #[test]
    fn slug_valid() {
        assert!(validate_slug("Main_page").is_ok());
    }

    #[test]
    fn slug_invalid() {
        assert!(validate_slug("").is_err());
        assert!(validate_slug("a b").is_err());
        assert!(validate_slug("a/b").is_err());
    }

    // -- content, description, tags -----------------------------------------

    #[test]
    fn content_limits() {
        assert!(validate_content("Hello world").is_ok());
        assert!(validate_content(&"x".repeat(100_001)).is_err());
    }

    #[test]
    fn description_limits() {
        assert!(validate_description("").is_ok());
        assert!(validate_description(&"x".repeat(401)).is_err());
    }

    #[test]
    fn tags_valid() {
        let tags = vec!["rust".to_string(), "wiki".to_string()];
        assert!(validate_tags(&tags).is_ok());
    }

    #[test]
    fn tags_too_many_rejected() {
        let tags: Vec<String> = (0..21).map(|i| format!("tag-{i}")).collect();
        assert!(validate_tags(&tags).is_err());
    }

    #[test]
    fn tags_empty_or_long_rejected() {
        assert!(validate_tags(&["".to_string()]).is_err());
        assert!(validate_tags(&["x".repeat(51)]).is_err());
    }

    // -- pagination ----------------------------------------------------------

    #[test]
    fn clamp_limit_bounds() {
        assert_eq!(clamp_limit(None, 20, 100), 20);
        assert_eq!(clamp_limit(Some(0), 20, 100), 1);
        assert_eq!(clamp_limit(Some(500), 20, 100), 100);
    }

    #[test]
    fn page_offset_is_one_based() {
        assert_eq!(page_offset(None, 10), 0);
        assert_eq!(page_offset(Some(3), 10), 20);
        assert_eq!(page_offset(Some(-4), 10), 0);
    }
}

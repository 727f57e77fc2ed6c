//! Wiki-wide settings.
//!
//! Loaded once at startup (see `folio_api::config`) and threaded through the
//! application state. Nothing in the domain layer reads the environment.

use std::time::Duration;

use crate::diff::{DiffOptions, DEFAULT_DIFF_TIMEOUT};
use crate::markup::{MarkupFilter, MarkupRenderer};
use crate::privacy::{Policy, PrivacyLevel};

pub const DEFAULT_INDEX: &str = "Main_page";
pub const DEFAULT_PAGES_PER_PAGE: i64 = 10;
pub const DEFAULT_BASE_URL: &str = "/api/v1/wiki/pages/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiSettings {
    /// Slug the wiki index redirects to.
    pub default_index: String,
    pub pages_per_page: i64,
    /// Applies to every page without its own privacy override.
    pub default_privacy: PrivacyLevel,
    pub text_filter: MarkupFilter,
    /// Only consulted when the effective privacy level is `Open`.
    pub allow_anonymous_edits: bool,
    /// Prefix for wiki link hrefs.
    pub base_url: String,
    /// Time budget for a single diff; `None` means exact diffs.
    pub diff_timeout: Option<Duration>,
}

impl Default for WikiSettings {
    fn default() -> Self {
        Self {
            default_index: DEFAULT_INDEX.to_string(),
            pages_per_page: DEFAULT_PAGES_PER_PAGE,
            default_privacy: PrivacyLevel::Registered,
            text_filter: MarkupFilter::WikiLinks,
            allow_anonymous_edits: true,
            base_url: DEFAULT_BASE_URL.to_string(),
            diff_timeout: Some(DEFAULT_DIFF_TIMEOUT),
        }
    }
}

impl WikiSettings {
    /// Policy for a page, honouring its privacy override if it has one.
    pub fn policy(&self, page_privacy: Option<PrivacyLevel>) -> Policy {
        Policy::new(
            page_privacy.unwrap_or(self.default_privacy),
            self.allow_anonymous_edits,
        )
    }

    /// Policy for wiki-wide actions (creating pages, the index).
    pub fn wiki_policy(&self) -> Policy {
        self.policy(None)
    }

    pub fn renderer(&self) -> MarkupRenderer {
        MarkupRenderer::new(self.text_filter, self.base_url.clone())
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            timeout: self.diff_timeout,
            ..DiffOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privacy::Viewer;

    #[test]
    fn defaults() {
        let s = WikiSettings::default();
        assert_eq!(s.default_index, "Main_page");
        assert_eq!(s.pages_per_page, 10);
        assert_eq!(s.default_privacy, PrivacyLevel::Registered);
        assert_eq!(s.text_filter, MarkupFilter::WikiLinks);
        assert!(s.allow_anonymous_edits);
        assert_eq!(s.diff_timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn page_override_wins_over_default() {
        let s = WikiSettings::default();
        assert!(!s.wiki_policy().can_edit(&Viewer::Anonymous));
        assert!(s.policy(Some(PrivacyLevel::Open)).can_edit(&Viewer::Anonymous));
        assert_eq!(s.policy(None).level, PrivacyLevel::Registered);
    }

    #[test]
    fn diff_options_carry_timeout() {
        let s = WikiSettings {
            diff_timeout: None,
            ..WikiSettings::default()
        };
        assert_eq!(s.diff_options().timeout, None);
        assert!(s.diff_options().line_mode);
    }

    #[test]
    fn renderer_uses_filter_and_base() {
        let r = WikiSettings::default().renderer();
        assert_eq!(r.filter(), MarkupFilter::WikiLinks);
        assert!(r.render("[[Home]]").contains("/api/v1/wiki/pages/Home"));
    }
}

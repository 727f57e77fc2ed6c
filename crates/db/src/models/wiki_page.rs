//! Wiki page model and write DTOs.

use folio_core::error::CoreError;
use folio_core::history::Author;
use folio_core::privacy::{PrivacyLevel, Publication};
use folio_core::types::{DbId, Timestamp};
use folio_core::wiki::PageStatus;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `wiki_pages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WikiPage {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status_id: i16,
    pub privacy: Option<String>,
    pub tags: Vec<String>,
    pub publish_date: Timestamp,
    pub expiry_date: Option<Timestamp>,
    pub owner_id: Option<DbId>,
    pub owner_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WikiPage {
    pub fn owner(&self) -> Author {
        Author::from_columns(self.owner_id, self.owner_name.clone())
    }

    pub fn status(&self) -> Result<PageStatus, CoreError> {
        PageStatus::from_id(self.status_id)
    }

    /// The page's own privacy override, if any.
    pub fn privacy_level(&self) -> Result<Option<PrivacyLevel>, CoreError> {
        self.privacy.as_deref().map(str::parse).transpose()
    }

    pub fn publication(&self) -> Result<Publication, CoreError> {
        Ok(Publication {
            status: self.status()?,
            publish_date: self.publish_date,
            expiry_date: self.expiry_date,
        })
    }
}

/// Everything needed to create a page and its initial revision.
#[derive(Debug, Clone)]
pub struct NewPage {
    pub title: String,
    pub slug: String,
    pub content: String,
    /// Summary stored on the initial revision.
    pub description: String,
    pub status: PageStatus,
    pub privacy: Option<PrivacyLevel>,
    pub tags: Vec<String>,
    pub category_ids: Vec<DbId>,
    /// Defaults to now.
    pub publish_date: Option<Timestamp>,
    pub expiry_date: Option<Timestamp>,
    pub author: Author,
}

impl NewPage {
    /// A published page with default attributes.
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        content: impl Into<String>,
        author: Author,
    ) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
            content: content.into(),
            description: String::new(),
            status: PageStatus::Published,
            privacy: None,
            tags: Vec::new(),
            category_ids: Vec::new(),
            publish_date: None,
            expiry_date: None,
            author,
        }
    }
}

/// An edit to an existing page. `None` attributes are left unchanged.
///
/// A revision is appended only when `content` differs from the page's
/// current content.
#[derive(Debug, Clone)]
pub struct ContentEdit {
    pub content: String,
    pub description: String,
    pub author: Author,
    pub title: Option<String>,
    pub status: Option<PageStatus>,
    pub tags: Option<Vec<String>>,
    pub category_ids: Option<Vec<DbId>>,
}

impl ContentEdit {
    pub fn new(content: impl Into<String>, description: impl Into<String>, author: Author) -> Self {
        Self {
            content: content.into(),
            description: description.into(),
            author,
            title: None,
            status: None,
            tags: None,
            category_ids: None,
        }
    }
}

/// Filters for page listings.
#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    pub tag: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Owner username.
    pub author: Option<String>,
    /// Include drafts and pages outside their publish window.
    pub include_unpublished: bool,
    pub limit: i64,
    pub offset: i64,
}

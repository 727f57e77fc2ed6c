//! Wiki revision model.
//!
//! Revisions are immutable snapshots of page content, appended whenever an
//! edit changes the content.

use folio_core::history::{Author, Stamped};
use folio_core::types::{DbId, Timestamp};
use folio_core::undo::RevisionSnapshot;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `wiki_revisions` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct WikiRevision {
    pub id: DbId,
    pub page_id: DbId,
    pub content: String,
    pub description: String,
    pub author_id: Option<DbId>,
    pub author_name: Option<String>,
    pub created_at: Timestamp,
}

impl WikiRevision {
    pub fn author(&self) -> Author {
        Author::from_columns(self.author_id, self.author_name.clone())
    }

    pub fn snapshot(&self) -> RevisionSnapshot {
        RevisionSnapshot {
            id: self.id,
            content: self.content.clone(),
            author: self.author(),
            created_at: self.created_at,
        }
    }
}

impl Stamped for WikiRevision {
    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn id(&self) -> DbId {
        self.id
    }
}

/// One entry of the recent-changes feed: a revision joined with its page.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecentChange {
    pub revision_id: DbId,
    pub page_id: DbId,
    pub page_title: String,
    pub page_slug: String,
    pub description: String,
    pub author_id: Option<DbId>,
    pub author_name: Option<String>,
    pub created_at: Timestamp,
}

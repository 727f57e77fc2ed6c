//! Wiki category model and sidebar aggregates.

use folio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `wiki_categories` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct WikiCategory {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub created_at: Timestamp,
}

/// A category with the number of pages filed under it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct CategoryCount {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub page_count: i64,
}

/// A registered page owner with the number of pages they own.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct AuthorCount {
    pub author_id: DbId,
    pub author_name: String,
    pub page_count: i64,
}

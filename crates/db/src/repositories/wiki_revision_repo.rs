//! Repository for the `wiki_revisions` table.
//!
//! Revisions are append-only. Per page they are ordered by
//! `(created_at, id)`; every query here uses that ordering.

use folio_core::history::Author;
use folio_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::wiki_revision::{RecentChange, WikiRevision};
use crate::repositories::wiki_page_repo::LIVE;

/// Column list for wiki_revisions queries.
const COLUMNS: &str = "id, page_id, content, description, author_id, author_name, created_at";

/// Provides append and read operations for page revisions.
pub struct WikiRevisionRepo;

impl WikiRevisionRepo {
    /// Append a revision.
    pub async fn create(
        conn: &mut PgConnection,
        page_id: DbId,
        content: &str,
        description: &str,
        author: &Author,
    ) -> Result<WikiRevision, sqlx::Error> {
        let (author_id, author_name) = author.to_columns();
        let query = format!(
            "INSERT INTO wiki_revisions (page_id, content, description, author_id, author_name)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WikiRevision>(&query)
            .bind(page_id)
            .bind(content)
            .bind(description)
            .bind(author_id)
            .bind(author_name)
            .fetch_one(&mut *conn)
            .await
    }

    /// All revisions of a page, newest first.
    pub async fn list_by_page(
        pool: &PgPool,
        page_id: DbId,
    ) -> Result<Vec<WikiRevision>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM wiki_revisions
             WHERE page_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, WikiRevision>(&query)
            .bind(page_id)
            .fetch_all(pool)
            .await
    }

    /// A revision, only if it belongs to `page_id`.
    pub async fn find(
        pool: &PgPool,
        page_id: DbId,
        id: DbId,
    ) -> Result<Option<WikiRevision>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM wiki_revisions WHERE page_id = $1 AND id = $2");
        sqlx::query_as::<_, WikiRevision>(&query)
            .bind(page_id)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The revision of the same page immediately before `revision`.
    pub async fn find_preceding(
        pool: &PgPool,
        revision: &WikiRevision,
    ) -> Result<Option<WikiRevision>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM wiki_revisions
             WHERE page_id = $1 AND (created_at, id) < ($2, $3)
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, WikiRevision>(&query)
            .bind(revision.page_id)
            .bind(revision.created_at)
            .bind(revision.id)
            .fetch_optional(pool)
            .await
    }

    /// Newest revisions across all pages the caller may see.
    pub async fn recent_changes(
        pool: &PgPool,
        limit: i64,
        include_unpublished: bool,
    ) -> Result<Vec<RecentChange>, sqlx::Error> {
        let query = format!(
            "SELECT r.id AS revision_id, r.page_id, p.title AS page_title, p.slug AS page_slug,
                    r.description, r.author_id, r.author_name, r.created_at
             FROM wiki_revisions r
             JOIN wiki_pages p ON p.id = r.page_id
             WHERE ($1 OR {LIVE})
             ORDER BY r.created_at DESC, r.id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, RecentChange>(&query)
            .bind(include_unpublished)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

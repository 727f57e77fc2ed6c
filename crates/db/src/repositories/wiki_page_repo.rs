//! Repository for the `wiki_pages` table and its category links.
//!
//! Write methods take a `&mut PgConnection` so callers can run them inside
//! the same transaction as the revision append.

use folio_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::wiki_category::AuthorCount;
use crate::models::wiki_page::{ContentEdit, NewPage, PageFilter, WikiPage};

/// Column list for wiki_pages queries.
const COLUMNS: &str = "id, title, slug, content, status_id, privacy, tags, \
    publish_date, expiry_date, owner_id, owner_name, created_at, updated_at";

/// Same columns qualified with the `p` alias, for joins.
const P_COLUMNS: &str = "p.id, p.title, p.slug, p.content, p.status_id, p.privacy, p.tags, \
    p.publish_date, p.expiry_date, p.owner_id, p.owner_name, p.created_at, p.updated_at";

/// SQL predicate on alias `p`: published and inside the publish window.
pub(crate) const LIVE: &str = "(p.status_id = 2 \
    AND p.publish_date <= now() \
    AND (p.expiry_date IS NULL OR p.expiry_date >= now()))";

/// Provides CRUD operations for wiki pages.
pub struct WikiPageRepo;

impl WikiPageRepo {
    /// Insert a page row. The initial revision is written by the caller.
    pub async fn create(conn: &mut PgConnection, input: &NewPage) -> Result<WikiPage, sqlx::Error> {
        let (owner_id, owner_name) = input.author.to_columns();
        let query = format!(
            "INSERT INTO wiki_pages
                (title, slug, content, status_id, privacy, tags,
                 publish_date, expiry_date, owner_id, owner_name)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, now()), $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WikiPage>(&query)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.content)
            .bind(input.status.id())
            .bind(input.privacy.map(|p| p.as_str()))
            .bind(&input.tags)
            .bind(input.publish_date)
            .bind(input.expiry_date)
            .bind(owner_id)
            .bind(owner_name)
            .fetch_one(&mut *conn)
            .await
    }

    /// Find a wiki page by slug.
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<WikiPage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM wiki_pages WHERE slug = $1");
        sqlx::query_as::<_, WikiPage>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Lock a page row for update inside a transaction.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<WikiPage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM wiki_pages WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, WikiPage>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// List pages, newest publish date first.
    pub async fn list(pool: &PgPool, filter: &PageFilter) -> Result<Vec<WikiPage>, sqlx::Error> {
        let query = format!(
            "SELECT {P_COLUMNS} FROM wiki_pages p
             WHERE ($1::TEXT IS NULL OR $1 = ANY(p.tags))
               AND ($2::TEXT IS NULL OR EXISTS (
                    SELECT 1 FROM wiki_page_categories pc
                    JOIN wiki_categories c ON c.id = pc.category_id
                    WHERE pc.page_id = p.id AND c.slug = $2))
               AND ($3::TEXT IS NULL OR p.owner_name = $3)
               AND ($4 OR {LIVE})
             ORDER BY p.publish_date DESC, p.id DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, WikiPage>(&query)
            .bind(filter.tag.as_deref())
            .bind(filter.category.as_deref())
            .bind(filter.author.as_deref())
            .bind(filter.include_unpublished)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    /// Apply an edit's content and optional attributes.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        edit: &ContentEdit,
    ) -> Result<WikiPage, sqlx::Error> {
        let query = format!(
            "UPDATE wiki_pages SET
                content = $1,
                title = COALESCE($2, title),
                status_id = COALESCE($3, status_id),
                tags = COALESCE($4, tags)
             WHERE id = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WikiPage>(&query)
            .bind(&edit.content)
            .bind(edit.title.as_deref())
            .bind(edit.status.map(|s| s.id()))
            .bind(edit.tags.as_deref())
            .bind(id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Replace the page's category links.
    pub async fn set_categories(
        conn: &mut PgConnection,
        page_id: DbId,
        category_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM wiki_page_categories WHERE page_id = $1")
            .bind(page_id)
            .execute(&mut *conn)
            .await?;
        if !category_ids.is_empty() {
            sqlx::query(
                "INSERT INTO wiki_page_categories (page_id, category_id)
                 SELECT $1, UNNEST($2::BIGINT[])
                 ON CONFLICT DO NOTHING",
            )
            .bind(page_id)
            .bind(category_ids)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Most recently published live pages.
    pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<WikiPage>, sqlx::Error> {
        let query = format!(
            "SELECT {P_COLUMNS} FROM wiki_pages p
             WHERE {LIVE}
             ORDER BY p.publish_date DESC, p.id DESC
             LIMIT $1"
        );
        sqlx::query_as::<_, WikiPage>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Registered owners of live pages, with page counts.
    pub async fn list_authors(pool: &PgPool) -> Result<Vec<AuthorCount>, sqlx::Error> {
        let query = format!(
            "SELECT p.owner_id AS author_id, MAX(p.owner_name) AS author_name,
                    COUNT(*) AS page_count
             FROM wiki_pages p
             WHERE p.owner_id IS NOT NULL AND {LIVE}
             GROUP BY p.owner_id
             ORDER BY author_name ASC"
        );
        sqlx::query_as::<_, AuthorCount>(&query)
            .fetch_all(pool)
            .await
    }
}

//! Repository for the `wiki_categories` table.

use folio_core::types::DbId;
use sqlx::PgPool;

use crate::models::wiki_category::{CategoryCount, WikiCategory};
use crate::repositories::wiki_page_repo::LIVE;

/// Column list for wiki_categories queries.
const COLUMNS: &str = "id, title, slug, created_at";

/// Provides create and list operations for wiki categories.
pub struct WikiCategoryRepo;

impl WikiCategoryRepo {
    pub async fn create(pool: &PgPool, title: &str, slug: &str) -> Result<WikiCategory, sqlx::Error> {
        let query = format!(
            "INSERT INTO wiki_categories (title, slug)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WikiCategory>(&query)
            .bind(title)
            .bind(slug)
            .fetch_one(pool)
            .await
    }

    /// Categories a page is filed under, by title.
    pub async fn list_for_page(
        pool: &PgPool,
        page_id: DbId,
    ) -> Result<Vec<WikiCategory>, sqlx::Error> {
        sqlx::query_as::<_, WikiCategory>(
            "SELECT c.id, c.title, c.slug, c.created_at
             FROM wiki_categories c
             JOIN wiki_page_categories pc ON pc.category_id = c.id
             WHERE pc.page_id = $1
             ORDER BY c.title ASC",
        )
        .bind(page_id)
        .fetch_all(pool)
        .await
    }

    /// Every category with the number of live pages filed under it.
    pub async fn list_with_counts(pool: &PgPool) -> Result<Vec<CategoryCount>, sqlx::Error> {
        let query = format!(
            "SELECT c.id, c.title, c.slug, COUNT(p.id) AS page_count
             FROM wiki_categories c
             LEFT JOIN wiki_page_categories pc ON pc.category_id = c.id
             LEFT JOIN wiki_pages p ON p.id = pc.page_id AND {LIVE}
             GROUP BY c.id, c.title, c.slug
             ORDER BY c.title ASC"
        );
        sqlx::query_as::<_, CategoryCount>(&query)
            .fetch_all(pool)
            .await
    }
}

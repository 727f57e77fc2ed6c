//! The wiki store: every persistence operation the API needs, behind one
//! object-safe trait so handlers hold an `Arc<dyn WikiStore>`.
//!
//! Invariants every implementation keeps:
//!
//! - a page's `content` equals the content of its newest revision;
//! - saving unchanged content appends no revision;
//! - revisions of a page are ordered by `(created_at, id)` and never change.

use async_trait::async_trait;
use folio_core::error::CoreError;
use folio_core::history::{content_changed, Author};
use folio_core::types::DbId;
use sqlx::PgPool;

use crate::models::wiki_category::{AuthorCount, CategoryCount, WikiCategory};
use crate::models::wiki_page::{ContentEdit, NewPage, PageFilter, WikiPage};
use crate::models::wiki_revision::{RecentChange, WikiRevision};
use crate::repositories::{WikiCategoryRepo, WikiPageRepo, WikiRevisionRepo};

/// Errors raised by a [`WikiStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A page together with the revision an operation appended, if any.
#[derive(Debug, Clone)]
pub struct SavedEdit {
    pub page: WikiPage,
    pub revision: Option<WikiRevision>,
}

#[async_trait]
pub trait WikiStore: Send + Sync {
    async fn find_page(&self, slug: &str) -> StoreResult<Option<WikiPage>>;

    async fn list_pages(&self, filter: &PageFilter) -> StoreResult<Vec<WikiPage>>;

    /// Create a page and its initial revision.
    async fn create_page(&self, input: &NewPage) -> StoreResult<(WikiPage, WikiRevision)>;

    /// Update a page; append a revision only if the content changed.
    async fn save_content(&self, page_id: DbId, edit: &ContentEdit) -> StoreResult<SavedEdit>;

    /// Append a revision and make its content the page's current content.
    async fn append_revision(
        &self,
        page_id: DbId,
        content: &str,
        author: &Author,
        description: &str,
    ) -> StoreResult<WikiRevision>;

    /// Revisions of a page, newest first.
    async fn list_revisions(&self, page_id: DbId) -> StoreResult<Vec<WikiRevision>>;

    async fn get_revision(&self, page_id: DbId, id: DbId) -> StoreResult<Option<WikiRevision>>;

    /// The revision immediately before `revision` on the same page; `None`
    /// for a page's first revision.
    async fn preceding_revision(&self, revision: &WikiRevision)
        -> StoreResult<Option<WikiRevision>>;

    async fn recent_changes(
        &self,
        limit: i64,
        include_unpublished: bool,
    ) -> StoreResult<Vec<RecentChange>>;

    /// Live pages, most recently published first.
    async fn recent_pages(&self, limit: i64) -> StoreResult<Vec<WikiPage>>;

    async fn page_categories(&self, page_id: DbId) -> StoreResult<Vec<WikiCategory>>;

    async fn create_category(&self, title: &str, slug: &str) -> StoreResult<WikiCategory>;

    /// Categories with live page counts.
    async fn list_categories(&self) -> StoreResult<Vec<CategoryCount>>;

    /// Registered page owners with live page counts.
    async fn list_authors(&self) -> StoreResult<Vec<AuthorCount>>;

    async fn health_check(&self) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// [`WikiStore`] backed by Postgres through the repositories.
#[derive(Debug, Clone)]
pub struct PgWikiStore {
    pool: PgPool,
}

impl PgWikiStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn page_not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "WikiPage",
        id,
    }
}

#[async_trait]
impl WikiStore for PgWikiStore {
    async fn find_page(&self, slug: &str) -> StoreResult<Option<WikiPage>> {
        Ok(WikiPageRepo::find_by_slug(&self.pool, slug).await?)
    }

    async fn list_pages(&self, filter: &PageFilter) -> StoreResult<Vec<WikiPage>> {
        Ok(WikiPageRepo::list(&self.pool, filter).await?)
    }

    async fn create_page(&self, input: &NewPage) -> StoreResult<(WikiPage, WikiRevision)> {
        let mut tx = self.pool.begin().await?;

        let page = WikiPageRepo::create(&mut *tx, input).await?;
        if !input.category_ids.is_empty() {
            WikiPageRepo::set_categories(&mut *tx, page.id, &input.category_ids).await?;
        }
        let revision = WikiRevisionRepo::create(
            &mut *tx,
            page.id,
            &input.content,
            &input.description,
            &input.author,
        )
        .await?;

        tx.commit().await?;
        tracing::debug!(page_id = page.id, revision_id = revision.id, "Page created");
        Ok((page, revision))
    }

    async fn save_content(&self, page_id: DbId, edit: &ContentEdit) -> StoreResult<SavedEdit> {
        let mut tx = self.pool.begin().await?;

        let current = WikiPageRepo::find_for_update(&mut *tx, page_id)
            .await?
            .ok_or_else(|| page_not_found(page_id))?;
        let page = WikiPageRepo::update(&mut *tx, page_id, edit).await?;
        if let Some(ids) = &edit.category_ids {
            WikiPageRepo::set_categories(&mut *tx, page_id, ids).await?;
        }

        let revision = if content_changed(&current.content, &edit.content) {
            Some(
                WikiRevisionRepo::create(
                    &mut *tx,
                    page_id,
                    &edit.content,
                    &edit.description,
                    &edit.author,
                )
                .await?,
            )
        } else {
            None
        };

        tx.commit().await?;
        Ok(SavedEdit { page, revision })
    }

    async fn append_revision(
        &self,
        page_id: DbId,
        content: &str,
        author: &Author,
        description: &str,
    ) -> StoreResult<WikiRevision> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE wiki_pages SET content = $1 WHERE id = $2")
            .bind(content)
            .bind(page_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(page_not_found(page_id).into());
        }
        let revision =
            WikiRevisionRepo::create(&mut *tx, page_id, content, description, author).await?;

        tx.commit().await?;
        Ok(revision)
    }

    async fn list_revisions(&self, page_id: DbId) -> StoreResult<Vec<WikiRevision>> {
        Ok(WikiRevisionRepo::list_by_page(&self.pool, page_id).await?)
    }

    async fn get_revision(&self, page_id: DbId, id: DbId) -> StoreResult<Option<WikiRevision>> {
        Ok(WikiRevisionRepo::find(&self.pool, page_id, id).await?)
    }

    async fn preceding_revision(
        &self,
        revision: &WikiRevision,
    ) -> StoreResult<Option<WikiRevision>> {
        Ok(WikiRevisionRepo::find_preceding(&self.pool, revision).await?)
    }

    async fn recent_changes(
        &self,
        limit: i64,
        include_unpublished: bool,
    ) -> StoreResult<Vec<RecentChange>> {
        Ok(WikiRevisionRepo::recent_changes(&self.pool, limit, include_unpublished).await?)
    }

    async fn recent_pages(&self, limit: i64) -> StoreResult<Vec<WikiPage>> {
        Ok(WikiPageRepo::recent(&self.pool, limit).await?)
    }

    async fn page_categories(&self, page_id: DbId) -> StoreResult<Vec<WikiCategory>> {
        Ok(WikiCategoryRepo::list_for_page(&self.pool, page_id).await?)
    }

    async fn create_category(&self, title: &str, slug: &str) -> StoreResult<WikiCategory> {
        Ok(WikiCategoryRepo::create(&self.pool, title, slug).await?)
    }

    async fn list_categories(&self) -> StoreResult<Vec<CategoryCount>> {
        Ok(WikiCategoryRepo::list_with_counts(&self.pool).await?)
    }

    async fn list_authors(&self) -> StoreResult<Vec<AuthorCount>> {
        Ok(WikiPageRepo::list_authors(&self.pool).await?)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

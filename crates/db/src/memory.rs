//! In-process [`WikiStore`] used when no database is configured and by
//! the test suites.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use folio_core::error::CoreError;
use folio_core::history::{content_changed, select_preceding, sort_newest_first, Author};
use folio_core::types::{DbId, Timestamp};
use tokio::sync::RwLock;

use crate::models::wiki_category::{AuthorCount, CategoryCount, WikiCategory};
use crate::models::wiki_page::{ContentEdit, NewPage, PageFilter, WikiPage};
use crate::models::wiki_revision::{RecentChange, WikiRevision};
use crate::store::{SavedEdit, StoreResult, WikiStore};

#[derive(Debug, Default)]
struct Inner {
    pages: Vec<WikiPage>,
    revisions: Vec<WikiRevision>,
    categories: Vec<WikiCategory>,
    /// `(page_id, category_id)`
    page_categories: Vec<(DbId, DbId)>,
    next_page_id: DbId,
    next_revision_id: DbId,
    next_category_id: DbId,
}

impl Inner {
    fn page_index(&self, page_id: DbId) -> Result<usize, CoreError> {
        self.pages
            .iter()
            .position(|p| p.id == page_id)
            .ok_or(CoreError::NotFound {
                entity: "WikiPage",
                id: page_id,
            })
    }

    fn push_revision(
        &mut self,
        page_id: DbId,
        content: &str,
        description: &str,
        author: &Author,
        now: Timestamp,
    ) -> WikiRevision {
        self.next_revision_id += 1;
        let (author_id, author_name) = author.to_columns();
        let revision = WikiRevision {
            id: self.next_revision_id,
            page_id,
            content: content.to_string(),
            description: description.to_string(),
            author_id,
            author_name: author_name.map(str::to_string),
            created_at: now,
        };
        self.revisions.push(revision.clone());
        revision
    }

    fn set_categories(&mut self, page_id: DbId, category_ids: &[DbId]) {
        self.page_categories.retain(|(p, _)| *p != page_id);
        for id in category_ids {
            let known = self.categories.iter().any(|c| c.id == *id);
            if known && !self.page_categories.contains(&(page_id, *id)) {
                self.page_categories.push((page_id, *id));
            }
        }
    }

    fn category_slug_matches(&self, page_id: DbId, slug: &str) -> bool {
        self.page_categories.iter().any(|(p, c)| {
            *p == page_id
                && self
                    .categories
                    .iter()
                    .any(|cat| cat.id == *c && cat.slug == slug)
        })
    }
}

fn is_live(page: &WikiPage, now: Timestamp) -> bool {
    page.publication().is_ok_and(|p| p.is_live(now))
}

fn newest_published_first(pages: &mut [WikiPage]) {
    pages.sort_by(|a, b| (b.publish_date, b.id).cmp(&(a.publish_date, a.id)));
}

/// A [`WikiStore`] holding everything in memory behind a `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryWikiStore {
    inner: RwLock<Inner>,
}

impl MemoryWikiStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WikiStore for MemoryWikiStore {
    async fn find_page(&self, slug: &str) -> StoreResult<Option<WikiPage>> {
        let inner = self.inner.read().await;
        Ok(inner.pages.iter().find(|p| p.slug == slug).cloned())
    }

    async fn list_pages(&self, filter: &PageFilter) -> StoreResult<Vec<WikiPage>> {
        let inner = self.inner.read().await;
        let now = Utc::now();
        let mut pages: Vec<WikiPage> = inner
            .pages
            .iter()
            .filter(|p| filter.include_unpublished || is_live(p, now))
            .filter(|p| filter.tag.as_ref().is_none_or(|t| p.tags.contains(t)))
            .filter(|p| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|slug| inner.category_slug_matches(p.id, slug))
            })
            .filter(|p| {
                filter
                    .author
                    .as_deref()
                    .is_none_or(|name| p.owner_name.as_deref() == Some(name))
            })
            .cloned()
            .collect();
        newest_published_first(&mut pages);

        let offset = usize::try_from(filter.offset).unwrap_or(0);
        let limit = usize::try_from(filter.limit).unwrap_or(0);
        Ok(pages.into_iter().skip(offset).take(limit).collect())
    }

    async fn create_page(&self, input: &NewPage) -> StoreResult<(WikiPage, WikiRevision)> {
        let mut inner = self.inner.write().await;
        if inner.pages.iter().any(|p| p.slug == input.slug) {
            return Err(CoreError::Conflict(format!(
                "A page with slug '{}' already exists",
                input.slug
            ))
            .into());
        }

        let now = Utc::now();
        inner.next_page_id += 1;
        let (owner_id, owner_name) = input.author.to_columns();
        let page = WikiPage {
            id: inner.next_page_id,
            title: input.title.clone(),
            slug: input.slug.clone(),
            content: input.content.clone(),
            status_id: input.status.id(),
            privacy: input.privacy.map(|p| p.as_str().to_string()),
            tags: input.tags.clone(),
            publish_date: input.publish_date.unwrap_or(now),
            expiry_date: input.expiry_date,
            owner_id,
            owner_name: owner_name.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        inner.pages.push(page.clone());
        inner.set_categories(page.id, &input.category_ids);
        let revision =
            inner.push_revision(page.id, &input.content, &input.description, &input.author, now);
        Ok((page, revision))
    }

    async fn save_content(&self, page_id: DbId, edit: &ContentEdit) -> StoreResult<SavedEdit> {
        let mut inner = self.inner.write().await;
        let index = inner.page_index(page_id)?;
        let now = Utc::now();

        let changed = content_changed(&inner.pages[index].content, &edit.content);
        let page = &mut inner.pages[index];
        page.content = edit.content.clone();
        if let Some(title) = &edit.title {
            page.title = title.clone();
        }
        if let Some(status) = edit.status {
            page.status_id = status.id();
        }
        if let Some(tags) = &edit.tags {
            page.tags = tags.clone();
        }
        page.updated_at = now;
        let page = page.clone();

        if let Some(ids) = &edit.category_ids {
            inner.set_categories(page_id, ids);
        }
        let revision = changed.then(|| {
            inner.push_revision(page_id, &edit.content, &edit.description, &edit.author, now)
        });
        Ok(SavedEdit { page, revision })
    }

    async fn append_revision(
        &self,
        page_id: DbId,
        content: &str,
        author: &Author,
        description: &str,
    ) -> StoreResult<WikiRevision> {
        let mut inner = self.inner.write().await;
        let index = inner.page_index(page_id)?;
        let now = Utc::now();
        inner.pages[index].content = content.to_string();
        inner.pages[index].updated_at = now;
        Ok(inner.push_revision(page_id, content, description, author, now))
    }

    async fn list_revisions(&self, page_id: DbId) -> StoreResult<Vec<WikiRevision>> {
        let inner = self.inner.read().await;
        let mut revisions: Vec<WikiRevision> = inner
            .revisions
            .iter()
            .filter(|r| r.page_id == page_id)
            .cloned()
            .collect();
        sort_newest_first(&mut revisions);
        Ok(revisions)
    }

    async fn get_revision(&self, page_id: DbId, id: DbId) -> StoreResult<Option<WikiRevision>> {
        let inner = self.inner.read().await;
        Ok(inner
            .revisions
            .iter()
            .find(|r| r.page_id == page_id && r.id == id)
            .cloned())
    }

    async fn preceding_revision(
        &self,
        revision: &WikiRevision,
    ) -> StoreResult<Option<WikiRevision>> {
        let inner = self.inner.read().await;
        let same_page: Vec<WikiRevision> = inner
            .revisions
            .iter()
            .filter(|r| r.page_id == revision.page_id)
            .cloned()
            .collect();
        Ok(select_preceding(&same_page, revision).cloned())
    }

    async fn recent_changes(
        &self,
        limit: i64,
        include_unpublished: bool,
    ) -> StoreResult<Vec<RecentChange>> {
        let inner = self.inner.read().await;
        let now = Utc::now();
        let pages: BTreeMap<DbId, &WikiPage> = inner
            .pages
            .iter()
            .filter(|p| include_unpublished || is_live(p, now))
            .map(|p| (p.id, p))
            .collect();

        let mut revisions: Vec<&WikiRevision> = inner
            .revisions
            .iter()
            .filter(|r| pages.contains_key(&r.page_id))
            .collect();
        revisions.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(revisions
            .into_iter()
            .take(limit)
            .filter_map(|r| {
                let page = pages.get(&r.page_id)?;
                Some(RecentChange {
                    revision_id: r.id,
                    page_id: page.id,
                    page_title: page.title.clone(),
                    page_slug: page.slug.clone(),
                    description: r.description.clone(),
                    author_id: r.author_id,
                    author_name: r.author_name.clone(),
                    created_at: r.created_at,
                })
            })
            .collect())
    }

    async fn recent_pages(&self, limit: i64) -> StoreResult<Vec<WikiPage>> {
        let inner = self.inner.read().await;
        let now = Utc::now();
        let mut pages: Vec<WikiPage> = inner
            .pages
            .iter()
            .filter(|p| is_live(p, now))
            .cloned()
            .collect();
        newest_published_first(&mut pages);
        pages.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(pages)
    }

    async fn page_categories(&self, page_id: DbId) -> StoreResult<Vec<WikiCategory>> {
        let inner = self.inner.read().await;
        let mut categories: Vec<WikiCategory> = inner
            .categories
            .iter()
            .filter(|c| inner.page_categories.contains(&(page_id, c.id)))
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(categories)
    }

    async fn create_category(&self, title: &str, slug: &str) -> StoreResult<WikiCategory> {
        let mut inner = self.inner.write().await;
        if inner.categories.iter().any(|c| c.slug == slug) {
            return Err(
                CoreError::Conflict(format!("A category with slug '{slug}' already exists")).into(),
            );
        }
        inner.next_category_id += 1;
        let category = WikiCategory {
            id: inner.next_category_id,
            title: title.to_string(),
            slug: slug.to_string(),
            created_at: Utc::now(),
        };
        inner.categories.push(category.clone());
        Ok(category)
    }

    async fn list_categories(&self) -> StoreResult<Vec<CategoryCount>> {
        let inner = self.inner.read().await;
        let now = Utc::now();
        let mut counts: Vec<CategoryCount> = inner
            .categories
            .iter()
            .map(|c| {
                let page_count = inner
                    .page_categories
                    .iter()
                    .filter(|(page_id, cat_id)| {
                        *cat_id == c.id
                            && inner
                                .pages
                                .iter()
                                .any(|p| p.id == *page_id && is_live(p, now))
                    })
                    .count();
                CategoryCount {
                    id: c.id,
                    title: c.title.clone(),
                    slug: c.slug.clone(),
                    page_count: i64::try_from(page_count).unwrap_or(i64::MAX),
                }
            })
            .collect();
        counts.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(counts)
    }

    async fn list_authors(&self) -> StoreResult<Vec<AuthorCount>> {
        let inner = self.inner.read().await;
        let now = Utc::now();
        let mut by_owner: BTreeMap<DbId, AuthorCount> = BTreeMap::new();
        for page in inner.pages.iter().filter(|p| is_live(p, now)) {
            if let Author::User { id, username } = page.owner() {
                by_owner
                    .entry(id)
                    .or_insert_with(|| AuthorCount {
                        author_id: id,
                        author_name: username,
                        page_count: 0,
                    })
                    .page_count += 1;
            }
        }
        let mut authors: Vec<AuthorCount> = by_owner.into_values().collect();
        authors.sort_by(|a, b| a.author_name.cmp(&b.author_name));
        Ok(authors)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

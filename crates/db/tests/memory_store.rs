//! Integration tests for the in-memory wiki store.
//!
//! Exercises the `WikiStore` contract the API relies on:
//! - Page creation records the initial revision
//! - Unchanged content appends no revision
//! - Revision ordering and predecessor lookup
//! - Publication filtering in listings and feeds

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use folio_core::error::CoreError;
use folio_core::history::Author;
use folio_core::wiki::PageStatus;
use folio_db::models::wiki_page::{ContentEdit, NewPage, PageFilter};
use folio_db::{MemoryWikiStore, StoreError, WikiStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ada() -> Author {
    Author::user(1, "ada")
}

fn new_page(slug: &str, content: &str) -> NewPage {
    NewPage::new(slug.replace('_', " "), slug, content, ada())
}

fn all_pages() -> PageFilter {
    PageFilter {
        include_unpublished: true,
        limit: 100,
        ..PageFilter::default()
    }
}

fn live_pages() -> PageFilter {
    PageFilter {
        limit: 100,
        ..PageFilter::default()
    }
}

// ---------------------------------------------------------------------------
// Pages and revisions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_page_records_initial_revision() {
    let store = MemoryWikiStore::new();
    let (page, revision) = store.create_page(&new_page("Main_page", "Hello")).await.unwrap();

    assert_eq!(page.content, "Hello");
    assert_eq!(revision.page_id, page.id);
    assert_eq!(revision.content, "Hello");
    assert_eq!(revision.author(), ada());

    let found = store.find_page("Main_page").await.unwrap().unwrap();
    assert_eq!(found.id, page.id);
    assert_eq!(store.list_revisions(page.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_slug_is_a_conflict() {
    let store = MemoryWikiStore::new();
    store.create_page(&new_page("Dup", "a")).await.unwrap();
    let err = store.create_page(&new_page("Dup", "b")).await.unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Conflict(_)));
}

#[tokio::test]
async fn unchanged_content_appends_no_revision() {
    let store = MemoryWikiStore::new();
    let (page, _) = store.create_page(&new_page("Same", "text")).await.unwrap();

    let mut edit = ContentEdit::new("text", "retitle only", ada());
    edit.title = Some("Same page".into());
    let saved = store.save_content(page.id, &edit).await.unwrap();

    assert!(saved.revision.is_none());
    assert_eq!(saved.page.title, "Same page");
    assert_eq!(store.list_revisions(page.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn changed_content_appends_revision_and_updates_page() {
    let store = MemoryWikiStore::new();
    let (page, _) = store.create_page(&new_page("Edit", "v1")).await.unwrap();

    let saved = store
        .save_content(page.id, &ContentEdit::new("v2", "second", Author::Anonymous))
        .await
        .unwrap();

    let revision = saved.revision.expect("content changed");
    assert_eq!(revision.content, "v2");
    assert_eq!(revision.description, "second");
    assert_eq!(revision.author(), Author::Anonymous);
    assert_eq!(saved.page.content, "v2");
}

#[tokio::test]
async fn save_to_missing_page_is_not_found() {
    let store = MemoryWikiStore::new();
    let err = store
        .save_content(42, &ContentEdit::new("x", "", ada()))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::NotFound { id: 42, .. }));
}

#[tokio::test]
async fn revisions_newest_first_and_preceding() {
    let store = MemoryWikiStore::new();
    let (page, first) = store.create_page(&new_page("Hist", "")).await.unwrap();
    let second = store
        .append_revision(page.id, "Hello", &ada(), "")
        .await
        .unwrap();
    let third = store
        .append_revision(page.id, "Hello World", &ada(), "")
        .await
        .unwrap();

    let ids: Vec<_> = store
        .list_revisions(page.id)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);

    let prev = store.preceding_revision(&third).await.unwrap().unwrap();
    assert_eq!(prev.id, second.id);
    assert!(store.preceding_revision(&first).await.unwrap().is_none());

    let current = store.find_page("Hist").await.unwrap().unwrap();
    assert_eq!(current.content, "Hello World");
}

#[tokio::test]
async fn get_revision_is_scoped_to_page() {
    let store = MemoryWikiStore::new();
    let (a, rev_a) = store.create_page(&new_page("A", "a")).await.unwrap();
    let (b, _) = store.create_page(&new_page("B", "b")).await.unwrap();

    assert!(store.get_revision(a.id, rev_a.id).await.unwrap().is_some());
    assert!(store.get_revision(b.id, rev_a.id).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listings_hide_drafts_and_unpublished_pages() {
    let store = MemoryWikiStore::new();
    store.create_page(&new_page("Live", "x")).await.unwrap();

    let mut draft = new_page("Draft", "x");
    draft.status = PageStatus::Draft;
    store.create_page(&draft).await.unwrap();

    let mut future = new_page("Future", "x");
    future.publish_date = Some(Utc::now() + Duration::days(1));
    store.create_page(&future).await.unwrap();

    let live = store.list_pages(&live_pages()).await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].slug, "Live");

    assert_eq!(store.list_pages(&all_pages()).await.unwrap().len(), 3);
    assert_eq!(store.recent_pages(10).await.unwrap().len(), 1);
    assert_eq!(store.recent_changes(10, false).await.unwrap().len(), 1);
    assert_eq!(store.recent_changes(10, true).await.unwrap().len(), 3);
}

#[tokio::test]
async fn list_filters_by_tag_category_and_author() {
    let store = MemoryWikiStore::new();
    let rust = store.create_category("Rust", "Rust").await.unwrap();

    let mut tagged = new_page("Tagged", "x");
    tagged.tags = vec!["lang".into()];
    tagged.category_ids = vec![rust.id];
    store.create_page(&tagged).await.unwrap();

    let mut other = new_page("Other", "x");
    other.author = Author::user(2, "grace");
    store.create_page(&other).await.unwrap();

    let by_tag = store
        .list_pages(&PageFilter {
            tag: Some("lang".into()),
            ..live_pages()
        })
        .await
        .unwrap();
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].slug, "Tagged");

    let by_category = store
        .list_pages(&PageFilter {
            category: Some("Rust".into()),
            ..live_pages()
        })
        .await
        .unwrap();
    assert_eq!(by_category.len(), 1);

    let by_author = store
        .list_pages(&PageFilter {
            author: Some("grace".into()),
            ..live_pages()
        })
        .await
        .unwrap();
    assert_eq!(by_author.len(), 1);
    assert_eq!(by_author[0].slug, "Other");
}

#[tokio::test]
async fn list_paginates() {
    let store = MemoryWikiStore::new();
    for i in 0..5 {
        store
            .create_page(&new_page(&format!("P{i}"), "x"))
            .await
            .unwrap();
    }
    let page = store
        .list_pages(&PageFilter {
            limit: 2,
            offset: 4,
            ..PageFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn category_and_author_counts() {
    let store = MemoryWikiStore::new();
    let docs = store.create_category("Docs", "Docs").await.unwrap();
    store.create_category("Empty", "Empty").await.unwrap();

    let mut page = new_page("Guide", "x");
    page.category_ids = vec![docs.id];
    store.create_page(&page).await.unwrap();

    let mut anon = new_page("Anon", "x");
    anon.author = Author::Anonymous;
    store.create_page(&anon).await.unwrap();

    let categories = store.list_categories().await.unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].slug, "Docs");
    assert_eq!(categories[0].page_count, 1);
    assert_eq!(categories[1].page_count, 0);

    let authors = store.list_authors().await.unwrap();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].author_name, "ada");
    assert_eq!(authors[0].page_count, 1);

    let filed = store.page_categories(1).await.unwrap();
    assert_eq!(filed, vec![docs]);
}

#[tokio::test]
async fn duplicate_category_slug_is_a_conflict() {
    let store = MemoryWikiStore::new();
    store.create_category("Docs", "Docs").await.unwrap();
    let err = store.create_category("Docs again", "Docs").await.unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Conflict(_)));
}

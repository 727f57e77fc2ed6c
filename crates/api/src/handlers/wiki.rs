//! Handlers for wiki pages: detail, edit, creation, history, diff, revert,
//! and undo.
//!
//! Every `{slug}` route first redirects non-canonical slugs to their
//! canonical URL. A page that does not exist (or that the viewer may not see
//! yet) folds into the edit flow: the handler redirects to `/edit`.
//!
//! Undo is the interesting one. The inverse of the chosen revision's change
//! is applied as a fuzzy patch to the page's *current* content; if any hunk
//! fails, nothing is saved and the client is sent to the diff view with
//! `undo=error`.

use axum::extract::{Path, Query, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use folio_core::error::CoreError;
use folio_core::history::Author;
use folio_core::privacy::{is_visible, Policy, PrivacyLevel, Viewer};
use folio_core::types::{DbId, Timestamp};
use folio_core::undo::{
    diff_view, plan_revert, plan_undo, undo_summary, DiffFragment, EditDraft, UndoConflict,
    UndoOutcome,
};
use folio_core::wiki::{
    canonical_slug, deurlize_title, page_offset, urlize_title, validate_content,
    validate_description, validate_slug, validate_tags, validate_title, PageStatus,
};
use folio_db::models::wiki_category::WikiCategory;
use folio_db::models::wiki_page::{ContentEdit, NewPage, PageFilter, WikiPage};
use folio_db::models::wiki_revision::WikiRevision;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentViewer;
use crate::query::{DiffParams, PageListParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Mount point of the page routes.
pub const PAGES_PATH: &str = "/api/v1/wiki/pages";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /pages`.
#[derive(Debug, Deserialize)]
pub struct CreatePageRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<PageStatus>,
    /// Only moderators may set a per-page privacy override.
    pub privacy: Option<PrivacyLevel>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category_ids: Vec<DbId>,
    pub publish_date: Option<Timestamp>,
    pub expiry_date: Option<Timestamp>,
}

/// Body of `POST /pages/{slug}/edit`.
#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub content: String,
    #[serde(default)]
    pub description: String,
    pub title: Option<String>,
    pub status: Option<PageStatus>,
    pub tags: Option<Vec<String>>,
    pub category_ids: Option<Vec<DbId>>,
}

/// Body of `POST` on revert and undo. Omitted fields fall back to the
/// freshly computed draft.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DraftSubmission {
    pub content: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PageList {
    pub pages: Vec<WikiPage>,
    pub page: i64,
    pub per_page: i64,
    pub has_next: bool,
}

#[derive(Debug, Serialize)]
pub struct PageDetail {
    pub page: WikiPage,
    pub html: String,
    pub categories: Vec<WikiCategory>,
    pub owner: Author,
    pub can_edit: bool,
}

#[derive(Debug, Serialize)]
pub struct EditForm {
    pub slug: String,
    pub title: String,
    pub content: String,
    /// The page does not exist yet; saving creates it.
    pub is_initial: bool,
    pub page: Option<WikiPage>,
}

#[derive(Debug, Serialize)]
pub struct PageHistory {
    pub page: WikiPage,
    pub revisions: Vec<WikiRevision>,
}

#[derive(Debug, Serialize)]
pub struct RevisionDetail {
    pub page: WikiPage,
    pub revision: WikiRevision,
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct RevisionDiff {
    pub page_id: DbId,
    pub slug: String,
    /// `None` compares against the empty page before the first revision.
    pub from_revision: Option<WikiRevision>,
    pub to_revision: WikiRevision,
    pub fragments: Vec<DiffFragment>,
    pub undo_error: bool,
}

/// A revert or undo ready to be reviewed and saved.
#[derive(Debug, Serialize)]
pub struct DraftForm {
    pub page: WikiPage,
    pub source_revision: WikiRevision,
    pub draft: EditDraft,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// URL of a page route, e.g. `page_url("Main_page", "/history")`.
pub fn page_url(slug: &str, suffix: &str) -> String {
    format!("{PAGES_PATH}/{slug}{suffix}")
}

/// Redirect to the canonical form of `slug`, keeping the query string, or
/// `None` if `slug` is already canonical.
fn canonical_redirect(slug: &str, suffix: &str, query: Option<&str>) -> Option<Response> {
    let canonical = canonical_slug(slug)?;
    let mut location = page_url(&canonical, suffix);
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        location.push('?');
        location.push_str(q);
    }
    tracing::debug!(from = %slug, to = %location, "Redirecting to canonical slug");
    Some(Redirect::to(&location).into_response())
}

fn edit_redirect(slug: &str) -> Response {
    Redirect::to(&page_url(slug, "/edit")).into_response()
}

fn forbidden(message: &str) -> AppError {
    AppError::Core(CoreError::Forbidden(message.to_string()))
}

/// Stored attributes that fail to decode are a server fault, not the
/// client's.
fn stored(err: CoreError) -> AppError {
    AppError::InternalError(format!("Corrupt wiki page row: {err}"))
}

fn page_policy(state: &AppState, page: &WikiPage) -> AppResult<Policy> {
    let privacy = page.privacy_level().map_err(stored)?;
    Ok(state.config.wiki.policy(privacy))
}

/// Look up a page the viewer may see.
///
/// `Ok(None)` means the caller should treat the page as missing: it does
/// not exist, or it is outside its publish window for this viewer. Drafts
/// the viewer cannot edit and pages the viewer may not view are 403.
async fn visible_page(state: &AppState, viewer: &Viewer, slug: &str) -> AppResult<Option<WikiPage>> {
    let Some(page) = state.store.find_page(slug).await? else {
        return Ok(None);
    };

    let policy = page_policy(state, &page)?;
    if !policy.can_view(viewer) {
        return Err(forbidden("You don't have permission to view this wiki page."));
    }

    let publication = page.publication().map_err(stored)?;
    if publication.status == PageStatus::Draft && !policy.can_edit(viewer) {
        return Err(forbidden("You don't have permission to view this wiki page."));
    }
    if !is_visible(viewer, &publication, Utc::now()) {
        return Ok(None);
    }
    Ok(Some(page))
}

fn ensure_can_edit(state: &AppState, viewer: &Viewer, page: &WikiPage) -> AppResult<()> {
    if page_policy(state, page)?.can_edit(viewer) {
        Ok(())
    } else {
        Err(forbidden("You don't have permission to edit this wiki page."))
    }
}

async fn find_revision(state: &AppState, page: &WikiPage, id: DbId) -> AppResult<WikiRevision> {
    state
        .store
        .get_revision(page.id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "WikiRevision",
            id,
        }))
}

fn validate_publish_window(
    publish_date: Option<Timestamp>,
    expiry_date: Option<Timestamp>,
) -> Result<(), CoreError> {
    let publish = publish_date.unwrap_or_else(Utc::now);
    match expiry_date {
        Some(expiry) if expiry <= publish => Err(CoreError::Validation(
            "Expiry date must be after the publish date".into(),
        )),
        _ => Ok(()),
    }
}

/// Save a revert/undo draft through the normal edit path and redirect to
/// the page.
async fn save_draft(
    state: &AppState,
    viewer: &Viewer,
    page: &WikiPage,
    draft: EditDraft,
    action: &'static str,
) -> AppResult<Response> {
    validate_content(&draft.content)?;
    validate_description(&draft.description)?;

    let edit = ContentEdit::new(draft.content, draft.description, viewer.as_author());
    let saved = state.store.save_content(page.id, &edit).await?;

    tracing::info!(
        page_id = page.id,
        slug = %page.slug,
        revision_id = ?saved.revision.as_ref().map(|r| r.id),
        action,
        "Wiki page draft saved"
    );

    Ok(Redirect::to(&page_url(&page.slug, "")).into_response())
}

/// Redirect for an undo whose patch did not apply.
fn undo_conflict_redirect(slug: &str, conflict: &UndoConflict) -> Response {
    let mut query = String::new();
    if let Some(from) = conflict.from_revision_id {
        query.push_str(&format!("from_revision_pk={from}&"));
    }
    query.push_str(&format!(
        "to_revision_pk={}&undo=error",
        conflict.to_revision_id
    ));

    tracing::warn!(
        slug = %slug,
        to_revision_id = conflict.to_revision_id,
        failed_hunks = conflict.failed_hunks,
        "Undo conflict, redirecting to diff view"
    );

    Redirect::to(&format!("{}?{query}", page_url(slug, "/diff"))).into_response()
}

/// Compute the undo of `target` against the page's current content.
async fn compute_undo(
    state: &AppState,
    page: &WikiPage,
    target: &WikiRevision,
) -> AppResult<UndoOutcome> {
    let preceding = state.store.preceding_revision(target).await?;
    let preceding = preceding.as_ref().map(WikiRevision::snapshot);
    Ok(plan_undo(
        &target.snapshot(),
        preceding.as_ref(),
        &page.content,
        &state.patch_engine,
    ))
}

// ---------------------------------------------------------------------------
// Index and list
// ---------------------------------------------------------------------------

/// GET /wiki
///
/// Redirect to the default page, or to the page list on a closed wiki.
pub async fn wiki_index(State(state): State<AppState>) -> Response {
    let settings = &state.config.wiki;
    if settings.default_privacy == PrivacyLevel::Closed {
        return Redirect::to(PAGES_PATH).into_response();
    }
    Redirect::to(&page_url(&settings.default_index, "")).into_response()
}

/// GET /wiki/pages?tag=&category=&author=&page=
///
/// Published pages (drafts too for moderators), newest first.
pub async fn list_pages(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Query(params): Query<PageListParams>,
) -> AppResult<impl IntoResponse> {
    let settings = &state.config.wiki;
    if !settings.wiki_policy().can_view(&viewer) {
        return Err(forbidden("You don't have permission to view this wiki."));
    }

    let per_page = settings.pages_per_page;
    let filter = PageFilter {
        tag: params.tag,
        category: params.category,
        author: params.author,
        include_unpublished: viewer.is_moderator(),
        limit: per_page + 1,
        offset: page_offset(params.page, per_page),
    };

    let mut pages = state.store.list_pages(&filter).await?;
    let has_next = pages.len() as i64 > per_page;
    pages.truncate(per_page as usize);

    let mut visible = Vec::with_capacity(pages.len());
    for page in pages {
        if page_policy(&state, &page)?.can_view(&viewer) {
            visible.push(page);
        }
    }

    Ok(Json(DataResponse {
        data: PageList {
            pages: visible,
            page: params.page.unwrap_or(1).max(1),
            per_page,
            has_next,
        },
    }))
}

/// POST /wiki/pages
///
/// Create a page from a title. The slug is the title with whitespace runs
/// replaced by underscores.
pub async fn create_page(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Json(input): Json<CreatePageRequest>,
) -> AppResult<impl IntoResponse> {
    if !state.config.wiki.wiki_policy().can_create(&viewer) {
        return Err(forbidden("You don't have permission to create wiki page."));
    }
    if input.privacy.is_some() && !viewer.is_moderator() {
        return Err(forbidden("Only moderators may set page privacy."));
    }

    let title = input.title.trim().to_string();
    validate_title(&title)?;
    let slug = urlize_title(&title);
    validate_slug(&slug)?;
    validate_content(&input.content)?;
    validate_description(&input.description)?;
    validate_tags(&input.tags)?;
    validate_publish_window(input.publish_date, input.expiry_date)?;

    if state.store.find_page(&slug).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "A page with slug '{slug}' already exists"
        ))));
    }

    let new_page = NewPage {
        title,
        slug,
        content: input.content,
        description: input.description,
        status: input.status.unwrap_or(PageStatus::Published),
        privacy: input.privacy,
        tags: input.tags,
        category_ids: input.category_ids,
        publish_date: input.publish_date,
        expiry_date: input.expiry_date,
        author: viewer.as_author(),
    };
    let (page, revision) = state.store.create_page(&new_page).await?;

    tracing::info!(
        page_id = page.id,
        revision_id = revision.id,
        slug = %page.slug,
        author = ?new_page.author.username(),
        "Wiki page created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: page })))
}

// ---------------------------------------------------------------------------
// Detail and edit
// ---------------------------------------------------------------------------

/// GET /wiki/pages/{slug}
///
/// Page with its rendered body. A missing page redirects to the edit form
/// when the viewer may create pages, 403 otherwise.
pub async fn get_page(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    if let Some(redirect) = canonical_redirect(&slug, "", query.as_deref()) {
        return Ok(redirect);
    }

    let Some(page) = visible_page(&state, &viewer, &slug).await? else {
        if state.config.wiki.wiki_policy().can_create(&viewer) {
            return Ok(edit_redirect(&slug));
        }
        return Err(forbidden("You don't have permission to add new wiki page."));
    };

    let html = state.renderer.render(&page.content);
    let categories = state.store.page_categories(page.id).await?;
    let can_edit = page_policy(&state, &page)?.can_edit(&viewer);
    let owner = page.owner();

    Ok(Json(DataResponse {
        data: PageDetail {
            page,
            html,
            categories,
            owner,
            can_edit,
        },
    })
    .into_response())
}

/// GET /wiki/pages/{slug}/edit
///
/// Edit form contents. For a missing page, a blank form titled after the
/// slug.
pub async fn edit_form(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    if let Some(redirect) = canonical_redirect(&slug, "/edit", query.as_deref()) {
        return Ok(redirect);
    }

    let form = match state.store.find_page(&slug).await? {
        Some(page) => {
            ensure_can_edit(&state, &viewer, &page)?;
            EditForm {
                slug: page.slug.clone(),
                title: page.title.clone(),
                content: page.content.clone(),
                is_initial: false,
                page: Some(page),
            }
        }
        None => {
            if !state.config.wiki.wiki_policy().can_create(&viewer) {
                return Err(forbidden("You don't have permission to edit this wiki page."));
            }
            validate_slug(&slug)?;
            EditForm {
                title: deurlize_title(&slug),
                slug,
                content: String::new(),
                is_initial: true,
                page: None,
            }
        }
    };

    Ok(Json(DataResponse { data: form }).into_response())
}

/// POST /wiki/pages/{slug}/edit
///
/// Save an edit, creating the page if it does not exist. A revision is
/// recorded only when the content changed. Redirects to the page.
pub async fn save_edit(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RawQuery(query): RawQuery,
    Json(input): Json<EditRequest>,
) -> AppResult<Response> {
    if let Some(redirect) = canonical_redirect(&slug, "/edit", query.as_deref()) {
        return Ok(redirect);
    }

    validate_content(&input.content)?;
    validate_description(&input.description)?;
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    if let Some(tags) = &input.tags {
        validate_tags(tags)?;
    }

    match state.store.find_page(&slug).await? {
        Some(page) => {
            ensure_can_edit(&state, &viewer, &page)?;
            let edit = ContentEdit {
                content: input.content,
                description: input.description,
                author: viewer.as_author(),
                title: input.title.map(|t| t.trim().to_string()),
                status: input.status,
                tags: input.tags,
                category_ids: input.category_ids,
            };
            let saved = state.store.save_content(page.id, &edit).await?;
            tracing::info!(
                page_id = page.id,
                slug = %slug,
                revision_id = ?saved.revision.as_ref().map(|r| r.id),
                "Wiki page edited"
            );
        }
        None => {
            if !state.config.wiki.wiki_policy().can_create(&viewer) {
                return Err(forbidden("You don't have permission to edit this wiki page."));
            }
            validate_slug(&slug)?;
            let title = input
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| deurlize_title(&slug));
            validate_title(&title)?;

            let mut new_page = NewPage::new(title, slug.clone(), input.content, viewer.as_author());
            new_page.description = input.description;
            new_page.status = input.status.unwrap_or(PageStatus::Published);
            new_page.tags = input.tags.unwrap_or_default();
            new_page.category_ids = input.category_ids.unwrap_or_default();

            let (page, revision) = state.store.create_page(&new_page).await?;
            tracing::info!(
                page_id = page.id,
                revision_id = revision.id,
                slug = %slug,
                "Wiki page created from edit"
            );
        }
    }

    Ok(Redirect::to(&page_url(&slug, "")).into_response())
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// GET /wiki/pages/{slug}/history
///
/// Revisions, newest first.
pub async fn page_history(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    if let Some(redirect) = canonical_redirect(&slug, "/history", query.as_deref()) {
        return Ok(redirect);
    }
    let Some(page) = visible_page(&state, &viewer, &slug).await? else {
        return Ok(edit_redirect(&slug));
    };

    let revisions = state.store.list_revisions(page.id).await?;
    Ok(Json(DataResponse {
        data: PageHistory { page, revisions },
    })
    .into_response())
}

/// GET /wiki/pages/{slug}/history/{revision_id}
pub async fn get_revision(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Path((slug, revision_id)): Path<(String, DbId)>,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    let suffix = format!("/history/{revision_id}");
    if let Some(redirect) = canonical_redirect(&slug, &suffix, query.as_deref()) {
        return Ok(redirect);
    }
    let Some(page) = visible_page(&state, &viewer, &slug).await? else {
        return Ok(edit_redirect(&slug));
    };

    let revision = find_revision(&state, &page, revision_id).await?;
    let html = state.renderer.render(&revision.content);
    Ok(Json(DataResponse {
        data: RevisionDetail {
            page,
            revision,
            html,
        },
    })
    .into_response())
}

/// GET /wiki/pages/{slug}/diff?from_revision_pk=&to_revision_pk=&undo=error
///
/// Line-then-character diff between two revisions of the page. Without
/// `from_revision_pk` the diff starts from empty content.
pub async fn diff_revisions(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<DiffParams>,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    if let Some(redirect) = canonical_redirect(&slug, "/diff", query.as_deref()) {
        return Ok(redirect);
    }
    let Some(page) = visible_page(&state, &viewer, &slug).await? else {
        return Ok(edit_redirect(&slug));
    };

    if params.undo.as_deref().is_some_and(|flag| flag != "error") {
        return Err(AppError::BadRequest("Unknown undo flag".into()));
    }
    let Some(to_id) = params.to_revision_pk else {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "WikiRevision",
            id: 0,
        }));
    };
    let to_revision = find_revision(&state, &page, to_id).await?;
    let from_revision = match params.from_revision_pk {
        Some(id) => Some(find_revision(&state, &page, id).await?),
        None => None,
    };

    let from_content = from_revision.as_ref().map_or("", |r| r.content.as_str());
    let fragments = diff_view(
        from_content,
        &to_revision.content,
        &state.config.wiki.diff_options(),
    );

    Ok(Json(DataResponse {
        data: RevisionDiff {
            page_id: page.id,
            slug: page.slug,
            from_revision,
            to_revision,
            fragments,
            undo_error: params.undo_error(),
        },
    })
    .into_response())
}

// ---------------------------------------------------------------------------
// Revert
// ---------------------------------------------------------------------------

/// GET /wiki/pages/{slug}/revert/{revision_id}
///
/// Draft restoring the revision's content verbatim.
pub async fn revert_form(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Path((slug, revision_id)): Path<(String, DbId)>,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    let suffix = format!("/revert/{revision_id}");
    if let Some(redirect) = canonical_redirect(&slug, &suffix, query.as_deref()) {
        return Ok(redirect);
    }
    let Some(page) = visible_page(&state, &viewer, &slug).await? else {
        return Ok(edit_redirect(&slug));
    };
    ensure_can_edit(&state, &viewer, &page)?;

    let source_revision = find_revision(&state, &page, revision_id).await?;
    let draft = plan_revert(&source_revision.snapshot());

    Ok(Json(DataResponse {
        data: DraftForm {
            page,
            source_revision,
            draft,
        },
    })
    .into_response())
}

/// POST /wiki/pages/{slug}/revert/{revision_id}
///
/// Save the revert (or the client's edited version of it).
pub async fn revert_page(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Path((slug, revision_id)): Path<(String, DbId)>,
    RawQuery(query): RawQuery,
    Json(input): Json<DraftSubmission>,
) -> AppResult<Response> {
    let suffix = format!("/revert/{revision_id}");
    if let Some(redirect) = canonical_redirect(&slug, &suffix, query.as_deref()) {
        return Ok(redirect);
    }
    let Some(page) = visible_page(&state, &viewer, &slug).await? else {
        return Ok(edit_redirect(&slug));
    };
    ensure_can_edit(&state, &viewer, &page)?;

    let source_revision = find_revision(&state, &page, revision_id).await?;
    let planned = plan_revert(&source_revision.snapshot());
    let draft = EditDraft {
        content: input.content.unwrap_or(planned.content),
        description: input.description.unwrap_or(planned.description),
    };

    save_draft(&state, &viewer, &page, draft, "revert").await
}

// ---------------------------------------------------------------------------
// Undo
// ---------------------------------------------------------------------------

/// GET /wiki/pages/{slug}/undo/{revision_id}
///
/// Draft with the revision's change reversed on top of the current
/// content, or a redirect to the diff view when the reversal conflicts.
pub async fn undo_form(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Path((slug, revision_id)): Path<(String, DbId)>,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    let suffix = format!("/undo/{revision_id}");
    if let Some(redirect) = canonical_redirect(&slug, &suffix, query.as_deref()) {
        return Ok(redirect);
    }
    let Some(page) = visible_page(&state, &viewer, &slug).await? else {
        return Ok(edit_redirect(&slug));
    };
    ensure_can_edit(&state, &viewer, &page)?;

    let source_revision = find_revision(&state, &page, revision_id).await?;
    let draft = match compute_undo(&state, &page, &source_revision).await? {
        UndoOutcome::Ready(draft) => draft,
        UndoOutcome::Conflict(conflict) => return Ok(undo_conflict_redirect(&slug, &conflict)),
    };

    Ok(Json(DataResponse {
        data: DraftForm {
            page,
            source_revision,
            draft,
        },
    })
    .into_response())
}

/// POST /wiki/pages/{slug}/undo/{revision_id}
///
/// Save the undo. Submitted content is saved as-is; otherwise the undo is
/// recomputed against the current content and conflicts are re-checked.
pub async fn undo_revision(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Path((slug, revision_id)): Path<(String, DbId)>,
    RawQuery(query): RawQuery,
    Json(input): Json<DraftSubmission>,
) -> AppResult<Response> {
    let suffix = format!("/undo/{revision_id}");
    if let Some(redirect) = canonical_redirect(&slug, &suffix, query.as_deref()) {
        return Ok(redirect);
    }
    let Some(page) = visible_page(&state, &viewer, &slug).await? else {
        return Ok(edit_redirect(&slug));
    };
    ensure_can_edit(&state, &viewer, &page)?;

    let source_revision = find_revision(&state, &page, revision_id).await?;
    let draft = match input.content {
        Some(content) => EditDraft {
            content,
            description: input
                .description
                .unwrap_or_else(|| undo_summary(&source_revision.snapshot())),
        },
        None => match compute_undo(&state, &page, &source_revision).await? {
            UndoOutcome::Ready(draft) => EditDraft {
                description: input.description.unwrap_or(draft.description),
                content: draft.content,
            },
            UndoOutcome::Conflict(conflict) => {
                return Ok(undo_conflict_redirect(&slug, &conflict))
            }
        },
    };

    save_draft(&state, &viewer, &page, draft, "undo").await
}

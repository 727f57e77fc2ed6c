//! Handlers for the wiki's sidebar feeds: recent changes, categories,
//! authors, and recently published pages.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use folio_core::error::CoreError;
use folio_core::privacy::Viewer;
use folio_core::wiki::{clamp_limit, urlize_title, validate_title, DEFAULT_FEED_LIMIT, MAX_FEED_LIMIT};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentViewer;
use crate::middleware::rbac::RequireModerator;
use crate::query::LimitParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /categories`.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub title: String,
}

fn ensure_wiki_visible(state: &AppState, viewer: &Viewer) -> AppResult<()> {
    if state.config.wiki.wiki_policy().can_view(viewer) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "You don't have permission to view this wiki.".into(),
        )))
    }
}

/// GET /wiki/changes?limit=
///
/// Latest revisions across all pages. Moderators also see revisions of
/// unpublished pages.
pub async fn recent_changes(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> AppResult<impl IntoResponse> {
    ensure_wiki_visible(&state, &viewer)?;
    let limit = clamp_limit(params.limit, DEFAULT_FEED_LIMIT, MAX_FEED_LIMIT);
    let changes = state
        .store
        .recent_changes(limit, viewer.is_moderator())
        .await?;
    Ok(Json(DataResponse { data: changes }))
}

/// GET /wiki/categories
pub async fn list_categories(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    ensure_wiki_visible(&state, &viewer)?;
    let categories = state.store.list_categories().await?;
    Ok(Json(DataResponse { data: categories }))
}

/// POST /wiki/categories
///
/// Moderators only. The slug is derived from the title.
pub async fn create_category(
    RequireModerator(viewer): RequireModerator,
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryRequest>,
) -> AppResult<impl IntoResponse> {
    let title = input.title.trim();
    validate_title(title)?;
    let slug = urlize_title(title).to_lowercase();

    let category = state.store.create_category(title, &slug).await?;
    tracing::info!(
        category_id = category.id,
        slug = %category.slug,
        moderator = ?viewer.as_author().username().map(str::to_owned),
        "Wiki category created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: category })))
}

/// GET /wiki/authors
///
/// Page owners with their published page counts.
pub async fn list_authors(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    ensure_wiki_visible(&state, &viewer)?;
    let authors = state.store.list_authors().await?;
    Ok(Json(DataResponse { data: authors }))
}

/// GET /wiki/recent?limit=
///
/// Recently published pages the viewer may see.
pub async fn recent_pages(
    CurrentViewer(viewer): CurrentViewer,
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> AppResult<impl IntoResponse> {
    ensure_wiki_visible(&state, &viewer)?;
    let limit = clamp_limit(params.limit, DEFAULT_FEED_LIMIT, MAX_FEED_LIMIT);

    let mut pages = Vec::new();
    for page in state.store.recent_pages(limit).await? {
        let privacy = page
            .privacy_level()
            .map_err(|e| AppError::InternalError(format!("Corrupt wiki page row: {e}")))?;
        if state.config.wiki.policy(privacy).can_view(&viewer) {
            pages.push(page);
        }
    }
    Ok(Json(DataResponse { data: pages }))
}

//! Route definitions for the wiki.
//!
//! Registered under `/wiki`.

use axum::routing::get;
use axum::Router;

use crate::handlers::{sidebar, wiki};
use crate::state::AppState;

/// Wiki routes, registered as `/wiki`.
///
/// ```text
/// GET       /                                  wiki_index
/// GET/POST  /pages                             list_pages, create_page
/// GET       /pages/{slug}                      get_page
/// GET/POST  /pages/{slug}/edit                 edit_form, save_edit
/// GET       /pages/{slug}/history              page_history
/// GET       /pages/{slug}/history/{rev}        get_revision
/// GET       /pages/{slug}/diff                 diff_revisions
/// GET/POST  /pages/{slug}/revert/{rev}         revert_form, revert_page
/// GET/POST  /pages/{slug}/undo/{rev}           undo_form, undo_revision
/// GET       /changes                           recent_changes
/// GET/POST  /categories                        list_categories, create_category
/// GET       /authors                           list_authors
/// GET       /recent                            recent_pages
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/wiki", get(wiki::wiki_index))
        .route("/wiki/", get(wiki::wiki_index))
        .route(
            "/wiki/pages",
            get(wiki::list_pages).post(wiki::create_page),
        )
        .route("/wiki/pages/{slug}", get(wiki::get_page))
        .route(
            "/wiki/pages/{slug}/edit",
            get(wiki::edit_form).post(wiki::save_edit),
        )
        .route("/wiki/pages/{slug}/history", get(wiki::page_history))
        .route(
            "/wiki/pages/{slug}/history/{revision_id}",
            get(wiki::get_revision),
        )
        .route("/wiki/pages/{slug}/diff", get(wiki::diff_revisions))
        .route(
            "/wiki/pages/{slug}/revert/{revision_id}",
            get(wiki::revert_form).post(wiki::revert_page),
        )
        .route(
            "/wiki/pages/{slug}/undo/{revision_id}",
            get(wiki::undo_form).post(wiki::undo_revision),
        )
        .route("/wiki/changes", get(sidebar::recent_changes))
        .route(
            "/wiki/categories",
            get(sidebar::list_categories).post(sidebar::create_category),
        )
        .route("/wiki/authors", get(sidebar::list_authors))
        .route("/wiki/recent", get(sidebar::recent_pages))
}

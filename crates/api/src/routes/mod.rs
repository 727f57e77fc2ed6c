pub mod health;
pub mod wiki;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /wiki                                   index redirect
/// /wiki/pages                             list, create
/// /wiki/pages/{slug}                      detail
/// /wiki/pages/{slug}/edit                 edit form, save
/// /wiki/pages/{slug}/history[/{rev}]      revision history
/// /wiki/pages/{slug}/diff                 revision diff
/// /wiki/pages/{slug}/revert/{rev}         revert draft, save
/// /wiki/pages/{slug}/undo/{rev}           undo draft, save
/// /wiki/changes                           recent changes
/// /wiki/categories                        categories (create: moderators)
/// /wiki/authors                           authors
/// /wiki/recent                            recently published pages
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(wiki::router())
}

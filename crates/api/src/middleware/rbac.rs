//! Role-based access control extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use folio_core::error::CoreError;
use folio_core::privacy::Viewer;

use super::auth::CurrentViewer;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the wiki moderation permission (`admin` or `moderator`).
/// Anonymous callers get 401, signed-in non-moderators 403.
///
/// ```ignore
/// async fn moderators_only(RequireModerator(viewer): RequireModerator) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireModerator(pub Viewer);

impl FromRequestParts<AppState> for RequireModerator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentViewer(viewer) = CurrentViewer::from_request_parts(parts, state).await?;
        if !viewer.is_authenticated() {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Authentication required".into(),
            )));
        }
        if !viewer.is_moderator() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Moderator role required".into(),
            )));
        }
        Ok(RequireModerator(viewer))
    }
}

//! Optional JWT authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use folio_core::error::CoreError;
use folio_core::privacy::Viewer;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// The party making the request.
///
/// No `Authorization` header means an anonymous viewer. A header that is
/// present but malformed, expired, or wrongly signed is rejected with 401
/// rather than silently downgraded to anonymous.
///
/// ```ignore
/// async fn my_handler(CurrentViewer(viewer): CurrentViewer) -> AppResult<Json<()>> {
///     tracing::info!(authenticated = viewer.is_authenticated(), "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentViewer(pub Viewer);

impl FromRequestParts<AppState> for CurrentViewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(CurrentViewer(Viewer::Anonymous));
        };

        let auth_header = header.to_str().map_err(|_| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization header".into(),
            ))
        })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(CurrentViewer(Viewer::User {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        }))
    }
}

//! Request handlers.
//!
//! Handlers delegate persistence to the [`WikiStore`](folio_db::WikiStore)
//! in [`AppState`](crate::state::AppState) and map errors via
//! [`AppError`](crate::error::AppError).

pub mod sidebar;
pub mod wiki;

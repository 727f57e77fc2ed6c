//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Feed-style `?limit=` parameter, clamped by the handler.
#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

/// Page list filters and the 1-based `?page=` number.
#[derive(Debug, Deserialize)]
pub struct PageListParams {
    pub tag: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub page: Option<i64>,
}

/// Revision pair compared by the diff view, plus the undo-conflict flag.
#[derive(Debug, Deserialize)]
pub struct DiffParams {
    pub from_revision_pk: Option<i64>,
    pub to_revision_pk: Option<i64>,
    pub undo: Option<String>,
}

impl DiffParams {
    pub fn undo_error(&self) -> bool {
        self.undo.as_deref() == Some("error")
    }
}

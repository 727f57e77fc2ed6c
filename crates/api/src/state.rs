use std::sync::Arc;

use folio_core::markup::MarkupRenderer;
use folio_core::patch::{PatchConfig, PatchEngine};
use folio_db::WikiStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Page and revision persistence.
    pub store: Arc<dyn WikiStore>,
    /// Server configuration, including the wiki settings.
    pub config: Arc<ServerConfig>,
    /// Markup renderer resolved from `config.wiki.text_filter` at startup.
    pub renderer: Arc<MarkupRenderer>,
    /// Patch engine used by undo, carrying the configured diff budget.
    pub patch_engine: Arc<PatchEngine>,
}

impl AppState {
    pub fn new(store: Arc<dyn WikiStore>, config: ServerConfig) -> Self {
        let renderer = config.wiki.renderer();
        let patch_engine = PatchEngine::new(PatchConfig {
            diff: config.wiki.diff_options(),
            ..PatchConfig::default()
        });
        Self {
            store,
            config: Arc::new(config),
            renderer: Arc::new(renderer),
            patch_engine: Arc::new(patch_engine),
        }
    }
}

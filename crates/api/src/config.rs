use std::time::Duration;

use folio_core::diff::DEFAULT_DIFF_TIMEOUT;
use folio_core::settings::{WikiSettings, DEFAULT_BASE_URL, DEFAULT_INDEX, DEFAULT_PAGES_PER_PAGE};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for in-flight requests on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Postgres URL. Without one the server runs on the in-memory store.
    pub database_url: Option<String>,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Wiki behaviour (privacy, markup, pagination, diff budget).
    pub wiki: WikiSettings,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `DATABASE_URL`         | unset (memory store)       |
    ///
    /// Wiki settings are read by [`wiki_settings_from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let jwt = JwtConfig::from_env();
        let wiki = wiki_settings_from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url,
            jwt,
            wiki,
        }
    }
}

/// Load [`WikiSettings`] from environment variables.
///
/// | Env Var                      | Default                 |
/// |------------------------------|-------------------------|
/// | `WIKI_DEFAULT_INDEX`         | `Main_page`             |
/// | `WIKI_PAGES_PER_PAGE`        | `10`                    |
/// | `WIKI_DEFAULT_PRIVACY`       | `registered`            |
/// | `WIKI_TEXT_FILTER`           | `wikilinks`             |
/// | `WIKI_ALLOW_ANONYMOUS_EDITS` | `true`                  |
/// | `WIKI_BASE_URL`              | `/api/v1/wiki/pages/`   |
/// | `WIKI_DIFF_TIMEOUT_MS`       | `1000` (max `60000`)    |
///
/// # Panics
///
/// Panics on unparseable values so misconfiguration fails at startup.
pub fn wiki_settings_from_env() -> WikiSettings {
    let default_index =
        std::env::var("WIKI_DEFAULT_INDEX").unwrap_or_else(|_| DEFAULT_INDEX.into());

    let pages_per_page: i64 = std::env::var("WIKI_PAGES_PER_PAGE")
        .unwrap_or_else(|_| DEFAULT_PAGES_PER_PAGE.to_string())
        .parse()
        .expect("WIKI_PAGES_PER_PAGE must be a valid i64");
    assert!(pages_per_page > 0, "WIKI_PAGES_PER_PAGE must be positive");

    let default_privacy = std::env::var("WIKI_DEFAULT_PRIVACY")
        .unwrap_or_else(|_| "registered".into())
        .parse()
        .unwrap_or_else(|e| panic!("WIKI_DEFAULT_PRIVACY: {e}"));

    let text_filter = std::env::var("WIKI_TEXT_FILTER")
        .unwrap_or_else(|_| "wikilinks".into())
        .parse()
        .unwrap_or_else(|e| panic!("WIKI_TEXT_FILTER: {e}"));

    let allow_anonymous_edits: bool = std::env::var("WIKI_ALLOW_ANONYMOUS_EDITS")
        .unwrap_or_else(|_| "true".into())
        .parse()
        .expect("WIKI_ALLOW_ANONYMOUS_EDITS must be true or false");

    let base_url = std::env::var("WIKI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());

    let diff_timeout_ms: u64 = std::env::var("WIKI_DIFF_TIMEOUT_MS")
        .unwrap_or_else(|_| "1000".into())
        .parse()
        .expect("WIKI_DIFF_TIMEOUT_MS must be a valid u64");
    let diff_timeout = Some(diff_timeout_from_ms(diff_timeout_ms));

    WikiSettings {
        default_index,
        pages_per_page,
        default_privacy,
        text_filter,
        allow_anonymous_edits,
        base_url,
        diff_timeout,
    }
}

/// Upper bound on the configurable diff budget.
pub const MAX_DIFF_TIMEOUT_MS: u64 = 60_000;

/// Turn `WIKI_DIFF_TIMEOUT_MS` into a diff budget. Diffs always stay bounded:
/// `0` falls back to the default and larger values are capped at
/// [`MAX_DIFF_TIMEOUT_MS`].
fn diff_timeout_from_ms(ms: u64) -> Duration {
    match ms {
        0 => {
            tracing::warn!(
                default_ms = DEFAULT_DIFF_TIMEOUT.as_millis() as u64,
                "WIKI_DIFF_TIMEOUT_MS=0 would leave diffs unbounded; using the default"
            );
            DEFAULT_DIFF_TIMEOUT
        }
        ms if ms > MAX_DIFF_TIMEOUT_MS => {
            tracing::warn!(
                requested_ms = ms,
                max_ms = MAX_DIFF_TIMEOUT_MS,
                "WIKI_DIFF_TIMEOUT_MS too large; capping"
            );
            Duration::from_millis(MAX_DIFF_TIMEOUT_MS)
        }
        ms => Duration::from_millis(ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_timeout_in_range_is_kept() {
        assert_eq!(diff_timeout_from_ms(250), Duration::from_millis(250));
        assert_eq!(
            diff_timeout_from_ms(MAX_DIFF_TIMEOUT_MS),
            Duration::from_millis(MAX_DIFF_TIMEOUT_MS)
        );
    }

    #[test]
    fn zero_diff_timeout_falls_back_to_default() {
        assert_eq!(diff_timeout_from_ms(0), DEFAULT_DIFF_TIMEOUT);
    }

    #[test]
    fn huge_diff_timeout_is_capped() {
        assert_eq!(
            diff_timeout_from_ms(u64::MAX),
            Duration::from_millis(MAX_DIFF_TIMEOUT_MS)
        );
    }
}

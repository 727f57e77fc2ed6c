#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use folio_api::auth::jwt::{generate_access_token, JwtConfig};
use folio_api::config::ServerConfig;
use folio_api::router::build_app_router;
use folio_api::state::AppState;
use folio_core::settings::WikiSettings;
use folio_db::{MemoryWikiStore, WikiStore};

pub const PAGES: &str = "/api/v1/wiki/pages";

/// Build a test `ServerConfig` with safe defaults and the given wiki
/// settings.
pub fn test_config(wiki: WikiSettings) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: None,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        wiki,
    }
}

/// A test app and a handle on its store, for seeding and inspection.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryWikiStore>,
    pub config: ServerConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(WikiSettings::default())
    }

    /// Build the full application router (same middleware stack as
    /// production) over a fresh in-memory store.
    pub fn with_settings(wiki: WikiSettings) -> Self {
        let config = test_config(wiki);
        let store = Arc::new(MemoryWikiStore::new());
        let dyn_store: Arc<dyn WikiStore> = store.clone();
        let router = build_app_router(AppState::new(dyn_store, config.clone()));
        Self {
            router,
            store,
            config,
        }
    }

    /// Bearer header value for a signed-in user.
    pub fn bearer(&self, id: i64, username: &str, role: &str) -> String {
        let token = generate_access_token(id, username, role, &self.config.jwt).unwrap();
        format!("Bearer {token}")
    }

    pub async fn get(&self, uri: &str, auth: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, auth, None).await
    }

    pub async fn post(&self, uri: &str, auth: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, auth, Some(body)).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            location,
            json,
        }
    }
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub json: Value,
}

impl TestResponse {
    /// The `data` field of the response envelope.
    pub fn data(&self) -> &Value {
        &self.json["data"]
    }
}

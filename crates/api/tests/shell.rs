//! Page shell end to end against the in-memory directory

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use blogdesk_api::routing::InMemoryTenantDirectory;
use blogdesk_api::{create_router, AppState, Config};
use blogdesk_shared::Tenant;
use serde_json::Value;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    directory: Arc<InMemoryTenantDirectory>,
}

impl TestApp {
    fn new() -> Self {
        let directory = Arc::new(InMemoryTenantDirectory::with_tenants([
            Tenant::new("jean", "Jean's Notes"),
            Tenant::new("marie", "Marie Writes"),
        ]));
        let router = create_router(AppState::new(Config::default(), directory.clone()));
        Self { router, directory }
    }

    async fn page(&self, host: &str, path: &str) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(path)
                    .header(header::HOST, host)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }
}

#[tokio::test]
async fn test_production_subdomain() {
    let app = TestApp::new();
    let (status, body) = app.page("jean.newsai.fun", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"], "public");
    assert_eq!(body["tenant"]["display_name"], "Jean's Notes");
}

#[tokio::test]
async fn test_host_label_beats_query_param() {
    let app = TestApp::new();
    let (_, body) = app.page("jean.newsai.fun", "/?blog=marie").await;
    assert_eq!(body["tenant"]["label"], "jean");
}

#[tokio::test]
async fn test_provider_sandbox_uses_query_param() {
    let app = TestApp::new();

    let (_, body) = app.page("my-app.netlify.app", "/").await;
    assert_eq!(body["view"], "admin");

    let (_, body) = app.page("my-app.netlify.app", "/?blog=marie").await;
    assert_eq!(body["view"], "public");
    assert_eq!(body["tenant"]["label"], "marie");
    assert_eq!(body["source"], "query_param");
}

#[tokio::test]
async fn test_local_development_hosts() {
    let app = TestApp::new();

    let (_, body) = app.page("jean.localhost:5173", "/").await;
    assert_eq!(body["tenant"]["label"], "jean");

    let (_, body) = app.page("localhost:5173", "/posts").await;
    assert_eq!(body["view"], "admin");
    assert_eq!(body["admin_view"], "posts");

    let (_, body) = app.page("127.0.0.1:3000", "/?blog=jean").await;
    assert_eq!(body["tenant"]["label"], "jean");
}

#[tokio::test]
async fn test_reserved_and_www_hosts_are_admin() {
    let app = TestApp::new();
    for host in ["www.newsai.fun", "admin.newsai.fun", "app.newsai.fun", "newsai.fun"] {
        let (status, body) = app.page(host, "/settings").await;
        assert_eq!(status, StatusCode::OK, "{host}");
        assert_eq!(body["view"], "admin", "{host}");
        assert_eq!(body["admin_view"], "settings", "{host}");
    }
}

#[tokio::test]
async fn test_unknown_tenant_reports_raw_host() {
    let app = TestApp::new();
    let (status, body) = app.page("Ghost.NewsAI.fun:8443", "/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["label"], "ghost");
    assert_eq!(body["hostname"], "Ghost.NewsAI.fun:8443");
    assert_eq!(body["home_url"], "https://newsai.fun:8443/");
}

#[tokio::test]
async fn test_outage_is_not_reported_as_missing_tenant() {
    let app = TestApp::new();
    app.directory.set_unavailable(true);

    let (status, body) = app.page("marie.newsai.fun", "/").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["view"], "unavailable");
    assert_eq!(body["retryable"], true);

    app.directory.set_unavailable(false);
    let (status, _) = app.page("marie.newsai.fun", "/").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_endpoints_follow_directory() {
    let app = TestApp::new();

    let (status, body) = app.page("newsai.fun", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["directory"], "healthy");

    app.directory.set_unavailable(true);
    let (status, _) = app.page("newsai.fun", "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = app.page("newsai.fun", "/health/live").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::HOST, "jean.newsai.fun")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(response.headers()["vary"], "host");
}

//! Page shell
//!
//! Every non-API path lands here. The shell resolves the request to the admin
//! app, a tenant's public blog, an admin preview of a blog, or a not-found
//! page, and reports which one the client should render.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use blogdesk_shared::Tenant;
use serde::Serialize;

use crate::error::RETRY_AFTER_SECS;
use crate::routing::{
    home_url, resolve_context, AdminView, CurrentOrigin, LabelSource, NavigationOutcome,
    RequestContext, Resolution, RoutingDecision, TenantLookupGateway,
};
use crate::state::AppState;

use super::request_host;

/// What the client renders for a page request
#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ShellResponse {
    Admin {
        admin_view: AdminView,
    },
    Public {
        tenant: Tenant,
        source: LabelSource,
    },
    Preview {
        tenant: Tenant,
        /// Where the "back to dashboard" control points
        return_to_admin: String,
    },
    NotFound {
        label: String,
        hostname: String,
        /// Root of the deployment, when the request origin is usable
        home_url: Option<String>,
    },
    Unavailable {
        label: String,
        hostname: String,
        retryable: bool,
    },
}

impl ShellResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            ShellResponse::Admin { .. }
            | ShellResponse::Public { .. }
            | ShellResponse::Preview { .. } => StatusCode::OK,
            ShellResponse::NotFound { .. } => StatusCode::NOT_FOUND,
            ShellResponse::Unavailable {
                retryable: true, ..
            } => StatusCode::SERVICE_UNAVAILABLE,
            ShellResponse::Unavailable {
                retryable: false, ..
            } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShellResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(self)).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}

/// Fallback handler for page requests
pub async fn page_shell(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> ShellResponse {
    let host = request_host(&headers, &uri).unwrap_or_default();
    let ctx = RequestContext::from_request(&host, uri.query());
    let origin = CurrentOrigin::new(&state.config.public_protocol, &host).ok();

    let lookup = match resolve_context(&ctx, &state.policy) {
        Resolution::Decided { .. } => {
            return ShellResponse::Admin {
                admin_view: AdminView::from_path(uri.path()),
            };
        }
        Resolution::NeedsLookup { lookup } => lookup,
    };

    let source = lookup.source();
    tracing::debug!(host = %host, label = lookup.label(), ?source, "Looking up tenant");

    let result = state.gateway.lookup(lookup.label()).await;
    match lookup.settle(result) {
        NavigationOutcome::Routed {
            decision: RoutingDecision::PublicTenant { .. },
            tenant: Some(tenant),
        } => ShellResponse::Public { tenant, source },
        NavigationOutcome::Routed {
            decision: RoutingDecision::PreviewTenant { .. },
            tenant: Some(tenant),
        } => ShellResponse::Preview {
            tenant,
            return_to_admin: origin
                .as_ref()
                .map(|o| format!("{}/", o.origin()))
                .unwrap_or_else(|| "/".to_string()),
        },
        NavigationOutcome::Routed {
            decision: RoutingDecision::TenantNotFound { label, hostname },
            ..
        } => {
            tracing::info!(host = %hostname, label = %label, "Tenant not found");
            ShellResponse::NotFound {
                label,
                hostname,
                home_url: origin.as_ref().map(|o| home_url(o, &state.policy)),
            }
        }
        NavigationOutcome::Routed { decision, .. } => {
            // settle() only pairs tenant decisions with a tenant
            tracing::error!(?decision, "Routed without a tenant");
            ShellResponse::Admin {
                admin_view: AdminView::Dashboard,
            }
        }
        NavigationOutcome::LookupUnavailable {
            label,
            hostname,
            error,
        } => {
            let retryable = error.is_transient();
            if retryable {
                tracing::warn!(host = %hostname, label = %label, error = %error, "Tenant lookup unavailable");
            } else {
                tracing::error!(host = %hostname, label = %label, error = %error, "Tenant lookup failed");
            }
            ShellResponse::Unavailable {
                label,
                hostname,
                retryable,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Config;
    use blogdesk_shared::LookupError;
    use crate::routing::InMemoryTenantDirectory;
    use axum::{body::Body, http::Request, Router};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(directory: Arc<InMemoryTenantDirectory>) -> Router {
        let state = AppState::new(Config::default(), directory);
        Router::new().fallback(page_shell).with_state(state)
    }

    async fn get(app: Router, host: &str, path: &str) -> (StatusCode, serde_json::Value) {
        let response = app
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
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn directory() -> Arc<InMemoryTenantDirectory> {
        Arc::new(InMemoryTenantDirectory::with_tenants([Tenant::new(
            "jean",
            "Jean's Notes",
        )]))
    }

    #[tokio::test]
    async fn test_subdomain_renders_public_blog() {
        let (status, body) = get(app(directory()), "jean.newsai.fun", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"], "public");
        assert_eq!(body["tenant"]["label"], "jean");
        assert_eq!(body["source"], "subdomain");
    }

    #[tokio::test]
    async fn test_root_domain_renders_admin_view() {
        let (status, body) = get(app(directory()), "newsai.fun", "/create-post").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"], "admin");
        assert_eq!(body["admin_view"], "create-post");
    }

    #[tokio::test]
    async fn test_unknown_tenant_is_not_found() {
        let (status, body) = get(app(directory()), "ghost.newsai.fun", "/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["view"], "not_found");
        assert_eq!(body["label"], "ghost");
        assert_eq!(body["hostname"], "ghost.newsai.fun");
        assert_eq!(body["home_url"], "https://newsai.fun/");
    }

    #[tokio::test]
    async fn test_preview_offers_way_back() {
        let (status, body) = get(app(directory()), "newsai.fun", "/?preview=jean").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"], "preview");
        assert_eq!(body["return_to_admin"], "https://newsai.fun/");
    }

    #[tokio::test]
    async fn test_directory_outage_is_retryable() {
        let directory = directory();
        directory.set_unavailable(true);

        let response = app(directory)
            .oneshot(
                Request::builder()
                    .uri("/?blog=jean")
                    .header(header::HOST, "my-app.netlify.app")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "5");
    }

    #[tokio::test]
    async fn test_rejected_lookup_is_not_retryable() {
        let directory = directory();
        directory.fail_with(Some(LookupError::Rejected("invalid api key".into())));

        let response = app(directory)
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::HOST, "jean.newsai.fun")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["view"], "unavailable");
        assert_eq!(body["retryable"], false);
    }
}

//! Tenant routing endpoints

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Uri},
    Json,
};
use blogdesk_shared::{RoutingModeConfig, Tenant};
use serde::{Deserialize, Serialize};

use crate::{
    auth::RequireAdminToken,
    error::{ApiError, ApiResult},
    routing::{
        build_for_origin, classify, resolve_context, CurrentOrigin, HostKind, PublicUrl,
        RequestContext, Resolution, SettingsStore, TenantLookupGateway,
    },
    state::AppState,
};

use super::{request_host, request_origin};

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    /// Host to resolve; defaults to the request's own host
    pub host: Option<String>,
    pub blog: Option<String>,
    pub preview: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HostReport {
    pub kind: HostKind,
    pub candidate_label: Option<String>,
    pub root_domain: String,
    pub supports_wildcard: bool,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub host: String,
    pub classification: HostReport,
    pub resolution: Resolution,
}

/// Explain how a host would be routed, without looking anything up
pub async fn resolve_host(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<ResolveQuery>,
) -> ApiResult<Json<ResolveResponse>> {
    let host = query
        .host
        .or_else(|| request_host(&headers, &uri))
        .ok_or_else(|| ApiError::Validation("host is required".to_string()))?;

    let ctx = RequestContext::new(host.trim())
        .with_blog(query.blog)
        .with_preview(query.preview);

    let classification = classify(&ctx.hostname, &state.policy);
    let report = HostReport {
        kind: classification.kind(),
        candidate_label: classification.candidate_label().map(str::to_string),
        root_domain: classification.root_domain().to_string(),
        supports_wildcard: classification.kind().supports_wildcard(),
    };

    Ok(Json(ResolveResponse {
        resolution: resolve_context(&ctx, &state.policy),
        host: ctx.hostname,
        classification: report,
    }))
}

#[derive(Debug, Serialize)]
pub struct PublicUrlResponse {
    pub label: String,
    pub routing_mode: RoutingModeConfig,
    pub public_url: PublicUrl,
}

/// The link a tenant should share, as seen from the requesting origin
pub async fn public_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Path(label): Path<String>,
) -> ApiResult<Json<PublicUrlResponse>> {
    let origin = request_origin(&state, &headers, &uri)?;
    let tenant = find_tenant(&state, &label).await?;
    let mode = state.directory.routing_mode(tenant.id).await?;

    Ok(Json(public_url_response(&state, tenant, mode, &origin)?))
}

pub async fn get_routing_mode(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> ApiResult<Json<RoutingModeConfig>> {
    let tenant = find_tenant(&state, &label).await?;
    Ok(Json(state.directory.routing_mode(tenant.id).await?))
}

/// Switch a tenant between subdomain and query-parameter links.
/// Links handed out under the previous mode keep working.
pub async fn set_routing_mode(
    _admin: RequireAdminToken,
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Path(label): Path<String>,
    Json(mode): Json<RoutingModeConfig>,
) -> ApiResult<Json<PublicUrlResponse>> {
    let origin = request_origin(&state, &headers, &uri)?;
    let tenant = find_tenant(&state, &label).await?;

    state.directory.set_routing_mode(tenant.id, mode).await?;
    tracing::info!(
        tenant_id = %tenant.id,
        label = %tenant.label,
        use_subdomains = mode.use_subdomains,
        "Routing mode updated"
    );

    Ok(Json(public_url_response(&state, tenant, mode, &origin)?))
}

async fn find_tenant(state: &AppState, label: &str) -> ApiResult<Tenant> {
    state.gateway.lookup(label).await?.ok_or(ApiError::NotFound)
}

fn public_url_response(
    state: &AppState,
    tenant: Tenant,
    mode: RoutingModeConfig,
    origin: &CurrentOrigin,
) -> ApiResult<PublicUrlResponse> {
    let public_url = build_for_origin(&tenant.label, origin, mode, &state.policy)?;
    Ok(PublicUrlResponse {
        label: tenant.label,
        routing_mode: mode,
        public_url,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routes::create_router;
    use crate::routing::InMemoryTenantDirectory;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    const TOKEN: &str = "an-admin-token-that-is-long-enough-1234";

    fn app() -> Router {
        let directory = Arc::new(InMemoryTenantDirectory::with_tenants([Tenant::new(
            "jean",
            "Jean's Notes",
        )]));
        let config = Config {
            admin_api_token: Some(TOKEN.to_string()),
            ..Config::default()
        };
        create_router(AppState::new(config, directory))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::HOST, "newsai.fun")
            .body(Body::empty())
            .unwrap()
    }

    fn put_mode(use_subdomains: bool, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::PUT)
            .uri("/api/v1/tenants/jean/routing-mode")
            .header(header::HOST, "newsai.fun")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header("x-admin-token", token);
        }
        builder
            .body(Body::from(
                serde_json::json!({ "use_subdomains": use_subdomains }).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_reports_classification() {
        let app = app();
        let (status, body) = send(&app, get("/api/v1/resolve?host=jean.newsai.fun:3000")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["classification"]["kind"], "multi_label_domain");
        assert_eq!(body["classification"]["candidate_label"], "jean");
        assert_eq!(body["resolution"]["status"], "needs_lookup");
        assert_eq!(body["resolution"]["lookup"]["source"], "subdomain");
    }

    #[tokio::test]
    async fn test_public_url_defaults_to_query_form() {
        let app = app();
        let (status, body) = send(&app, get("/api/v1/tenants/jean/public-url")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["public_url"]["url"], "https://newsai.fun/?blog=jean");
        assert_eq!(body["public_url"]["mode"], "query_param");
    }

    #[tokio::test]
    async fn test_public_url_unknown_tenant() {
        let app = app();
        let (status, body) = send(&app, get("/api/v1/tenants/ghost/public-url")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_set_routing_mode_requires_token() {
        let app = app();
        let (status, _) = send(&app, put_mode(true, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, put_mode(true, Some("wrong"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_set_routing_mode_switches_link_form() {
        let app = app();
        let (status, body) = send(&app, put_mode(true, Some(TOKEN))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["public_url"]["url"], "https://jean.newsai.fun");
        assert_eq!(body["public_url"]["display_text"], "jean.newsai.fun");

        let (_, body) = send(&app, get("/api/v1/tenants/jean/routing-mode")).await;
        assert_eq!(body["use_subdomains"], true);

        // Old query links still resolve after the switch
        let (status, body) = send(&app, get("/?blog=jean")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"], "public");
    }

    #[tokio::test]
    async fn test_routing_mode_endpoint_disabled_without_token() {
        let directory = Arc::new(InMemoryTenantDirectory::with_tenants([Tenant::new(
            "jean", "Jean",
        )]));
        let app = create_router(AppState::new(Config::default(), directory));
        let (status, body) = send(&app, put_mode(true, Some(TOKEN))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "DISABLED");
    }
}

//! Admin token extractor
//!
//! Settings writes are an operator action. They carry the shared
//! `ADMIN_API_TOKEN` in the `x-admin-token` header; without a configured token
//! the endpoints are disabled.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::HeaderMap, request::Parts},
};
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Guard for handlers that change tenant settings
#[derive(Debug, Clone)]
pub struct RequireAdminToken;

#[async_trait]
impl FromRequestParts<AppState> for RequireAdminToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .config
            .admin_api_token
            .as_deref()
            .ok_or(ApiError::Disabled)?;

        verify_admin_token(&parts.headers, expected)
    }
}

pub fn verify_admin_token(
    headers: &HeaderMap,
    expected: &str,
) -> Result<RequireAdminToken, ApiError> {
    let provided = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(token) if constant_time_compare(token, expected) => Ok(RequireAdminToken),
        Some(_) => {
            tracing::warn!("Invalid admin token provided");
            Err(ApiError::Forbidden)
        }
        None => Err(ApiError::Unauthorized),
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        let dummy = vec![0u8; a.len()];
        let _ = a.as_bytes().ct_eq(&dummy);
        return false;
    }

    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const TOKEN: &str = "an-admin-token-that-is-long-enough-1234";

    fn headers_with(token: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_TOKEN_HEADER, HeaderValue::from_static(token));
        headers
    }

    #[test]
    fn test_matching_token() {
        assert!(verify_admin_token(&headers_with(TOKEN), TOKEN).is_ok());
    }

    #[test]
    fn test_wrong_token_is_forbidden() {
        assert!(matches!(
            verify_admin_token(&headers_with("an-admin-token-that-is-long-enough-9999"), TOKEN),
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            verify_admin_token(&headers_with("short"), TOKEN),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn test_missing_token_is_unauthorized() {
        assert!(matches!(
            verify_admin_token(&HeaderMap::new(), TOKEN),
            Err(ApiError::Unauthorized)
        ));
    }
}

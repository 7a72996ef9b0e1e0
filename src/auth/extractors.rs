use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::error::ApiError;

/// Bearer credential from the `Authorization` header, if one was sent.
///
/// Never rejects: the handler decides when a missing token matters, after
/// it has validated the path.
pub struct BearerToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(BearerToken(extract_token(&parts.headers)))
    }
}

/// Expects "Bearer <token>".
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = auth
        .strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Verifies `token` and requires its subject to be `target_id`.
pub fn authorize(keys: &JwtKeys, token: Option<&str>, target_id: u64) -> Result<u64, ApiError> {
    let Some(token) = token else {
        warn!(target_id, "missing bearer token");
        return Err(ApiError::Unauthorized);
    };

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, target_id, "invalid or expired token");
        ApiError::Unauthorized
    })?;

    if claims.sub != target_id {
        warn!(subject = claims.sub, target_id, "token subject does not own resource");
        return Err(ApiError::Unauthorized);
    }

    Ok(claims.sub)
}

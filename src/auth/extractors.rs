use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::{
    error::AppError,
    state::AppState,
    users::{repo, repo_types::UserId},
};

pub const X_AUTHORIZATION: &str = "X-Authorization";

/// Pull the raw credential from `X-Authorization`, falling back to
/// `Authorization: Bearer`. Blank values count as absent.
pub fn credential_from(headers: &HeaderMap) -> Option<&str> {
    let raw = headers
        .get(X_AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    raw.or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    })
}

/// Authenticated caller whose credential is the one currently stored for them.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = credential_from(&parts.headers).ok_or(AppError::Unauthorized)?;
        let keys = JwtKeys::from_ref(state);
        let user_id = keys.resolve(Some(token))?.ok_or(AppError::Unauthorized)?;

        if !repo::credential_is_current(&state.db, user_id, token).await? {
            warn!(user_id, "stale or logged-out credential");
            return Err(AppError::Unauthorized);
        }
        Ok(AuthUser(user_id))
    }
}

/// Optional caller for read paths; a bad or stale credential reads as anonymous.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<UserId>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = credential_from(&parts.headers) else {
            return Ok(MaybeUser(None));
        };
        let Ok(Some(user_id)) = JwtKeys::from_ref(state).resolve(Some(token)) else {
            return Ok(MaybeUser(None));
        };
        let current = repo::credential_is_current(&state.db, user_id, token).await?;
        Ok(MaybeUser(current.then_some(user_id)))
    }
}

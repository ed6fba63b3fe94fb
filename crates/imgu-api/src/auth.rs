//! Session identity extractors
//!
//! Clients present `Authorization: Bearer <session token>`. No header means
//! a guest; a header that does not resolve to a live session is rejected
//! rather than silently downgraded to guest.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Utc;
use imgu_core::{AppError, User};

use crate::error::HttpAppError;
use crate::state::AppState;

/// The caller, if signed in
#[derive(Debug, Clone)]
pub struct Identity(pub Option<User>);

/// A signed-in caller
#[derive(Debug, Clone)]
pub struct RequireUser(pub User);

/// A signed-in admin
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub User);

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized("malformed Authorization header".to_string()))
}

impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers)? else {
            return Ok(Identity(None));
        };

        let session = state
            .sessions
            .find_session(token, Utc::now())
            .await?
            .ok_or_else(|| AppError::Unauthorized("session is invalid or expired".to_string()))?;

        let user = state
            .users
            .find_user(session.user_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = session.user_id, "Session references a missing user");
                AppError::Unauthorized("session is invalid or expired".to_string())
            })?;

        Ok(Identity(Some(user)))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match Identity::from_request_parts(parts, state).await? {
            Identity(Some(user)) => Ok(RequireUser(user)),
            Identity(None) => Err(AppError::Unauthorized("sign in required".to_string()).into()),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("admin role required".to_string()).into());
        }
        Ok(RequireAdmin(user))
    }
}

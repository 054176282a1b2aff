//! Request identity extraction
//!
//! Identity arrives as an opaque bearer subject id issued by the identity
//! provider; the subject maps to a local user row, created on first
//! sight. In dev mode, requests without an Authorization header resolve
//! to a shared demo user so the API is usable without a provider.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::db::users;
use crate::error::ApiError;
use crate::models::User;
use crate::AppState;

const DEV_SUBJECT: &str = "dev_user_1";
const DEV_EMAIL: &str = "dev@migru.app";

/// The authenticated user; rejects with 401 when identity is required
/// but absent.
pub struct CurrentUser(pub User);

/// Identity when available; `None` instead of a rejection for endpoints
/// that also serve unauthenticated clients.
pub struct OptionalUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        match bearer_subject(parts) {
            Some(subject) => {
                let user = users::get_or_create_user(&state.db, &subject, None).await?;
                Ok(CurrentUser(user))
            }
            None if state.config.dev_mode => {
                let user =
                    users::get_or_create_user(&state.db, DEV_SUBJECT, Some(DEV_EMAIL)).await?;
                Ok(CurrentUser(user))
            }
            None => Err(ApiError::Unauthorized(
                "Authorization header required".to_string(),
            )),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(CurrentUser(user)) => Ok(OptionalUser(Some(user))),
            Err(_) => Ok(OptionalUser(None)),
        }
    }
}

/// Subject id from a `Bearer <subject>` Authorization header
fn bearer_subject(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

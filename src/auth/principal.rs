//! Extracts the calling principal from request headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::presented_credential;
use crate::errors::AppError;
use crate::models::{CurrentUser, User};

/// Username of the caller, as asserted by the fronting auth service.
pub const USER_HEADER: &str = "x-wiki-user";
/// Comma-separated role names of the caller.
pub const ROLES_HEADER: &str = "x-wiki-roles";

/// Split a roles header into trimmed, non-empty role names.
pub fn parse_roles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", USER_HEADER)))?
            .to_string();

        let roles = parts
            .headers
            .get(ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(parse_roles)
            .unwrap_or_default();

        Ok(CurrentUser {
            auth: presented_credential(&parts.headers),
            user: User { username, roles },
        })
    }
}

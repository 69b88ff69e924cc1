//! Authentication and authorization.
//!
//! The PSK layer guards the REST surface with a constant-time comparison.
//! Principals arrive as request headers; [`AccessGate`] makes the per-entity
//! decisions the managers need.

mod gate;
mod principal;

pub use gate::*;
pub use principal::*;

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    if let Some(provided) = presented_credential(request.headers()) {
        if constant_time_compare(&provided, &expected) {
            return next.run(request).await;
        }
        return AppError::Unauthorized("Invalid API key".to_string()).into_response();
    }

    AppError::Unauthorized("Missing API key".to_string()).into_response()
}

/// The API key from `x-api-key`, falling back to a bearer token.
pub fn presented_credential(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .map(|s| s.to_string())
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

//! REST API module.
//!
//! Thin handlers over the page, comment and wiki managers.

mod comments;
mod pages;
mod wikis;

pub use comments::*;
pub use pages::*;
pub use wikis::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Default page size for history and comment listings.
pub const DEFAULT_NUM_PER_PAGE: i64 = 25;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// `?pageNum=&numPerPage=` for paged listings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingQuery {
    #[serde(default)]
    pub page_num: i64,
    #[serde(default = "default_num_per_page")]
    pub num_per_page: i64,
}

fn default_num_per_page() -> i64 {
    DEFAULT_NUM_PER_PAGE
}

/// `?rev=` for deletes.
#[derive(Debug, Clone, Deserialize)]
pub struct RevQuery {
    #[serde(default)]
    pub rev: String,
}

/// Revision produced by a write.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionResponse {
    pub id: String,
    pub rev: String,
}

//! Wiki record API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateWikiRequest, CurrentUser, SetHomePageRequest, WikiRecord};
use crate::AppState;

/// POST /api/wikis - Create a wiki record.
pub async fn create_wiki(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateWikiRequest>,
) -> ApiResult<WikiRecord> {
    let record = state.directory.create(request).await?;
    tracing::info!(wiki_id = %record.id, user = user.username(), "Wiki created via API");
    success(record)
}

/// GET /api/wikis/:wiki - Read a wiki record.
pub async fn get_wiki(
    State(state): State<AppState>,
    Path(wiki_id): Path<String>,
) -> ApiResult<WikiRecord> {
    success(state.directory.read(&wiki_id).await?)
}

/// PUT /api/wikis/:wiki/home - Point the wiki at a landing page. Admins only.
pub async fn set_home_page(
    State(state): State<AppState>,
    Path(wiki_id): Path<String>,
    user: CurrentUser,
    Json(request): Json<SetHomePageRequest>,
) -> ApiResult<WikiRecord> {
    if !state.gate.is_admin(&wiki_id, &user) {
        return Err(AppError::Forbidden(format!(
            "{} may not change the home page of wiki {}",
            user.username(),
            wiki_id
        )));
    }
    if !request.home_page_id.is_empty() {
        let page = state.pages.read(&wiki_id, &request.home_page_id).await?;
        if !page.is_live() {
            return Err(AppError::BadRequest(
                "home page must be a live page".to_string(),
            ));
        }
    }
    success(
        state
            .directory
            .set_home_page(&wiki_id, &request.home_page_id)
            .await?,
    )
}

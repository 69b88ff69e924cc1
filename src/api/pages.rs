//! Page API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use super::{success, ApiResult, PagingQuery, RevQuery, RevisionResponse};
use crate::errors::AppError;
use crate::models::{Breadcrumb, CurrentUser, HistoryPage, Page, PageIndex};
use crate::AppState;

/// Page resolved through wiki and page slugs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugLookup {
    pub wiki_id: String,
    pub page: Page,
}

/// GET /api/wikis/:wiki/pages - Index of live pages.
pub async fn list_pages(
    State(state): State<AppState>,
    Path(wiki_id): Path<String>,
) -> ApiResult<PageIndex> {
    success(state.pages.index(&wiki_id).await?)
}

/// POST /api/wikis/:wiki/pages - Create a page.
pub async fn create_page(
    State(state): State<AppState>,
    Path(wiki_id): Path<String>,
    user: CurrentUser,
    Json(mut page): Json<Page>,
) -> ApiResult<Page> {
    let page_id = std::mem::take(&mut page.id);
    state.pages.save(&wiki_id, &mut page, &page_id, "", &user).await?;
    success(page)
}

/// GET /api/wikis/:wiki/pages/:page - Read a page record.
pub async fn get_page(
    State(state): State<AppState>,
    Path((wiki_id, page_id)): Path<(String, String)>,
) -> ApiResult<Page> {
    success(state.pages.read(&wiki_id, &page_id).await?)
}

/// PUT /api/wikis/:wiki/pages/:page - Update a page; `rev` comes from the body.
pub async fn update_page(
    State(state): State<AppState>,
    Path((wiki_id, page_id)): Path<(String, String)>,
    user: CurrentUser,
    Json(mut page): Json<Page>,
) -> ApiResult<Page> {
    let page_rev = std::mem::take(&mut page.rev);
    if page_rev.is_empty() {
        return Err(AppError::BadRequest(
            "rev is required to update a page".to_string(),
        ));
    }
    state
        .pages
        .save(&wiki_id, &mut page, &page_id, &page_rev, &user)
        .await?;
    success(page)
}

/// DELETE /api/wikis/:wiki/pages/:page?rev= - Delete the live page.
pub async fn delete_page(
    State(state): State<AppState>,
    Path((wiki_id, page_id)): Path<(String, String)>,
    Query(query): Query<RevQuery>,
    user: CurrentUser,
) -> ApiResult<RevisionResponse> {
    let rev = state
        .pages
        .delete(&wiki_id, &page_id, &query.rev, &user)
        .await?;
    success(RevisionResponse { id: page_id, rev })
}

/// GET /api/wikis/:wiki/pages/:page/children - Direct children.
pub async fn child_pages(
    State(state): State<AppState>,
    Path((wiki_id, page_id)): Path<(String, String)>,
) -> ApiResult<PageIndex> {
    success(state.pages.child_index(&wiki_id, &page_id).await?)
}

/// GET /api/wikis/:wiki/pages/:page/breadcrumbs - Ancestor trail.
pub async fn page_breadcrumbs(
    State(state): State<AppState>,
    Path((wiki_id, page_id)): Path<(String, String)>,
) -> ApiResult<Vec<Breadcrumb>> {
    success(state.pages.breadcrumbs(&wiki_id, &page_id).await?)
}

/// GET /api/wikis/:wiki/pages/:page/history - Paged revision history.
pub async fn page_history(
    State(state): State<AppState>,
    Path((wiki_id, page_id)): Path<(String, String)>,
    Query(paging): Query<PagingQuery>,
) -> ApiResult<HistoryPage> {
    success(
        state
            .pages
            .history(&wiki_id, &page_id, paging.page_num, paging.num_per_page)
            .await?,
    )
}

/// GET /api/slugs/:wiki_slug/:page_slug - Resolve a page by slugs.
pub async fn page_by_slug(
    State(state): State<AppState>,
    Path((wiki_slug, page_slug)): Path<(String, String)>,
) -> ApiResult<SlugLookup> {
    let (wiki_id, page) = state.pages.read_by_slug(&wiki_slug, &page_slug).await?;
    success(SlugLookup { wiki_id, page })
}

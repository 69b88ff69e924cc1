//! Comment API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{success, ApiResult, PagingQuery, RevisionResponse};
use crate::errors::AppError;
use crate::models::{Comment, CommentIndexPage, CurrentUser};
use crate::AppState;

/// GET /api/wikis/:wiki/pages/:page/comments - Paged comments on a page.
pub async fn list_comments(
    State(state): State<AppState>,
    Path((wiki_id, page_id)): Path<(String, String)>,
    Query(paging): Query<PagingQuery>,
) -> ApiResult<CommentIndexPage> {
    success(
        state
            .comments
            .list(&wiki_id, &page_id, paging.page_num, paging.num_per_page)
            .await?,
    )
}

/// POST /api/wikis/:wiki/pages/:page/comments - Comment on a page.
pub async fn create_comment(
    State(state): State<AppState>,
    Path((wiki_id, page_id)): Path<(String, String)>,
    user: CurrentUser,
    Json(mut comment): Json<Comment>,
) -> ApiResult<Comment> {
    let comment_id = std::mem::take(&mut comment.id);
    state
        .comments
        .save(&wiki_id, &page_id, &mut comment, &comment_id, "", &user)
        .await?;
    success(comment)
}

/// GET /api/wikis/:wiki/comments/:comment - Read a comment.
pub async fn get_comment(
    State(state): State<AppState>,
    Path((wiki_id, comment_id)): Path<(String, String)>,
) -> ApiResult<Comment> {
    success(state.comments.read(&wiki_id, &comment_id).await?)
}

/// PUT /api/wikis/:wiki/comments/:comment - Edit a comment; `rev` comes from the body.
pub async fn update_comment(
    State(state): State<AppState>,
    Path((wiki_id, comment_id)): Path<(String, String)>,
    user: CurrentUser,
    Json(mut comment): Json<Comment>,
) -> ApiResult<Comment> {
    let comment_rev = std::mem::take(&mut comment.rev);
    if comment_rev.is_empty() {
        return Err(AppError::BadRequest(
            "rev is required to update a comment".to_string(),
        ));
    }
    let page_id = comment.page_id.clone();
    state
        .comments
        .save(&wiki_id, &page_id, &mut comment, &comment_id, &comment_rev, &user)
        .await?;
    success(comment)
}

/// DELETE /api/wikis/:wiki/comments/:comment - Delete a comment.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((wiki_id, comment_id)): Path<(String, String)>,
    user: CurrentUser,
) -> ApiResult<RevisionResponse> {
    let rev = state.comments.delete(&wiki_id, &comment_id, &user).await?;
    success(RevisionResponse {
        id: comment_id,
        rev,
    })
}

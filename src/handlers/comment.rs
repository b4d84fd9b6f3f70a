// src/handlers/comment.rs
//
// Thin glue over the comment engine: extract identity, validate and
// sanitize input, delegate. All tree and counter semantics live in the
// engine.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        comment::{CreateCommentRequest, ThreadListParams, UpdateCommentRequest},
        page::{PageRequest, SortOrder},
    },
    services::CommentEngine,
    store::PgCommentStore,
    utils::{
        html::clean_html,
        jwt::{Claims, OptionalClaims},
    },
};

/// Create a root comment or a reply on a post.
pub async fn create_comment(
    State(engine): State<CommentEngine<PgCommentStore>>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let content = clean_html(&payload.content);
    let view = engine
        .create_comment(claims.user_id(), post_id, &content, payload.parent_id)
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// One page of the post's comment thread, personalized when a viewer
/// token is present.
pub async fn list_thread(
    State(engine): State<CommentEngine<PgCommentStore>>,
    Extension(viewer): Extension<OptionalClaims>,
    Path(post_id): Path<i64>,
    Query(params): Query<ThreadListParams>,
) -> Result<impl IntoResponse, AppError> {
    let sort = match params.sort.as_deref() {
        Some("old") => SortOrder::OldestFirst,
        _ => SortOrder::NewestFirst,
    };
    let page = PageRequest::new(params.offset, params.limit, sort);

    let thread = engine.list_thread(post_id, page, viewer.user_id()).await?;

    Ok(Json(thread))
}

/// Edit one's own comment.
pub async fn update_comment(
    State(engine): State<CommentEngine<PgCommentStore>>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let content = clean_html(&payload.content);
    let view = engine
        .update_comment(claims.user_id(), comment_id, &content)
        .await?;

    Ok(Json(view))
}

/// Delete one's own comment; the engine cascades through live replies.
pub async fn delete_comment(
    State(engine): State<CommentEngine<PgCommentStore>>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    engine.delete_comment(claims.user_id(), comment_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

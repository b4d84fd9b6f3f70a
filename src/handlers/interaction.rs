// src/handlers/interaction.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError, models::comment::LikeTarget, services::CommentEngine,
    store::PgCommentStore, utils::jwt::Claims,
};

/// Toggle Like on a post.
pub async fn toggle_post_like(
    State(engine): State<CommentEngine<PgCommentStore>>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let status = engine
        .toggle_like(claims.user_id(), LikeTarget::Post(post_id))
        .await?;

    Ok(Json(status))
}

/// Toggle Like on a comment.
pub async fn toggle_comment_like(
    State(engine): State<CommentEngine<PgCommentStore>>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let status = engine
        .toggle_like(claims.user_id(), LikeTarget::Comment(comment_id))
        .await?;

    Ok(Json(status))
}

// src/handlers/community.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::post::{CreatePostRequest, Post, PostListParams},
    utils::{
        html::clean_html,
        jwt::{Claims, OptionalClaims},
    },
};

const POST_COLUMNS: &str = "p.id, p.user_id, p.title, p.content, p.created_at, p.updated_at, \
     p.deleted_at, p.likes_count, p.comments_count";

/// Create a new post. Requires login.
pub async fn create_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validate payload
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();
    let content = clean_html(&payload.content);

    // 2. Insert Post
    let post_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO posts (user_id, title, content)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.title)
    .bind(&content)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"id": post_id})),
    ))
}

/// List posts (Recent first).
/// Filters out soft-deleted posts; supports cursor-based pagination and
/// resolves `is_liked` for a logged-in viewer.
pub async fn list_posts(
    State(pool): State<PgPool>,
    Extension(viewer): Extension<OptionalClaims>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).min(100); // Default 20, max 100
    let viewer_id = viewer.user_id().unwrap_or(0);

    let posts = sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS},
               (pl.user_id IS NOT NULL) AS is_liked
        FROM posts p
        LEFT JOIN post_likes pl
            ON p.id = pl.post_id AND pl.user_id = $1 AND pl.is_liked = TRUE
        WHERE p.deleted_at IS NULL
          AND ($2::TIMESTAMPTZ IS NULL OR p.created_at < $2)
        ORDER BY p.created_at DESC
        LIMIT $3
        "#
    ))
    .bind(viewer_id)
    .bind(params.cursor)
    .bind(limit)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list posts: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(posts))
}

/// Get a single post by ID.
pub async fn get_post(
    State(pool): State<PgPool>,
    Extension(viewer): Extension<OptionalClaims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let viewer_id = viewer.user_id().unwrap_or(0);

    let post = sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS},
               (pl.user_id IS NOT NULL) AS is_liked
        FROM posts p
        LEFT JOIN post_likes pl
            ON p.id = pl.post_id AND pl.user_id = $2 AND pl.is_liked = TRUE
        WHERE p.id = $1 AND p.deleted_at IS NULL
        "#
    ))
    .bind(id)
    .bind(viewer_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Delete a post (Soft Delete). Author only.
pub async fn delete_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    // 1. Fetch Post to check ownership
    let author_id = sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM posts WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    // 2. Check Permission
    if author_id != user_id {
        return Err(AppError::PermissionDenied(
            "You are not authorized to delete this post".to_string(),
        ));
    }

    // 3. Soft Delete
    sqlx::query("UPDATE posts SET deleted_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}

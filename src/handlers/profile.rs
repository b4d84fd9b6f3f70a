// src/handlers/profile.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{MeResponse, ProfileResponse, UpdateProfileRequest},
    utils::jwt::Claims,
};

/// Get current user's profile and statistics.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    // Using subqueries for counts is efficient given our indexes on user_id and post_id.
    let me = sqlx::query_as::<_, MeResponse>(
        r#"
        SELECT
            u.id, u.username, u.display_name, u.avatar_url, u.created_at,
            (SELECT COUNT(*) FROM posts WHERE user_id = u.id AND deleted_at IS NULL) AS posts_count,
            (SELECT COUNT(*) FROM post_likes pl
               JOIN posts p ON pl.post_id = p.id
              WHERE p.user_id = u.id AND pl.is_liked = TRUE) AS total_likes_received
        FROM users u
        WHERE u.id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(me))
}

/// Update the current user's display name and/or avatar.
pub async fn update_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();

    let profile = sqlx::query_as::<_, ProfileResponse>(
        r#"
        UPDATE users
        SET display_name = COALESCE($2, display_name),
            avatar_url = COALESCE($3, avatar_url)
        WHERE id = $1
        RETURNING id, username, display_name, avatar_url, created_at,
                  (SELECT COUNT(*) FROM posts
                    WHERE user_id = users.id AND deleted_at IS NULL) AS posts_count
        "#,
    )
    .bind(user_id)
    .bind(&payload.display_name)
    .bind(&payload.avatar_url)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(profile))
}

/// Public profile of any user, looked up by username.
pub async fn get_user(
    State(pool): State<PgPool>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let profile = sqlx::query_as::<_, ProfileResponse>(
        r#"
        SELECT
            u.id, u.username, u.display_name, u.avatar_url, u.created_at,
            (SELECT COUNT(*) FROM posts WHERE user_id = u.id AND deleted_at IS NULL) AS posts_count
        FROM users u
        WHERE u.username = $1
        "#,
    )
    .bind(&username)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(profile))
}

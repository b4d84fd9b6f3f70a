// src/models/comment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Comments nest past this stored level, but the level value itself is
/// capped: a reply to a level-2 comment is stored at level 2 again.
pub const MAX_COMMENT_LEVEL: i32 = 2;

/// Represents the 'comments' table in the database.
///
/// Comments form a tree per post via `parent_id` adjacency. The reply chain
/// in storage is unbounded; `level` only records the capped visual tier.
/// `deleted` is monotonic - there is no undelete.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub content: String,
    pub parent_id: Option<i64>,

    /// Visual nesting tier, 0..=2. `min(parent.level + 1, 2)` for replies.
    pub level: i32,
    pub deleted: bool,

    /// Cached number of direct children with `deleted = false`.
    pub replies_count: i32,
    /// Cached number of like rows with `is_liked = true`.
    pub likes_count: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field bundle for inserting a comment; the store assigns the id and
/// initializes both cached counters to zero.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub content: String,
    pub parent_id: Option<i64>,
    pub level: i32,
    pub created_at: DateTime<Utc>,
}

/// Author fields the thread view needs, as stored on the users table.
#[derive(Debug, Clone, FromRow)]
pub struct CommentAuthor {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// One row of either like namespace (post_likes / comment_likes).
/// Repeated toggles mutate this row's `is_liked` flag in place; there is at
/// most one row per (target, user) pair.
#[derive(Debug, Clone, FromRow)]
pub struct LikeRow {
    pub target_id: i64,
    pub user_id: i64,
    pub is_liked: bool,
    pub updated_at: DateTime<Utc>,
}

/// A likeable target. The two kinds are separate namespaces backed by
/// separate tables; the ids never mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Post(i64),
    Comment(i64),
}

impl LikeTarget {
    pub fn id(self) -> i64 {
        match self {
            LikeTarget::Post(id) | LikeTarget::Comment(id) => id,
        }
    }
}

/// Result of a like toggle: the requester's new state and the recomputed
/// authoritative total.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct LikeStatus {
    pub liked: bool,
    pub count: i64,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub content: String,

    /// Optional: the ID of the comment being replied to.
    pub parent_id: Option<i64>,
}

/// DTO for editing an existing comment.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub content: String,
}

/// Query parameters for the thread listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ThreadListParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    /// 'new' (default) or 'old'.
    pub sort: Option<String>,
}

/// Display node of the assembled thread.
///
/// Deleted comments are still emitted so that surviving descendants stay
/// navigable, but every author-identifying field and the content are
/// replaced with fixed placeholders and the per-viewer flags forced false.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: i64,
    pub content: String,
    pub author_name: String,
    pub author_display_name: String,
    pub author_avatar: Option<String>,
    pub parent_id: Option<i64>,
    pub level: i32,
    pub likes_count: i32,
    pub replies_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_liked: bool,
    pub is_owner: bool,
    pub deleted: bool,
    pub replies: Vec<CommentView>,
}

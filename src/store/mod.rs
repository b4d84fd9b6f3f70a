// src/store/mod.rs

pub mod memory;
pub mod postgres;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        comment::{Comment, CommentAuthor, LikeRow, LikeTarget, NewComment},
        page::{Page, PageRequest},
        post::PostRef,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgCommentStore;

/// Storage boundary of the comment engine.
///
/// The engine performs every operation - reads included - on a single
/// transaction handle obtained from `begin`, and finishes writes with
/// `commit`. Dropping a handle without committing rolls the transaction
/// back. Adapters decide the physical representation; the engine only
/// relies on the contracts documented per method.
#[async_trait]
pub trait CommentStore: Clone + Send + Sync + 'static {
    type Tx: CommentStoreTx;

    async fn begin(&self) -> Result<Self::Tx, AppError>;
}

/// One open store transaction.
///
/// List methods order rows by `(created_at, id)` ascending unless stated
/// otherwise, so sibling order is stable even under equal timestamps.
#[async_trait]
pub trait CommentStoreTx: Send {
    /// Point lookup of a post, deleted or not.
    async fn get_post(&mut self, id: i64) -> Result<Option<PostRef>, AppError>;

    /// Point lookup of a comment, deleted or not.
    async fn get_comment(&mut self, id: i64) -> Result<Option<Comment>, AppError>;

    /// Every comment under the post, all levels, deleted included.
    async fn list_comments_by_post(&mut self, post_id: i64) -> Result<Vec<Comment>, AppError>;

    /// One page of root comments (`parent_id` null), deleted included,
    /// ordered by the requested sort, with the total root count.
    async fn list_root_comments(
        &mut self,
        post_id: i64,
        page: &PageRequest,
    ) -> Result<Page<Comment>, AppError>;

    /// Direct children of a comment, deleted included.
    async fn list_children(&mut self, parent_id: i64) -> Result<Vec<Comment>, AppError>;

    async fn insert_comment(&mut self, new: NewComment) -> Result<Comment, AppError>;

    /// Rewrites the body of an existing comment and bumps `updated_at`.
    async fn update_content(
        &mut self,
        id: i64,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Comment, AppError>;

    /// Transitions a comment to deleted. Returns whether this call performed
    /// the transition; a comment that was already deleted (possibly by a
    /// concurrent cascade) reports `false` and is left untouched.
    async fn mark_deleted(&mut self, id: i64, now: DateTime<Utc>) -> Result<bool, AppError>;

    /// Adjusts a comment's cached direct-reply count, floored at zero.
    async fn bump_replies_count(&mut self, parent_id: i64, delta: i32) -> Result<(), AppError>;

    /// Adjusts a post's cached total-comment count, floored at zero.
    async fn bump_post_comments_count(&mut self, post_id: i64, delta: i32)
    -> Result<(), AppError>;

    /// The (target, user) like row, whatever its current flag.
    async fn get_like(
        &mut self,
        target: LikeTarget,
        user_id: i64,
    ) -> Result<Option<LikeRow>, AppError>;

    /// Inserts or overwrites the single (target, user) like row.
    async fn upsert_like(
        &mut self,
        target: LikeTarget,
        user_id: i64,
        liked: bool,
        now: DateTime<Utc>,
    ) -> Result<LikeRow, AppError>;

    /// Authoritative recount: like rows for the target with the flag set.
    async fn count_likes(&mut self, target: LikeTarget) -> Result<i64, AppError>;

    /// Writes a freshly recomputed total into the target's cached counter.
    async fn set_likes_count(&mut self, target: LikeTarget, count: i64) -> Result<(), AppError>;

    /// Author display fields for the given user ids; absent ids are simply
    /// missing from the map.
    async fn load_authors(
        &mut self,
        ids: &[i64],
    ) -> Result<HashMap<i64, CommentAuthor>, AppError>;

    /// Ids of the post's comments the viewer currently likes. Lets the
    /// thread builder resolve `isLiked` without one probe per node.
    async fn liked_comment_ids(
        &mut self,
        viewer_id: i64,
        post_id: i64,
    ) -> Result<HashSet<i64>, AppError>;

    async fn commit(self) -> Result<(), AppError>;
}

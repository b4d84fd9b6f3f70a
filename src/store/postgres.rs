// src/store/postgres.rs

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    error::AppError,
    models::{
        comment::{Comment, CommentAuthor, LikeRow, LikeTarget, NewComment},
        page::{Page, PageRequest, SortOrder},
        post::PostRef,
    },
    store::{CommentStore, CommentStoreTx},
};

const COMMENT_COLUMNS: &str = "id, post_id, author_id, content, parent_id, level, deleted, \
     replies_count, likes_count, created_at, updated_at";

/// Production adapter backed by a Postgres pool.
///
/// Counter floors are single `GREATEST(0, ...)` statements and cascade
/// marking is a conditional transition (`WHERE deleted = FALSE`), so two
/// overlapping cascades can never double-decrement a shared counter.
#[derive(Clone)]
pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgCommentTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CommentStore for PgCommentStore {
    type Tx = PgCommentTx;

    async fn begin(&self) -> Result<Self::Tx, AppError> {
        let tx = self.pool.begin().await?;
        Ok(PgCommentTx { tx })
    }
}

#[async_trait]
impl CommentStoreTx for PgCommentTx {
    async fn get_post(&mut self, id: i64) -> Result<Option<PostRef>, AppError> {
        let post = sqlx::query_as::<_, PostRef>(
            r#"
            SELECT id, user_id AS author_id, likes_count, comments_count,
                   (deleted_at IS NOT NULL) AS deleted
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(post)
    }

    async fn get_comment(&mut self, id: i64) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(comment)
    }

    async fn list_comments_by_post(&mut self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE post_id = $1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(post_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(comments)
    }

    async fn list_root_comments(
        &mut self,
        post_id: i64,
        page: &PageRequest,
    ) -> Result<Page<Comment>, AppError> {
        let order = match page.sort {
            SortOrder::NewestFirst => "ORDER BY created_at DESC, id DESC",
            SortOrder::OldestFirst => "ORDER BY created_at ASC, id ASC",
        };

        let items = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE post_id = $1 AND parent_id IS NULL \
             {order} \
             LIMIT $2 OFFSET $3"
        ))
        .bind(post_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&mut *self.tx)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM comments WHERE post_id = $1 AND parent_id IS NULL",
        )
        .bind(post_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(Page {
            items,
            total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    async fn list_children(&mut self, parent_id: i64) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE parent_id = $1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(parent_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(comments)
    }

    async fn insert_comment(&mut self, new: NewComment) -> Result<Comment, AppError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "INSERT INTO comments \
                 (post_id, author_id, content, parent_id, level, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(new.post_id)
        .bind(new.author_id)
        .bind(&new.content)
        .bind(new.parent_id)
        .bind(new.level)
        .bind(new.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(comment)
    }

    async fn update_content(
        &mut self,
        id: i64,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Comment, AppError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "UPDATE comments SET content = $2, updated_at = $3 \
             WHERE id = $1 \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(content)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(comment)
    }

    async fn mark_deleted(&mut self, id: i64, now: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE comments SET deleted = TRUE, updated_at = $2 \
             WHERE id = $1 AND deleted = FALSE",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn bump_replies_count(&mut self, parent_id: i64, delta: i32) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE comments SET replies_count = GREATEST(0, replies_count + $2) WHERE id = $1",
        )
        .bind(parent_id)
        .bind(delta)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn bump_post_comments_count(
        &mut self,
        post_id: i64,
        delta: i32,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE posts SET comments_count = GREATEST(0, comments_count + $2) WHERE id = $1",
        )
        .bind(post_id)
        .bind(delta)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn get_like(
        &mut self,
        target: LikeTarget,
        user_id: i64,
    ) -> Result<Option<LikeRow>, AppError> {
        let sql = match target {
            LikeTarget::Post(_) => {
                "SELECT post_id AS target_id, user_id, is_liked, updated_at \
                 FROM post_likes WHERE post_id = $1 AND user_id = $2"
            }
            LikeTarget::Comment(_) => {
                "SELECT comment_id AS target_id, user_id, is_liked, updated_at \
                 FROM comment_likes WHERE comment_id = $1 AND user_id = $2"
            }
        };

        let row = sqlx::query_as::<_, LikeRow>(sql)
            .bind(target.id())
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row)
    }

    async fn upsert_like(
        &mut self,
        target: LikeTarget,
        user_id: i64,
        liked: bool,
        now: DateTime<Utc>,
    ) -> Result<LikeRow, AppError> {
        let sql = match target {
            LikeTarget::Post(_) => {
                "INSERT INTO post_likes (post_id, user_id, is_liked, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $4) \
                 ON CONFLICT (post_id, user_id) \
                 DO UPDATE SET is_liked = EXCLUDED.is_liked, updated_at = EXCLUDED.updated_at \
                 RETURNING post_id AS target_id, user_id, is_liked, updated_at"
            }
            LikeTarget::Comment(_) => {
                "INSERT INTO comment_likes (comment_id, user_id, is_liked, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $4) \
                 ON CONFLICT (comment_id, user_id) \
                 DO UPDATE SET is_liked = EXCLUDED.is_liked, updated_at = EXCLUDED.updated_at \
                 RETURNING comment_id AS target_id, user_id, is_liked, updated_at"
            }
        };

        let row = sqlx::query_as::<_, LikeRow>(sql)
            .bind(target.id())
            .bind(user_id)
            .bind(liked)
            .bind(now)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(row)
    }

    async fn count_likes(&mut self, target: LikeTarget) -> Result<i64, AppError> {
        let sql = match target {
            LikeTarget::Post(_) => {
                "SELECT COUNT(*) FROM post_likes WHERE post_id = $1 AND is_liked = TRUE"
            }
            LikeTarget::Comment(_) => {
                "SELECT COUNT(*) FROM comment_likes WHERE comment_id = $1 AND is_liked = TRUE"
            }
        };

        let count = sqlx::query_scalar::<_, i64>(sql)
            .bind(target.id())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(count)
    }

    async fn set_likes_count(&mut self, target: LikeTarget, count: i64) -> Result<(), AppError> {
        let sql = match target {
            LikeTarget::Post(_) => "UPDATE posts SET likes_count = $2 WHERE id = $1",
            LikeTarget::Comment(_) => "UPDATE comments SET likes_count = $2 WHERE id = $1",
        };

        sqlx::query(sql)
            .bind(target.id())
            .bind(count as i32)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn load_authors(
        &mut self,
        ids: &[i64],
    ) -> Result<HashMap<i64, CommentAuthor>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let authors = sqlx::query_as::<_, CommentAuthor>(
            "SELECT id, username, display_name, avatar_url FROM users WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(authors.into_iter().map(|a| (a.id, a)).collect())
    }

    async fn liked_comment_ids(
        &mut self,
        viewer_id: i64,
        post_id: i64,
    ) -> Result<HashSet<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT cl.comment_id
            FROM comment_likes cl
            JOIN comments c ON c.id = cl.comment_id
            WHERE cl.user_id = $1 AND c.post_id = $2 AND cl.is_liked = TRUE
            "#,
        )
        .bind(viewer_id)
        .bind(post_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}

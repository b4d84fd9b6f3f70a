// src/services/comments.rs
//
// Write paths of the comment tree: reply creation with capped depth
// assignment, owner edits, and the cascading soft-delete.

use chrono::Utc;

use crate::{
    error::AppError,
    models::comment::{CommentView, LikeTarget, MAX_COMMENT_LEVEL, NewComment},
    services::{CommentEngine, MAX_ANCESTOR_WALK, thread},
    store::{CommentStore, CommentStoreTx},
};

impl<S: CommentStore> CommentEngine<S> {
    /// Creates a root comment or a reply.
    ///
    /// Replies take `level = min(parent.level + 1, 2)` and require the
    /// parent and its whole ancestor chain to be alive. The parent's
    /// `replies_count` and the post's `comments_count` move in the same
    /// transaction as the insert.
    pub async fn create_comment(
        &self,
        author_id: i64,
        post_id: i64,
        content: &str,
        parent_id: Option<i64>,
    ) -> Result<CommentView, AppError> {
        self.validate_content(content)?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        tx.get_post(post_id)
            .await?
            .filter(|p| !p.deleted)
            .ok_or_else(|| AppError::NotFound(format!("Post {post_id} not found")))?;

        let level = match parent_id {
            None => 0,
            Some(pid) => {
                let parent = tx
                    .get_comment(pid)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Parent comment {pid} not found")))?;

                if parent.post_id != post_id {
                    return Err(AppError::Validation(
                        "Parent comment belongs to a different post".to_string(),
                    ));
                }
                if parent.deleted {
                    return Err(AppError::AlreadyDeleted(
                        "Cannot reply to a deleted comment".to_string(),
                    ));
                }
                ensure_ancestors_alive(&mut tx, parent.parent_id).await?;

                (parent.level + 1).min(MAX_COMMENT_LEVEL)
            }
        };

        let author = tx
            .load_authors(&[author_id])
            .await?
            .remove(&author_id)
            .ok_or_else(|| AppError::NotFound(format!("User {author_id} not found")))?;

        let comment = tx
            .insert_comment(NewComment {
                post_id,
                author_id,
                content: content.to_string(),
                parent_id,
                level,
                created_at: now,
            })
            .await?;

        if let Some(pid) = parent_id {
            tx.bump_replies_count(pid, 1).await?;
        }
        tx.bump_post_comments_count(post_id, 1).await?;

        tx.commit().await?;

        tracing::info!(comment_id = comment.id, post_id, level, "comment created");
        Ok(thread::render_single(
            &comment,
            Some(&author),
            Some(author_id),
            false,
        ))
    }

    /// Rewrites a comment's body. Author only; the comment and its whole
    /// ancestor chain must be alive.
    pub async fn update_comment(
        &self,
        requester_id: i64,
        comment_id: i64,
        content: &str,
    ) -> Result<CommentView, AppError> {
        self.validate_content(content)?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let comment = tx
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {comment_id} not found")))?;

        if comment.author_id != requester_id {
            return Err(AppError::PermissionDenied(
                "You are not allowed to edit this comment".to_string(),
            ));
        }
        if comment.deleted {
            return Err(AppError::AlreadyDeleted(
                "Comment has been deleted".to_string(),
            ));
        }
        ensure_ancestors_alive(&mut tx, comment.parent_id).await?;

        let updated = tx.update_content(comment_id, content, now).await?;

        let is_liked = tx
            .get_like(LikeTarget::Comment(comment_id), requester_id)
            .await?
            .map(|l| l.is_liked)
            .unwrap_or(false);
        let authors = tx.load_authors(&[updated.author_id]).await?;

        tx.commit().await?;

        Ok(thread::render_single(
            &updated,
            authors.get(&updated.author_id),
            Some(requester_id),
            is_liked,
        ))
    }

    /// Soft-deletes a comment together with every live descendant, as one
    /// transaction. Returns the number of nodes marked (target included).
    ///
    /// A second call on the same id fails `AlreadyDeleted` without touching
    /// any counter.
    pub async fn delete_comment(
        &self,
        requester_id: i64,
        comment_id: i64,
    ) -> Result<usize, AppError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let target = tx
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {comment_id} not found")))?;

        if target.author_id != requester_id {
            return Err(AppError::PermissionDenied(
                "You are not allowed to delete this comment".to_string(),
            ));
        }
        if target.deleted {
            return Err(AppError::AlreadyDeleted(
                "Comment has been deleted".to_string(),
            ));
        }
        ensure_ancestors_alive(&mut tx, target.parent_id).await?;

        // Pre-order over the live subtree. Each node is claimed through a
        // conditional transition; a node another cascade already claimed
        // reports false and its subtree is left to that cascade, so a
        // shared counter is never decremented twice.
        let mut stack = vec![comment_id];
        let mut marked = 0usize;
        while let Some(id) = stack.pop() {
            if !tx.mark_deleted(id, now).await? {
                continue;
            }
            marked += 1;

            let children = tx.list_children(id).await?;
            for child in children.iter().rev() {
                if !child.deleted {
                    stack.push(child.id);
                }
            }
        }

        if let Some(pid) = target.parent_id {
            tx.bump_replies_count(pid, -1).await?;
        }
        tx.bump_post_comments_count(target.post_id, -(marked as i32))
            .await?;

        tx.commit().await?;

        tracing::info!(comment_id, removed = marked, "comment cascade deleted");
        Ok(marked)
    }
}

/// Walks parent-by-parent to the root, failing `AlreadyDeleted` on the
/// first dead ancestor. Bounded because the stored chain is not.
async fn ensure_ancestors_alive<T: CommentStoreTx>(
    tx: &mut T,
    start: Option<i64>,
) -> Result<(), AppError> {
    let mut cursor = start;
    let mut hops = 0usize;

    while let Some(id) = cursor {
        hops += 1;
        if hops > MAX_ANCESTOR_WALK {
            return Err(AppError::InternalServerError(format!(
                "reply chain exceeds {MAX_ANCESTOR_WALK} ancestors"
            )));
        }

        let ancestor = tx.get_comment(id).await?.ok_or_else(|| {
            AppError::InternalServerError(format!("comment references missing ancestor {id}"))
        })?;
        if ancestor.deleted {
            return Err(AppError::AlreadyDeleted(
                "A parent comment has been deleted".to_string(),
            ));
        }
        cursor = ancestor.parent_id;
    }

    Ok(())
}

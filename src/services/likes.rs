// src/services/likes.rs
//
// Like-count reconciliation. The cached counter is never incremented or
// decremented in place: every toggle flips the single (target, user) row
// and then recounts from the like rows inside the same transaction, so
// interleaved toggles by different users converge without a global lock.

use chrono::Utc;

use crate::{
    error::AppError,
    models::comment::{LikeStatus, LikeTarget},
    services::CommentEngine,
    store::{CommentStore, CommentStoreTx},
};

impl<S: CommentStore> CommentEngine<S> {
    /// Toggles the requester's like on a post or comment and returns the
    /// new per-user state plus the recomputed authoritative total.
    ///
    /// Toggling twice returns both values to where they started.
    pub async fn toggle_like(
        &self,
        requester_id: i64,
        target: LikeTarget,
    ) -> Result<LikeStatus, AppError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        match target {
            LikeTarget::Post(id) => {
                tx.get_post(id)
                    .await?
                    .filter(|p| !p.deleted)
                    .ok_or_else(|| AppError::NotFound(format!("Post {id} not found")))?;
            }
            LikeTarget::Comment(id) => {
                tx.get_comment(id)
                    .await?
                    .filter(|c| !c.deleted)
                    .ok_or_else(|| AppError::NotFound(format!("Comment {id} not found")))?;
            }
        }

        let liked = match tx.get_like(target, requester_id).await? {
            Some(row) => !row.is_liked,
            None => true,
        };
        tx.upsert_like(target, requester_id, liked, now).await?;

        let count = tx.count_likes(target).await?;
        tx.set_likes_count(target, count).await?;

        tx.commit().await?;

        Ok(LikeStatus { liked, count })
    }
}

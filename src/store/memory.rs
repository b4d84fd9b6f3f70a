// src/store/memory.rs

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::AppError,
    models::{
        comment::{Comment, CommentAuthor, LikeRow, LikeTarget, NewComment},
        page::{Page, PageRequest, SortOrder},
        post::PostRef,
    },
    store::{CommentStore, CommentStoreTx},
};

/// In-process adapter behind the same trait as the Postgres store.
///
/// A transaction takes the store-wide lock and works on a scratch copy of
/// the state; `commit` writes the copy back, dropping the handle discards
/// it. Writers are therefore fully serialized, which trivially satisfies
/// the engine's isolation requirements.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    users: BTreeMap<i64, CommentAuthor>,
    posts: BTreeMap<i64, PostRef>,
    comments: BTreeMap<i64, Comment>,
    /// Keyed by (target_id, user_id), one namespace per like kind.
    post_likes: HashMap<(i64, i64), LikeRow>,
    comment_likes: HashMap<(i64, i64), LikeRow>,
}

impl MemoryState {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn likes(&self, target: LikeTarget) -> &HashMap<(i64, i64), LikeRow> {
        match target {
            LikeTarget::Post(_) => &self.post_likes,
            LikeTarget::Comment(_) => &self.comment_likes,
        }
    }

    fn likes_mut(&mut self, target: LikeTarget) -> &mut HashMap<(i64, i64), LikeRow> {
        match target {
            LikeTarget::Post(_) => &mut self.post_likes,
            LikeTarget::Comment(_) => &mut self.comment_likes,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user and returns its id.
    pub async fn seed_user(&self, username: &str) -> i64 {
        let mut state = self.inner.lock().await;
        let id = state.alloc_id();
        state.users.insert(
            id,
            CommentAuthor {
                id,
                username: username.to_string(),
                display_name: Some(username.to_string()),
                avatar_url: None,
            },
        );
        id
    }

    /// Inserts an empty post owned by `author_id` and returns its id.
    pub async fn seed_post(&self, author_id: i64) -> i64 {
        let mut state = self.inner.lock().await;
        let id = state.alloc_id();
        state.posts.insert(
            id,
            PostRef {
                id,
                author_id,
                likes_count: 0,
                comments_count: 0,
                deleted: false,
            },
        );
        id
    }

    /// Soft-deletes a post directly, bypassing the engine.
    pub async fn delete_post(&self, post_id: i64) {
        let mut state = self.inner.lock().await;
        if let Some(post) = state.posts.get_mut(&post_id) {
            post.deleted = true;
        }
    }

    /// Flips a comment's deleted flag directly, bypassing the engine's
    /// cascade. For exercising read paths against data shaped by older
    /// systems where descendants outlived a deleted ancestor.
    pub async fn mark_comment_deleted(&self, comment_id: i64) {
        let mut state = self.inner.lock().await;
        if let Some(comment) = state.comments.get_mut(&comment_id) {
            comment.deleted = true;
        }
    }

    /// Test inspection: current state of a post row.
    pub async fn post(&self, post_id: i64) -> Option<PostRef> {
        self.inner.lock().await.posts.get(&post_id).cloned()
    }

    /// Test inspection: current state of a comment row.
    pub async fn comment(&self, comment_id: i64) -> Option<Comment> {
        self.inner.lock().await.comments.get(&comment_id).cloned()
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

fn sorted_chronological(mut comments: Vec<Comment>) -> Vec<Comment> {
    comments.sort_by_key(|c| (c.created_at, c.id));
    comments
}

#[async_trait]
impl CommentStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx, AppError> {
        let guard = self.inner.clone().lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx { guard, work })
    }
}

#[async_trait]
impl CommentStoreTx for MemoryTx {
    async fn get_post(&mut self, id: i64) -> Result<Option<PostRef>, AppError> {
        Ok(self.work.posts.get(&id).cloned())
    }

    async fn get_comment(&mut self, id: i64) -> Result<Option<Comment>, AppError> {
        Ok(self.work.comments.get(&id).cloned())
    }

    async fn list_comments_by_post(&mut self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let comments = self
            .work
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        Ok(sorted_chronological(comments))
    }

    async fn list_root_comments(
        &mut self,
        post_id: i64,
        page: &PageRequest,
    ) -> Result<Page<Comment>, AppError> {
        let mut roots: Vec<Comment> = self
            .work
            .comments
            .values()
            .filter(|c| c.post_id == post_id && c.parent_id.is_none())
            .cloned()
            .collect();
        roots.sort_by_key(|c| (c.created_at, c.id));
        if page.sort == SortOrder::NewestFirst {
            roots.reverse();
        }

        let total = roots.len() as i64;
        let items = roots
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect();

        Ok(Page {
            items,
            total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    async fn list_children(&mut self, parent_id: i64) -> Result<Vec<Comment>, AppError> {
        let children = self
            .work
            .comments
            .values()
            .filter(|c| c.parent_id == Some(parent_id))
            .cloned()
            .collect();
        Ok(sorted_chronological(children))
    }

    async fn insert_comment(&mut self, new: NewComment) -> Result<Comment, AppError> {
        let id = self.work.alloc_id();
        let comment = Comment {
            id,
            post_id: new.post_id,
            author_id: new.author_id,
            content: new.content,
            parent_id: new.parent_id,
            level: new.level,
            deleted: false,
            replies_count: 0,
            likes_count: 0,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        self.work.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn update_content(
        &mut self,
        id: i64,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Comment, AppError> {
        let comment = self
            .work
            .comments
            .get_mut(&id)
            .ok_or_else(|| AppError::InternalServerError(format!("no comment row {id}")))?;
        comment.content = content.to_string();
        comment.updated_at = now;
        Ok(comment.clone())
    }

    async fn mark_deleted(&mut self, id: i64, now: DateTime<Utc>) -> Result<bool, AppError> {
        match self.work.comments.get_mut(&id) {
            Some(c) if !c.deleted => {
                c.deleted = true;
                c.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn bump_replies_count(&mut self, parent_id: i64, delta: i32) -> Result<(), AppError> {
        if let Some(parent) = self.work.comments.get_mut(&parent_id) {
            parent.replies_count = (parent.replies_count + delta).max(0);
        }
        Ok(())
    }

    async fn bump_post_comments_count(
        &mut self,
        post_id: i64,
        delta: i32,
    ) -> Result<(), AppError> {
        if let Some(post) = self.work.posts.get_mut(&post_id) {
            post.comments_count = (post.comments_count + delta).max(0);
        }
        Ok(())
    }

    async fn get_like(
        &mut self,
        target: LikeTarget,
        user_id: i64,
    ) -> Result<Option<LikeRow>, AppError> {
        Ok(self.work.likes(target).get(&(target.id(), user_id)).cloned())
    }

    async fn upsert_like(
        &mut self,
        target: LikeTarget,
        user_id: i64,
        liked: bool,
        now: DateTime<Utc>,
    ) -> Result<LikeRow, AppError> {
        let row = LikeRow {
            target_id: target.id(),
            user_id,
            is_liked: liked,
            updated_at: now,
        };
        self.work
            .likes_mut(target)
            .insert((target.id(), user_id), row.clone());
        Ok(row)
    }

    async fn count_likes(&mut self, target: LikeTarget) -> Result<i64, AppError> {
        let count = self
            .work
            .likes(target)
            .values()
            .filter(|l| l.target_id == target.id() && l.is_liked)
            .count();
        Ok(count as i64)
    }

    async fn set_likes_count(&mut self, target: LikeTarget, count: i64) -> Result<(), AppError> {
        match target {
            LikeTarget::Post(id) => {
                if let Some(post) = self.work.posts.get_mut(&id) {
                    post.likes_count = count as i32;
                }
            }
            LikeTarget::Comment(id) => {
                if let Some(comment) = self.work.comments.get_mut(&id) {
                    comment.likes_count = count as i32;
                }
            }
        }
        Ok(())
    }

    async fn load_authors(
        &mut self,
        ids: &[i64],
    ) -> Result<HashMap<i64, CommentAuthor>, AppError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.work.users.get(id).map(|a| (*id, a.clone())))
            .collect())
    }

    async fn liked_comment_ids(
        &mut self,
        viewer_id: i64,
        post_id: i64,
    ) -> Result<HashSet<i64>, AppError> {
        let ids = self
            .work
            .comment_likes
            .values()
            .filter(|l| l.user_id == viewer_id && l.is_liked)
            .filter(|l| {
                self.work
                    .comments
                    .get(&l.target_id)
                    .is_some_and(|c| c.post_id == post_id)
            })
            .map(|l| l.target_id)
            .collect();
        Ok(ids)
    }

    async fn commit(self) -> Result<(), AppError> {
        let MemoryTx { mut guard, work } = self;
        *guard = work;
        Ok(())
    }
}

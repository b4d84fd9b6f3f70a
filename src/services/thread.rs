// src/services/thread.rs
//
// Read-path assembly of a paged, depth-capped thread. One query for the
// root page, one flat fetch of everything under the post, an O(N)
// adjacency build, then recursive emission with flattening at the deepest
// rendered tier.

use std::collections::{HashMap, HashSet};

use crate::{
    error::AppError,
    models::{
        comment::{Comment, CommentAuthor, CommentView, MAX_COMMENT_LEVEL},
        page::{Page, PageRequest},
    },
    services::CommentEngine,
    store::{CommentStore, CommentStoreTx},
};

/// Placeholders emitted instead of the redacted fields of a deleted node.
const DELETED_AUTHOR: &str = "[deleted]";
const DELETED_CONTENT: &str = "[removed]";
/// Shown when an active comment's author row no longer resolves.
const UNKNOWN_AUTHOR: &str = "[unknown]";

impl<S: CommentStore> CommentEngine<S> {
    /// Assembles one page of the post's thread for display.
    ///
    /// Deleted nodes are emitted as redacted placeholders with their
    /// position preserved, so a dead ancestor never orphans its surviving
    /// descendants. Read-only: no counter or row is touched.
    pub async fn list_thread(
        &self,
        post_id: i64,
        page: PageRequest,
        viewer_id: Option<i64>,
    ) -> Result<Page<CommentView>, AppError> {
        let mut tx = self.store.begin().await?;

        tx.get_post(post_id)
            .await?
            .filter(|p| !p.deleted)
            .ok_or_else(|| AppError::NotFound(format!("Post {post_id} not found")))?;

        let roots = tx.list_root_comments(post_id, &page).await?;
        let all = tx.list_comments_by_post(post_id).await?;

        let mut author_ids: Vec<i64> = all.iter().map(|c| c.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors = tx.load_authors(&author_ids).await?;

        let liked = match viewer_id {
            Some(viewer) => tx.liked_comment_ids(viewer, post_id).await?,
            None => HashSet::new(),
        };

        tx.commit().await?;

        let children = children_by_parent(&all);
        let items = roots
            .items
            .iter()
            .map(|root| {
                let mut view = render(root, classify(root, &authors), viewer_id, &liked);
                view.replies = build_children(root.id, 1, &children, &authors, viewer_id, &liked);
                view
            })
            .collect();

        Ok(Page {
            items,
            total: roots.total,
            offset: roots.offset,
            limit: roots.limit,
        })
    }
}

/// What a node is allowed to reveal. Deleted nodes carry no author or
/// content at all, so a redacted field cannot leak through a generic
/// accessor further down the rendering path.
enum NodeBody<'a> {
    Active {
        content: &'a str,
        author: Option<&'a CommentAuthor>,
    },
    Deleted,
}

fn classify<'a>(
    comment: &'a Comment,
    authors: &'a HashMap<i64, CommentAuthor>,
) -> NodeBody<'a> {
    if comment.deleted {
        NodeBody::Deleted
    } else {
        NodeBody::Active {
            content: &comment.content,
            author: authors.get(&comment.author_id),
        }
    }
}

fn render(
    comment: &Comment,
    body: NodeBody<'_>,
    viewer_id: Option<i64>,
    liked: &HashSet<i64>,
) -> CommentView {
    match body {
        NodeBody::Deleted => CommentView {
            id: comment.id,
            content: DELETED_CONTENT.to_string(),
            author_name: DELETED_AUTHOR.to_string(),
            author_display_name: DELETED_AUTHOR.to_string(),
            author_avatar: None,
            parent_id: comment.parent_id,
            level: comment.level,
            likes_count: comment.likes_count,
            replies_count: comment.replies_count,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            is_liked: false,
            is_owner: false,
            deleted: true,
            replies: Vec::new(),
        },
        NodeBody::Active { content, author } => {
            let author_name = author
                .map(|a| a.username.clone())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
            let author_display_name = author
                .and_then(|a| a.display_name.clone())
                .unwrap_or_else(|| author_name.clone());

            CommentView {
                id: comment.id,
                content: content.to_string(),
                author_name,
                author_display_name,
                author_avatar: author.and_then(|a| a.avatar_url.clone()),
                parent_id: comment.parent_id,
                level: comment.level,
                likes_count: comment.likes_count,
                replies_count: comment.replies_count,
                created_at: comment.created_at,
                updated_at: comment.updated_at,
                is_liked: viewer_id.is_some() && liked.contains(&comment.id),
                is_owner: viewer_id == Some(comment.author_id),
                deleted: false,
                replies: Vec::new(),
            }
        }
    }
}

/// Renders one node without its subtree. Used by the write paths to echo
/// a created or edited comment back to its author.
pub(crate) fn render_single(
    comment: &Comment,
    author: Option<&CommentAuthor>,
    viewer_id: Option<i64>,
    is_liked: bool,
) -> CommentView {
    let mut authors = HashMap::new();
    if let Some(a) = author {
        authors.insert(a.id, a.clone());
    }
    let mut liked = HashSet::new();
    if is_liked {
        liked.insert(comment.id);
    }
    render(comment, classify(comment, &authors), viewer_id, &liked)
}

/// Adjacency map from parent id to its children, each bucket ordered by
/// `(created_at, id)`.
fn children_by_parent(all: &[Comment]) -> HashMap<i64, Vec<&Comment>> {
    let mut map: HashMap<i64, Vec<&Comment>> = HashMap::new();
    for comment in all {
        if let Some(pid) = comment.parent_id {
            map.entry(pid).or_default().push(comment);
        }
    }
    for bucket in map.values_mut() {
        bucket.sort_by_key(|c| (c.created_at, c.id));
    }
    map
}

/// Emits the children of `parent_id` at the given rendered tier.
///
/// Tiers 0 and 1 nest normally. At the deepest rendered tier every node's
/// remaining subtree is flattened beside it: the whole group - the tier's
/// direct members plus all of their descendants - becomes one
/// chronologically ordered array instead of nesting further.
fn build_children(
    parent_id: i64,
    rendered_level: i32,
    children: &HashMap<i64, Vec<&Comment>>,
    authors: &HashMap<i64, CommentAuthor>,
    viewer_id: Option<i64>,
    liked: &HashSet<i64>,
) -> Vec<CommentView> {
    let Some(kids) = children.get(&parent_id) else {
        return Vec::new();
    };

    if rendered_level < MAX_COMMENT_LEVEL {
        kids.iter()
            .map(|kid| {
                let mut view = render(kid, classify(kid, authors), viewer_id, liked);
                view.replies = build_children(
                    kid.id,
                    rendered_level + 1,
                    children,
                    authors,
                    viewer_id,
                    liked,
                );
                view
            })
            .collect()
    } else {
        let mut group: Vec<&Comment> = Vec::new();
        for kid in kids {
            collect_subtree(kid, children, &mut group);
        }
        group.sort_by_key(|c| (c.created_at, c.id));
        group
            .into_iter()
            .map(|c| render(c, classify(c, authors), viewer_id, liked))
            .collect()
    }
}

/// Pre-order collection of a node and every descendant, via an explicit
/// stack over the adjacency map.
fn collect_subtree<'a>(
    node: &'a Comment,
    children: &HashMap<i64, Vec<&'a Comment>>,
    out: &mut Vec<&'a Comment>,
) {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        out.push(current);
        if let Some(kids) = children.get(&current.id) {
            for kid in kids.iter().rev() {
                stack.push(kid);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn comment(id: i64, parent_id: Option<i64>, level: i32, secs: u32) -> Comment {
        Comment {
            id,
            post_id: 1,
            author_id: 100,
            content: format!("comment {id}"),
            parent_id,
            level,
            deleted: false,
            replies_count: 0,
            likes_count: 0,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, secs).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, secs).unwrap(),
        }
    }

    fn author(id: i64, name: &str) -> (i64, CommentAuthor) {
        (
            id,
            CommentAuthor {
                id,
                username: name.to_string(),
                display_name: Some(name.to_string()),
                avatar_url: None,
            },
        )
    }

    #[test]
    fn children_buckets_are_chronological() {
        // Out-of-order input must not leak into sibling order.
        let all = vec![
            comment(1, None, 0, 0),
            comment(4, Some(1), 1, 30),
            comment(2, Some(1), 1, 10),
            comment(3, Some(1), 1, 20),
        ];

        let map = children_by_parent(&all);
        let order: Vec<i64> = map[&1].iter().map(|c| c.id).collect();
        assert_eq!(order, vec![2, 3, 4]);
    }

    #[test]
    fn descendants_past_the_cap_are_flattened_chronologically() {
        // 1 (root) <- 2 <- 3 <- 4 <- 5, with 6 a second child of 2.
        // Rendered: 2 nests under 1; the tier under 2 is the flat group
        // {3, 6} plus 3's whole chain, sorted by time.
        let all = vec![
            comment(1, None, 0, 0),
            comment(2, Some(1), 1, 10),
            comment(3, Some(2), 2, 20),
            comment(4, Some(3), 2, 30),
            comment(5, Some(4), 2, 40),
            comment(6, Some(2), 2, 25),
        ];
        let authors: HashMap<i64, CommentAuthor> = [author(100, "alice")].into();

        let children = children_by_parent(&all);
        let tier = build_children(1, 1, &children, &authors, None, &HashSet::new());

        assert_eq!(tier.len(), 1);
        assert_eq!(tier[0].id, 2);

        let flat: Vec<i64> = tier[0].replies.iter().map(|v| v.id).collect();
        assert_eq!(flat, vec![3, 6, 4, 5]);
        assert!(tier[0].replies.iter().all(|v| v.replies.is_empty()));
    }

    #[test]
    fn deleted_node_is_redacted_but_keeps_its_place() {
        let mut dead = comment(2, Some(1), 1, 10);
        dead.deleted = true;
        dead.content = "secret".to_string();
        let all = vec![comment(1, None, 0, 0), dead, comment(3, Some(2), 2, 20)];
        let authors: HashMap<i64, CommentAuthor> = [author(100, "alice")].into();

        let children = children_by_parent(&all);
        let tier = build_children(1, 1, &children, &authors, Some(100), &HashSet::new());

        let node = &tier[0];
        assert_eq!(node.id, 2);
        assert_eq!(node.content, DELETED_CONTENT);
        assert_eq!(node.author_name, DELETED_AUTHOR);
        assert!(node.author_avatar.is_none());
        assert!(!node.is_owner);
        assert!(!node.is_liked);
        // The live child still hangs off the placeholder.
        assert_eq!(node.replies.len(), 1);
        assert_eq!(node.replies[0].id, 3);
    }

    #[test]
    fn viewer_flags_only_apply_to_live_nodes() {
        let all = vec![comment(1, None, 0, 0)];
        let authors: HashMap<i64, CommentAuthor> = [author(100, "alice")].into();
        let liked: HashSet<i64> = [1].into();

        let children = children_by_parent(&all);
        let view = render(&all[0], classify(&all[0], &authors), Some(100), &liked);
        assert!(view.is_owner);
        assert!(view.is_liked);

        let anon = render(&all[0], classify(&all[0], &authors), None, &liked);
        assert!(!anon.is_owner);
        assert!(!anon.is_liked);
    }
}

// tests/comment_engine_tests.rs
//
// Engine-level tests against the in-process store: depth assignment,
// cascade deletion, like reconciliation, and thread assembly, driven
// through the same API the HTTP layer uses.

use social_backend::error::AppError;
use social_backend::models::comment::{CommentView, LikeTarget};
use social_backend::models::page::{Page, PageRequest, SortOrder};
use social_backend::services::{CommentEngine, CommentPolicy};
use social_backend::store::MemoryStore;

async fn setup() -> (CommentEngine<MemoryStore>, MemoryStore, i64, i64) {
    let store = MemoryStore::new();
    let author = store.seed_user("alice").await;
    let post = store.seed_post(author).await;
    let engine = CommentEngine::new(store.clone(), CommentPolicy::default());
    (engine, store, author, post)
}

fn find<'a>(views: &'a [CommentView], id: i64) -> &'a CommentView {
    views
        .iter()
        .find(|v| v.id == id)
        .unwrap_or_else(|| panic!("comment {id} not in page"))
}

#[tokio::test]
async fn reply_levels_are_capped_and_counters_track_creation() {
    // Arrange
    let (engine, store, alice, post) = setup().await;

    // Act: root, reply, nested reply, reply past the cap
    let c1 = engine
        .create_comment(alice, post, "Hello", None)
        .await
        .unwrap();
    let c2 = engine
        .create_comment(alice, post, "Hi", Some(c1.id))
        .await
        .unwrap();
    let c3 = engine
        .create_comment(alice, post, "Nested", Some(c2.id))
        .await
        .unwrap();
    let c4 = engine
        .create_comment(alice, post, "Deep", Some(c3.id))
        .await
        .unwrap();

    // Assert: levels 0, 1, 2, min(2+1, 2)
    assert_eq!(c1.level, 0);
    assert_eq!(c2.level, 1);
    assert_eq!(c3.level, 2);
    assert_eq!(c4.level, 2);

    assert_eq!(store.comment(c1.id).await.unwrap().replies_count, 1);
    assert_eq!(store.comment(c2.id).await.unwrap().replies_count, 1);
    assert_eq!(store.comment(c3.id).await.unwrap().replies_count, 1);
    assert_eq!(store.post(post).await.unwrap().comments_count, 4);
}

#[tokio::test]
async fn thread_nests_two_tiers_and_flattens_the_rest() {
    let (engine, _store, alice, post) = setup().await;

    let c1 = engine
        .create_comment(alice, post, "Hello", None)
        .await
        .unwrap();
    let c2 = engine
        .create_comment(alice, post, "Hi", Some(c1.id))
        .await
        .unwrap();
    let c3 = engine
        .create_comment(alice, post, "Nested", Some(c2.id))
        .await
        .unwrap();
    let c4 = engine
        .create_comment(alice, post, "Deep", Some(c3.id))
        .await
        .unwrap();

    let thread = engine
        .list_thread(post, PageRequest::default(), Some(alice))
        .await
        .unwrap();

    assert_eq!(thread.total, 1);
    let root = find(&thread.items, c1.id);
    assert_eq!(root.replies.len(), 1);
    assert_eq!(root.replies[0].id, c2.id);

    // c4 is flattened alongside c3, not nested inside it.
    let tier: Vec<i64> = root.replies[0].replies.iter().map(|v| v.id).collect();
    assert_eq!(tier, vec![c3.id, c4.id]);
    assert!(root.replies[0].replies.iter().all(|v| v.replies.is_empty()));
}

#[tokio::test]
async fn cascade_delete_marks_descendants_and_settles_counters() {
    let (engine, store, alice, post) = setup().await;

    let c1 = engine
        .create_comment(alice, post, "Hello", None)
        .await
        .unwrap();
    let c2 = engine
        .create_comment(alice, post, "Hi", Some(c1.id))
        .await
        .unwrap();
    let c3 = engine
        .create_comment(alice, post, "Nested", Some(c2.id))
        .await
        .unwrap();
    let c4 = engine
        .create_comment(alice, post, "Deep", Some(c3.id))
        .await
        .unwrap();

    let removed = engine.delete_comment(alice, c2.id).await.unwrap();

    assert_eq!(removed, 3);
    assert!(store.comment(c2.id).await.unwrap().deleted);
    assert!(store.comment(c3.id).await.unwrap().deleted);
    assert!(store.comment(c4.id).await.unwrap().deleted);
    assert!(!store.comment(c1.id).await.unwrap().deleted);

    assert_eq!(store.comment(c1.id).await.unwrap().replies_count, 0);
    assert_eq!(store.post(post).await.unwrap().comments_count, 1);
}

#[tokio::test]
async fn second_delete_fails_and_leaves_counters_alone() {
    let (engine, store, alice, post) = setup().await;

    let c1 = engine
        .create_comment(alice, post, "Hello", None)
        .await
        .unwrap();
    let c2 = engine
        .create_comment(alice, post, "Hi", Some(c1.id))
        .await
        .unwrap();

    engine.delete_comment(alice, c2.id).await.unwrap();
    let before = store.post(post).await.unwrap().comments_count;

    let err = engine.delete_comment(alice, c2.id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyDeleted(_)));

    assert_eq!(store.post(post).await.unwrap().comments_count, before);
    assert_eq!(store.comment(c1.id).await.unwrap().replies_count, 0);
}

#[tokio::test]
async fn only_the_author_may_delete_or_edit() {
    let (engine, store, alice, post) = setup().await;
    let bob = store.seed_user("bob").await;

    let c1 = engine
        .create_comment(alice, post, "Hello", None)
        .await
        .unwrap();

    let err = engine.delete_comment(bob, c1.id).await.unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));

    let err = engine.update_comment(bob, c1.id, "hijack").await.unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));
}

#[tokio::test]
async fn like_toggle_round_trips() {
    let (engine, store, alice, post) = setup().await;
    let user_x = store.seed_user("xavier").await;

    let c1 = engine
        .create_comment(alice, post, "Hello", None)
        .await
        .unwrap();

    let on = engine
        .toggle_like(user_x, LikeTarget::Comment(c1.id))
        .await
        .unwrap();
    assert!(on.liked);
    assert_eq!(on.count, 1);
    assert_eq!(store.comment(c1.id).await.unwrap().likes_count, 1);

    let off = engine
        .toggle_like(user_x, LikeTarget::Comment(c1.id))
        .await
        .unwrap();
    assert!(!off.liked);
    assert_eq!(off.count, 0);
    assert_eq!(store.comment(c1.id).await.unwrap().likes_count, 0);
}

#[tokio::test]
async fn like_counts_come_from_the_rows_not_the_cache() {
    let (engine, store, _alice, post) = setup().await;
    let bob = store.seed_user("bob").await;
    let carol = store.seed_user("carol").await;

    let status = engine
        .toggle_like(bob, LikeTarget::Post(post))
        .await
        .unwrap();
    assert_eq!(status.count, 1);

    let status = engine
        .toggle_like(carol, LikeTarget::Post(post))
        .await
        .unwrap();
    assert_eq!(status.count, 2);

    // Bob withdrawing cannot clobber Carol's like.
    let status = engine
        .toggle_like(bob, LikeTarget::Post(post))
        .await
        .unwrap();
    assert!(!status.liked);
    assert_eq!(status.count, 1);
    assert_eq!(store.post(post).await.unwrap().likes_count, 1);
}

#[tokio::test]
async fn liking_a_deleted_comment_is_not_found() {
    let (engine, store, alice, post) = setup().await;
    let bob = store.seed_user("bob").await;

    let c1 = engine
        .create_comment(alice, post, "Hello", None)
        .await
        .unwrap();
    engine.delete_comment(alice, c1.id).await.unwrap();

    let err = engine
        .toggle_like(bob, LikeTarget::Comment(c1.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn replying_under_a_dead_node_is_rejected() {
    let (engine, store, alice, post) = setup().await;

    let c1 = engine
        .create_comment(alice, post, "Hello", None)
        .await
        .unwrap();
    let c2 = engine
        .create_comment(alice, post, "Hi", Some(c1.id))
        .await
        .unwrap();
    let c3 = engine
        .create_comment(alice, post, "Nested", Some(c2.id))
        .await
        .unwrap();

    // Data shaped by an older system: the root died without a cascade.
    store.mark_comment_deleted(c1.id).await;

    // Direct parent is alive, but the chain above it is not.
    let err = engine
        .create_comment(alice, post, "reply", Some(c3.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyDeleted(_)));

    let err = engine.update_comment(alice, c3.id, "edit").await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyDeleted(_)));

    let err = engine.delete_comment(alice, c3.id).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyDeleted(_)));
}

#[tokio::test]
async fn deleted_nodes_render_as_placeholders_with_children_attached() {
    let (engine, store, alice, post) = setup().await;
    let bob = store.seed_user("bob").await;

    let c1 = engine
        .create_comment(alice, post, "Hello", None)
        .await
        .unwrap();
    let c2 = engine
        .create_comment(bob, post, "Hi", Some(c1.id))
        .await
        .unwrap();

    // Root dies without a cascade (legacy-shaped data); its reply survives.
    store.mark_comment_deleted(c1.id).await;

    let thread = engine
        .list_thread(post, PageRequest::default(), Some(alice))
        .await
        .unwrap();

    let root = find(&thread.items, c1.id);
    assert!(root.deleted);
    assert_eq!(root.content, "[removed]");
    assert_eq!(root.author_name, "[deleted]");
    assert_eq!(root.author_display_name, "[deleted]");
    assert!(root.author_avatar.is_none());
    assert!(!root.is_owner);
    assert!(!root.is_liked);

    // The live reply still hangs off the placeholder.
    assert_eq!(root.replies.len(), 1);
    assert_eq!(root.replies[0].id, c2.id);
    assert_eq!(root.replies[0].author_name, "bob");
    assert!(!root.replies[0].deleted);
}

#[tokio::test]
async fn viewer_flags_are_personalized() {
    let (engine, store, alice, post) = setup().await;
    let bob = store.seed_user("bob").await;

    let c1 = engine
        .create_comment(alice, post, "Hello", None)
        .await
        .unwrap();
    engine
        .toggle_like(bob, LikeTarget::Comment(c1.id))
        .await
        .unwrap();

    let as_bob = engine
        .list_thread(post, PageRequest::default(), Some(bob))
        .await
        .unwrap();
    let node = find(&as_bob.items, c1.id);
    assert!(node.is_liked);
    assert!(!node.is_owner);

    let as_alice = engine
        .list_thread(post, PageRequest::default(), Some(alice))
        .await
        .unwrap();
    let node = find(&as_alice.items, c1.id);
    assert!(!node.is_liked);
    assert!(node.is_owner);

    let anonymous = engine
        .list_thread(post, PageRequest::default(), None)
        .await
        .unwrap();
    let node = find(&anonymous.items, c1.id);
    assert!(!node.is_liked);
    assert!(!node.is_owner);
}

#[tokio::test]
async fn root_pages_honor_offset_limit_and_sort() {
    let (engine, _store, alice, post) = setup().await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let view = engine
            .create_comment(alice, post, &format!("root {i}"), None)
            .await
            .unwrap();
        ids.push(view.id);
    }

    let newest = engine
        .list_thread(
            post,
            PageRequest::new(Some(0), Some(2), SortOrder::NewestFirst),
            None,
        )
        .await
        .unwrap();
    assert_eq!(newest.total, 5);
    let got: Vec<i64> = newest.items.iter().map(|v| v.id).collect();
    assert_eq!(got, vec![ids[4], ids[3]]);

    let oldest_tail = engine
        .list_thread(
            post,
            PageRequest::new(Some(3), Some(2), SortOrder::OldestFirst),
            None,
        )
        .await
        .unwrap();
    let got: Vec<i64> = oldest_tail.items.iter().map(|v| v.id).collect();
    assert_eq!(got, vec![ids[3], ids[4]]);
}

#[tokio::test]
async fn content_is_validated_by_the_engine() {
    let (engine, _store, alice, post) = setup().await;

    let err = engine
        .create_comment(alice, post, "   ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let oversized = "x".repeat(1001);
    let err = engine
        .create_comment(alice, post, &oversized, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let c1 = engine
        .create_comment(alice, post, "fine", None)
        .await
        .unwrap();
    let err = engine.update_comment(alice, c1.id, "").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn missing_targets_are_not_found() {
    let (engine, store, alice, post) = setup().await;

    let err = engine
        .create_comment(alice, 9999, "hello", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = engine
        .create_comment(alice, post, "hello", Some(9999))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = engine.delete_comment(alice, 9999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // A soft-deleted post refuses new comments and thread reads alike.
    store.delete_post(post).await;
    let err = engine
        .create_comment(alice, post, "hello", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = engine
        .list_thread(post, PageRequest::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn deleting_a_reply_only_touches_its_own_branch() {
    let (engine, store, alice, post) = setup().await;

    let c1 = engine
        .create_comment(alice, post, "Hello", None)
        .await
        .unwrap();
    let left = engine
        .create_comment(alice, post, "left", Some(c1.id))
        .await
        .unwrap();
    let right = engine
        .create_comment(alice, post, "right", Some(c1.id))
        .await
        .unwrap();
    let under_left = engine
        .create_comment(alice, post, "deep", Some(left.id))
        .await
        .unwrap();

    let removed = engine.delete_comment(alice, left.id).await.unwrap();
    assert_eq!(removed, 2);

    assert!(store.comment(under_left.id).await.unwrap().deleted);
    assert!(!store.comment(right.id).await.unwrap().deleted);
    assert_eq!(store.comment(c1.id).await.unwrap().replies_count, 1);
    assert_eq!(store.post(post).await.unwrap().comments_count, 2);
}

#[tokio::test]
async fn thread_reads_do_not_move_counters() {
    let (engine, store, alice, post) = setup().await;

    let c1 = engine
        .create_comment(alice, post, "Hello", None)
        .await
        .unwrap();
    engine
        .create_comment(alice, post, "Hi", Some(c1.id))
        .await
        .unwrap();

    let before_post = store.post(post).await.unwrap().comments_count;
    let before_root = store.comment(c1.id).await.unwrap().replies_count;

    let _: Page<CommentView> = engine
        .list_thread(post, PageRequest::default(), Some(alice))
        .await
        .unwrap();

    assert_eq!(store.post(post).await.unwrap().comments_count, before_post);
    assert_eq!(
        store.comment(c1.id).await.unwrap().replies_count,
        before_root
    );
}

use std::sync::Arc;

use postline::follow::{follow_user, unfollow_user};
use postline::models::models::Post;
use postline::store::{KeyedStore, WriteBatch};
use postline::{DistributionError, MemoryBlobStore, MemoryStore, PostDistributionService};
use serde_json::json;

fn setup() -> (MemoryStore, MemoryBlobStore, PostDistributionService) {
    let store = MemoryStore::new();
    let blobs = MemoryBlobStore::new();
    let service = PostDistributionService::new(Arc::new(store.clone()), Arc::new(blobs.clone()));
    (store, blobs, service)
}

fn photo(id: &str) -> String {
    format!("https://images.example.com/{}.jpg", id)
}

async fn publish(service: &PostDistributionService, author: &str, id: &str) -> Post {
    let post = Post::new(id, author, photo(id), format!("caption {}", id));
    service.create_post(&post, author).await.expect("create post");
    post
}

async fn exists(store: &MemoryStore, path: &str) -> bool {
    store.get(path).await.unwrap().is_some()
}

#[tokio::test]
async fn create_post_fans_out_to_followers_and_discover() {
    let (store, _, service) = setup();
    follow_user(&store, "b", "a").await.unwrap();
    follow_user(&store, "c", "a").await.unwrap();

    let post = publish(&service, "a", "p1").await;

    for path in [
        "Posts/a/p1",
        "Timelines/a/p1",
        "Timelines/b/p1",
        "Timelines/c/p1",
        "DiscoverPosts/p1",
    ] {
        assert!(exists(&store, path).await, "{} missing", path);
    }
    assert_eq!(store.get("Users/a/hasPosts").await.unwrap(), Some(json!(true)));
    assert_eq!(store.get("Timelines/b/p1").await.unwrap(), store.get("Posts/a/p1").await.unwrap());
    assert_eq!(store.get("Posts/a/p1").await.unwrap().unwrap()["caption"], json!(post.caption));
}

#[tokio::test]
async fn failed_fan_out_is_invisible() {
    let (store, _, service) = setup();
    follow_user(&store, "b", "a").await.unwrap();
    follow_user(&store, "c", "a").await.unwrap();
    store.fail_writes_under("Timelines/c").await;

    let post = Post::new("p1", "a", photo("p1"), "hello");
    let err = service.create_post(&post, "a").await.unwrap_err();
    assert!(matches!(err, DistributionError::CouldNotUploadPost(_)));

    for path in ["Posts/a/p1", "Timelines/a/p1", "Timelines/b/p1", "DiscoverPosts/p1", "Users/a"] {
        assert!(!exists(&store, path).await, "{} should not exist", path);
    }
}

#[tokio::test]
async fn unreadable_followers_fail_the_upload() {
    let (store, _, service) = setup();
    store.fail_reads_under("Followers/a").await;

    let post = Post::new("p1", "a", photo("p1"), "hello");
    let err = service.create_post(&post, "a").await.unwrap_err();
    assert!(matches!(err, DistributionError::CouldNotUploadPost(_)));
    assert!(!exists(&store, "Posts/a/p1").await);
}

#[tokio::test]
async fn create_post_rejects_foreign_author_and_long_caption() {
    let (_, _, service) = setup();
    let service = service.with_max_caption_length(10);

    let post = Post::new("p1", "a", photo("p1"), "hello");
    assert!(matches!(
        service.create_post(&post, "b").await,
        Err(DistributionError::InvalidPost(_))
    ));

    let post = Post::new("p2", "a", photo("p2"), "a caption that is too long");
    assert!(matches!(
        service.create_post(&post, "a").await,
        Err(DistributionError::InvalidPost(_))
    ));
}

#[tokio::test]
async fn caption_limit_applies_before_links_are_added() {
    let (store, _, service) = setup();
    let service = service.with_max_caption_length(30);

    let post = Post::new("p1", "a", photo("p1"), "see https://example.com/a");
    let stored = service.create_post(&post, "a").await.unwrap();

    assert!(stored.caption.contains("<a href=\"https://example.com/a\""));
    assert_eq!(store.get("Posts/a/p1").await.unwrap().unwrap()["caption"], json!(stored.caption));
    assert_eq!(
        store.get("PostOwners/p1").await.unwrap(),
        Some(json!({ "authorId": "a", "photoUrl": photo("p1") }))
    );
}

#[tokio::test]
async fn deleting_an_unknown_post_writes_nothing() {
    let (store, _, service) = setup();
    service.delete_post("nope", "ghost", None).await.unwrap();
    assert_eq!(store.snapshot().await, json!({}));
}

#[tokio::test]
async fn delete_post_removes_every_derived_copy() {
    let (store, blobs, service) = setup();
    follow_user(&store, "b", "a").await.unwrap();
    follow_user(&store, "c", "a").await.unwrap();
    let post = publish(&service, "a", "p1").await;
    blobs.insert(post.photo_url.clone()).await;

    service.like_post("b", "a", "p1").await.unwrap();
    service.add_comment("a", "p1", "c", "nice").await.unwrap();
    service.add_bookmark("b", "p1", "a").await.unwrap();
    service.add_bookmark("c", "p1", "a").await.unwrap();

    service.delete_post("p1", "a", Some(&post.photo_url)).await.unwrap();

    for path in [
        "Posts/a/p1",
        "Timelines/a/p1",
        "Timelines/b/p1",
        "Timelines/c/p1",
        "DiscoverPosts/p1",
        "Comments/p1",
        "Likes/p1",
        "BookmarksReverseIndex/p1",
        "Bookmarks/b",
        "Bookmarks/c",
        "PostDeliveries/p1",
        "PostOwners/p1",
    ] {
        assert!(!exists(&store, path).await, "{} should be gone", path);
    }
    assert!(!blobs.contains(&post.photo_url).await);
    assert_eq!(store.get("Users/a/hasPosts").await.unwrap(), Some(json!(false)));
}

#[tokio::test]
async fn has_posts_stays_set_while_posts_remain() {
    let (store, _, service) = setup();
    publish(&service, "a", "p1").await;
    publish(&service, "a", "p2").await;

    service.delete_post("p1", "a", None).await.unwrap();
    assert_eq!(store.get("Users/a/hasPosts").await.unwrap(), Some(json!(true)));

    service.delete_post("p2", "a", None).await.unwrap();
    assert_eq!(store.get("Users/a/hasPosts").await.unwrap(), Some(json!(false)));
}

#[tokio::test]
async fn deleting_twice_matches_deleting_once() {
    let (store, _, service) = setup();
    follow_user(&store, "b", "a").await.unwrap();
    publish(&service, "a", "p1").await;
    publish(&service, "a", "p2").await;

    service.delete_post("p1", "a", Some(&photo("p1"))).await.unwrap();
    let once = store.snapshot().await;

    service.delete_post("p1", "a", Some(&photo("p1"))).await.unwrap();
    assert_eq!(store.snapshot().await, once);
}

#[tokio::test]
async fn delete_reaches_timelines_of_since_unfollowed_users() {
    let (store, _, service) = setup();
    follow_user(&store, "b", "a").await.unwrap();
    publish(&service, "a", "p1").await;

    unfollow_user(&store, "b", "a").await.unwrap();
    follow_user(&store, "c", "a").await.unwrap();

    service.delete_post("p1", "a", None).await.unwrap();
    assert!(!exists(&store, "Timelines/b/p1").await);
    assert!(!exists(&store, "Timelines/c/p1").await);
}

#[tokio::test]
async fn partial_delete_failure_is_reported_and_retry_finishes() {
    let (store, _, service) = setup();
    follow_user(&store, "b", "a").await.unwrap();
    publish(&service, "a", "p1").await;
    store.fail_writes_under("Timelines/b").await;

    let err = service.delete_post("p1", "a", None).await.unwrap_err();
    assert!(matches!(err, DistributionError::CouldNotDeletePost(_)));

    // Other removals went through and are not rolled back.
    assert!(!exists(&store, "Posts/a/p1").await);
    assert!(!exists(&store, "DiscoverPosts/p1").await);
    assert!(exists(&store, "Timelines/b/p1").await);
    assert!(exists(&store, "PostDeliveries/p1/b").await);
    assert!(exists(&store, "PostOwners/p1").await);

    // The follow is gone by the time of the retry; the delivery record
    // still points the cleanup at b's timeline.
    unfollow_user(&store, "b", "a").await.unwrap();
    store.clear_failures().await;
    service.delete_post("p1", "a", None).await.unwrap();

    assert!(!exists(&store, "Timelines/b/p1").await);
    assert!(!exists(&store, "PostDeliveries/p1").await);
    assert!(!exists(&store, "PostOwners/p1").await);
}

#[tokio::test]
async fn blob_failure_fails_the_delete_but_not_the_rest() {
    let (store, blobs, service) = setup();
    let post = publish(&service, "a", "p1").await;
    blobs.insert(post.photo_url.clone()).await;
    blobs.set_failing(true).await;

    let err = service.delete_post("p1", "a", Some(&post.photo_url)).await.unwrap_err();
    assert!(matches!(err, DistributionError::CouldNotDeletePost(_)));
    assert!(!exists(&store, "Posts/a/p1").await);
    assert!(blobs.contains(&post.photo_url).await);

    blobs.set_failing(false).await;
    service.delete_post("p1", "a", Some(&post.photo_url)).await.unwrap();
    assert!(!blobs.contains(&post.photo_url).await);
}

#[tokio::test]
async fn bookmark_indexes_are_cleared_for_every_owner() {
    let (store, _, service) = setup();
    publish(&service, "a", "p1").await;
    publish(&service, "a", "p2").await;

    for owner in ["u1", "u2", "u3"] {
        service.add_bookmark(owner, "p1", "a").await.unwrap();
    }
    let kept = service.add_bookmark("u1", "p2", "a").await.unwrap();

    service.delete_post("p1", "a", None).await.unwrap();

    assert!(!exists(&store, "BookmarksReverseIndex/p1").await);
    for owner in ["u2", "u3"] {
        assert_eq!(store.count(&format!("Bookmarks/{}", owner)).await.unwrap(), 0);
    }
    let remaining = store
        .query_range("Bookmarks/u1", postline::store::RangeQuery::all())
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].0, kept);
    assert_eq!(remaining[0].1["postId"], json!("p2"));
}

#[tokio::test]
async fn store_batches_are_atomic_across_many_followers() {
    let (store, _, service) = setup();
    let mut batch = WriteBatch::new();
    for i in 0..200 {
        let follower = format!("f{:03}", i);
        batch.set(format!("Followers/a/{}", follower), json!({ "userId": follower }));
    }
    store.set_many(batch).await.unwrap();

    publish(&service, "a", "p1").await;
    assert_eq!(store.count("PostDeliveries/p1").await.unwrap(), 201);
    assert!(exists(&store, "Timelines/f199/p1").await);
}

#![cfg(feature = "perf")]

use std::sync::Arc;
use std::time::Instant;

use postline::follow::follow_user;
use postline::models::models::Post;
use postline::{FeedSource, MemoryBlobStore, MemoryStore, PostDistributionService};

const NUM_FOLLOWERS: usize = 2000;
const POSTS_PER_AUTHOR: usize = 50;
const PAGE_SIZE: usize = 20;
const LOADED_USER: &str = "bob";

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn perf_fan_out_and_paginate() {
    let store = MemoryStore::new();
    let service = PostDistributionService::new(Arc::new(store.clone()), Arc::new(MemoryBlobStore::new()));
    let start = Instant::now();

    println!("\n=== Performance Test ===");
    println!("Creating {} followers for {}...", NUM_FOLLOWERS, LOADED_USER);
    for i in 0..NUM_FOLLOWERS {
        follow_user(&store, &format!("follower_{:05}", i), LOADED_USER).await.unwrap();
    }

    let fan_out_start = Instant::now();
    let mut post_ids = Vec::with_capacity(POSTS_PER_AUTHOR);
    for i in 0..POSTS_PER_AUTHOR {
        let post = Post::new(
            postline::core::helpers::new_key(),
            LOADED_USER,
            format!("https://img/{}.jpg", i),
            format!("post {}", i),
        );
        service.create_post(&post, LOADED_USER).await.unwrap();
        post_ids.push(post.id);
    }
    let fan_out_time = fan_out_start.elapsed();
    println!(
        "Fan-out done: {} posts x {} timelines in {:.2}s ({:.2} posts/sec)",
        POSTS_PER_AUTHOR,
        NUM_FOLLOWERS + 1,
        fan_out_time.as_secs_f64(),
        POSTS_PER_AUTHOR as f64 / fan_out_time.as_secs_f64()
    );

    let page_start = Instant::now();
    let source = FeedSource::Timeline("follower_00042".to_string());
    let mut cursor: Option<String> = None;
    let mut seen = 0;
    loop {
        let page = service.get_posts_page(&source, PAGE_SIZE, cursor.as_deref(), None).await.unwrap();
        if page.reached_end {
            break;
        }
        seen += page.posts.len();
        cursor = page.last_key;
    }
    assert_eq!(seen, POSTS_PER_AUTHOR);
    println!("Paginated timeline in {:.3}s", page_start.elapsed().as_secs_f64());

    let delete_start = Instant::now();
    for post_id in &post_ids {
        service.delete_post(post_id, LOADED_USER, None).await.unwrap();
    }
    println!("Deleted all posts in {:.2}s", delete_start.elapsed().as_secs_f64());
    println!("Total: {:.2}s", start.elapsed().as_secs_f64());
}

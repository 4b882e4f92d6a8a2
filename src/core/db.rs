use anyhow::Context;

use crate::core::helpers::new_key;
use crate::follow::{follow_user, get_followers};
use crate::models::models::Post;
use crate::posts::PostDistributionService;
use crate::users::{get_profile, save_profile};

/// Seeds a few demo users, follows and posts. Running it again is a no-op.
pub async fn init_demo_data(service: &PostDistributionService) -> anyhow::Result<()> {
    let store = service.store().as_ref();

    if get_profile(store, "test").await?.is_some() {
        return Ok(()); // Already initialized
    }

    for (user_id, username) in [("test", "test"), ("alice", "alice"), ("bob", "bob")] {
        save_profile(store, user_id, username, None)
            .await
            .with_context(|| format!("seeding profile {}", user_id))?;
    }

    // "test" and "alice" follow "bob", so bob's posts reach both timelines
    for follower in ["test", "alice"] {
        follow_user(store, follower, "bob").await?;
    }
    follow_user(store, "test", "alice").await?;

    let posts = [
        ("alice", "https://images.example.com/alice/1.jpg", "Welcome to my board!"),
        ("alice", "https://images.example.com/alice/2.jpg", "Just finished an amazing project."),
        ("bob", "https://images.example.com/bob/1.jpg", "Hey everyone! Just joined."),
        ("test", "https://images.example.com/test/1.jpg", "This is my first post."),
    ];
    for (author, photo_url, caption) in posts {
        let post = Post::new(new_key(), author, photo_url, caption);
        service
            .create_post(&post, author)
            .await
            .with_context(|| format!("seeding post for {}", author))?;
    }

    let bob_followers = get_followers(store, "bob").await?.len();
    tracing::info!(bob_followers, "seeded demo data");
    Ok(())
}

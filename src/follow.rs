use crate::codec::{encode, KeyedStoreExt};
use crate::config::*;
use crate::models::models::FollowEdge;
use crate::store::{KeyedStore, StoreError, WriteBatch};

/// Records `follower_id` as following `following_id`. Both edge directions
/// are written together.
pub async fn follow_user(
    store: &dyn KeyedStore,
    follower_id: &str,
    following_id: &str,
) -> Result<(), StoreError> {
    let mut batch = WriteBatch::new();
    batch.set(
        follower_key(following_id, follower_id),
        encode(&FollowEdge { user_id: follower_id.to_string() })?,
    );
    batch.set(
        following_key(follower_id, following_id),
        encode(&FollowEdge { user_id: following_id.to_string() })?,
    );
    store.set_many(batch).await?;

    tracing::debug!(follower_id, following_id, "followed");
    Ok(())
}

/// Existing timeline entries of the unfollowed user are left in place.
pub async fn unfollow_user(
    store: &dyn KeyedStore,
    follower_id: &str,
    following_id: &str,
) -> Result<(), StoreError> {
    let mut batch = WriteBatch::new();
    batch.remove(follower_key(following_id, follower_id));
    batch.remove(following_key(follower_id, following_id));
    store.set_many(batch).await?;

    tracing::debug!(follower_id, following_id, "unfollowed");
    Ok(())
}

pub async fn get_followings(store: &dyn KeyedStore, user_id: &str) -> Result<Vec<String>, StoreError> {
    store.child_keys(&followings_key(user_id)).await
}

pub async fn get_followers(store: &dyn KeyedStore, user_id: &str) -> Result<Vec<String>, StoreError> {
    store.child_keys(&followers_key(user_id)).await
}

pub async fn is_following(
    store: &dyn KeyedStore,
    follower_id: &str,
    following_id: &str,
) -> Result<bool, StoreError> {
    Ok(store.get(&follower_key(following_id, follower_id)).await?.is_some())
}

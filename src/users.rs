use ammonia::Builder;
use serde_json::Value;

use crate::codec::KeyedStoreExt;
use crate::config::*;
use crate::models::models::UserProfile;
use crate::store::{KeyedStore, StoreError, WriteBatch};

pub fn sanitize_text(text: &str) -> String {
    // Plain text only, every tag stripped
    Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string()
}

/// Writes the editable profile fields one by one so `hasPosts` survives.
pub async fn save_profile(
    store: &dyn KeyedStore,
    user_id: &str,
    username: &str,
    profile_image_url: Option<&str>,
) -> Result<UserProfile, StoreError> {
    let user = user_key(user_id);
    let mut batch = WriteBatch::new();
    batch.set(format!("{}/username", user), Value::String(username.to_string()));
    match profile_image_url {
        Some(url) => batch.set(format!("{}/profileImageUrl", user), Value::String(url.to_string())),
        None => batch.remove(format!("{}/profileImageUrl", user)),
    };
    store.set_many(batch).await?;

    Ok(get_profile(store, user_id).await?.unwrap_or_default())
}

pub async fn get_profile(store: &dyn KeyedStore, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
    store.get_json::<UserProfile>(&user_key(user_id)).await
}

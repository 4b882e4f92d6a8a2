//! Write side of post distribution: fan-out on create, cascade on delete.
//!
//! A new post is copied into the author's post list, the timeline of the
//! author and every follower, and the discover pool, in one atomic batch.
//! The same batch records each timeline the post reached under
//! `PostDeliveries/{postId}`, so deletion cleans exactly those timelines
//! even if the follower set changed in between, and stores who owns the
//! post under `PostOwners/{postId}`.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use ammonia::Builder;
use futures::future::{join_all, BoxFuture, FutureExt};
use html_escape::encode_double_quoted_attribute;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec::{encode, KeyedStoreExt};
use crate::config::*;
use crate::core::errors::DistributionError;
use crate::follow::get_followers;
use crate::models::models::{Post, PostOwner, ReverseBookmark};
use crate::store::{BlobStore, KeyedStore, RangeQuery, StoreError, WriteBatch};

pub struct PostDistributionService {
    pub(crate) store: Arc<dyn KeyedStore>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) max_caption_length: usize,
}

impl PostDistributionService {
    pub fn new(store: Arc<dyn KeyedStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            blobs,
            max_caption_length: max_caption_length(),
        }
    }

    pub fn with_max_caption_length(mut self, max: usize) -> Self {
        self.max_caption_length = max;
        self
    }

    pub fn store(&self) -> &Arc<dyn KeyedStore> {
        &self.store
    }

    /// Publishes `post` and returns it as stored. The caption limit applies
    /// to the text as written; links are added afterwards.
    pub async fn create_post(&self, post: &Post, author_id: &str) -> Result<Post, DistributionError> {
        if post.author_id != author_id {
            return Err(DistributionError::InvalidPost(
                "post author does not match the uploading user".to_string(),
            ));
        }
        if post.caption.chars().count() > self.max_caption_length {
            return Err(DistributionError::InvalidPost("caption too long".to_string()));
        }
        let post = Post {
            caption: filter_caption(&post.caption),
            ..post.clone()
        };

        let followers = get_followers(self.store.as_ref(), author_id)
            .await
            .map_err(DistributionError::CouldNotUploadPost)?;
        let value = encode(&post).map_err(DistributionError::CouldNotUploadPost)?;
        let owner = PostOwner {
            author_id: author_id.to_string(),
            photo_url: post.photo_url.clone(),
        };
        let owner = encode(&owner).map_err(DistributionError::CouldNotUploadPost)?;

        let mut targets: BTreeSet<&str> = followers.iter().map(String::as_str).collect();
        targets.insert(author_id);

        let mut batch = WriteBatch::new();
        batch.set(user_post_key(author_id, &post.id), value.clone());
        for viewer in &targets {
            batch.set(timeline_entry_key(viewer, &post.id), value.clone());
            batch.set(delivery_key(&post.id, viewer), Value::Bool(true));
        }
        batch.set(discover_entry_key(&post.id), value);
        batch.set(owner_key(&post.id), owner);
        batch.set(has_posts_key(author_id), Value::Bool(true));

        let writes = batch.len();
        self.store
            .set_many(batch)
            .await
            .map_err(DistributionError::CouldNotUploadPost)?;

        info!(
            post_id = %post.id,
            author_id,
            timelines = targets.len(),
            writes,
            "fanned out post"
        );
        Ok(post)
    }

    /// Who owns `post_id`, as long as a delete of it has not completed.
    pub async fn post_owner(&self, post_id: &str) -> Result<Option<PostOwner>, DistributionError> {
        self.store
            .get_json::<PostOwner>(&owner_key(post_id))
            .await
            .map_err(DistributionError::CouldNotLoadData)
    }

    /// Removes a post and every copy or reference derived from it.
    ///
    /// Removals run concurrently and independently. All of them are driven
    /// to completion; the first failure is returned and nothing is rolled
    /// back. Calling this again for the same post finishes whatever a
    /// failed attempt left behind.
    pub async fn delete_post(
        &self,
        post_id: &str,
        author_id: &str,
        image_url: Option<&str>,
    ) -> Result<(), DistributionError> {
        let store = self.store.as_ref();

        let delivered = store
            .child_keys(&deliveries_key(post_id))
            .await
            .map_err(DistributionError::CouldNotDeletePost)?;
        let followers = get_followers(store, author_id)
            .await
            .map_err(DistributionError::CouldNotDeletePost)?;
        let bookmarks = store
            .children_json::<ReverseBookmark>(&bookmark_reverse_key(post_id), RangeQuery::all())
            .await
            .map_err(DistributionError::CouldNotDeletePost)?;

        let mut timelines: BTreeSet<String> = delivered.into_iter().collect();
        timelines.extend(followers);
        timelines.insert(author_id.to_string());

        let mut removals: Vec<BoxFuture<'_, (String, Result<(), StoreError>)>> = Vec::new();
        for path in [
            user_post_key(author_id, post_id),
            discover_entry_key(post_id),
            comments_key(post_id),
            likes_key(post_id),
        ] {
            removals.push(remove_path(store, path));
        }
        for viewer in &timelines {
            removals.push(remove_path(store, timeline_entry_key(viewer, post_id)));
        }
        for (owner, entry) in bookmarks {
            let mut batch = WriteBatch::new();
            batch.remove(bookmark_key(&owner, &entry.bookmark_id));
            batch.remove(bookmark_reverse_entry_key(post_id, &owner));
            let label = format!("bookmark {} of {}", entry.bookmark_id, owner);
            removals.push(async move { (label, store.set_many(batch).await) }.boxed());
        }
        if let Some(url) = image_url {
            let blobs = self.blobs.as_ref();
            let label = format!("image {}", url);
            removals.push(async move { (label, blobs.delete(url).await) }.boxed());
        }

        let launched = removals.len();
        let mut first_error = None;
        for (label, result) in join_all(removals).await {
            if let Err(err) = result {
                warn!(post_id, step = %label, error = %err, "post removal step failed");
                first_error.get_or_insert(err);
            }
        }
        if let Some(err) = first_error {
            return Err(DistributionError::CouldNotDeletePost(err));
        }

        // Delivery and ownership records go last so a retry after a failed
        // removal still knows where the post was delivered and whose it is.
        let mut batch = WriteBatch::new();
        batch.remove(deliveries_key(post_id));
        batch.remove(owner_key(post_id));
        store
            .set_many(batch)
            .await
            .map_err(DistributionError::CouldNotDeletePost)?;

        let remaining = store
            .count(&user_posts_key(author_id))
            .await
            .map_err(DistributionError::CouldNotDeletePost)?;
        let has_posts = store
            .get(&has_posts_key(author_id))
            .await
            .map_err(DistributionError::CouldNotDeletePost)?;
        if remaining == 0 && has_posts == Some(Value::Bool(true)) {
            let mut batch = WriteBatch::new();
            batch.set(has_posts_key(author_id), Value::Bool(false));
            store
                .set_many(batch)
                .await
                .map_err(DistributionError::CouldNotDeletePost)?;
        }

        info!(post_id, author_id, removals = launched, remaining, "deleted post");
        Ok(())
    }
}

fn remove_path(
    store: &dyn KeyedStore,
    path: String,
) -> BoxFuture<'_, (String, Result<(), StoreError>)> {
    async move {
        debug!(path = %path, "removing");
        let result = store.delete(&path).await;
        (path, result)
    }
    .boxed()
}

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"https?://[^\s<]+").expect("Regex should compile")
    })
}

/// Sanitizes a caption and turns bare URLs into links.
pub fn filter_caption(caption: &str) -> String {
    // Strip scripts and event handlers before linkifying
    let clean = Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(caption)
        .to_string();

    url_regex().replace_all(&clean, |caps: &regex::Captures| {
        let url = &caps[0];
        let escaped_url = encode_double_quoted_attribute(url);
        format!(r#"<a href="{}" target="_blank">{}</a>"#, escaped_url, url)
    }).to_string()
}

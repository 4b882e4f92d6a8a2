//! Bookmarks keep two indexes in step: the owner's list
//! (`Bookmarks/{owner}/{bookmarkId}`) and the per-post reverse index
//! (`BookmarksReverseIndex/{postId}/{owner}`). Both are always written or
//! removed in the same batch.

use tracing::{debug, warn};

use crate::codec::{decode, encode, KeyedStoreExt};
use crate::config::*;
use crate::core::errors::DistributionError;
use crate::core::helpers::new_key;
use crate::feed::{next_cursor, page_query};
use crate::models::models::{BookmarkRef, Post, PostsPage, ReverseBookmark};
use crate::posts::PostDistributionService;
use crate::store::WriteBatch;

impl PostDistributionService {
    /// Bookmarks a post for `owner_id` and returns the bookmark id.
    /// Bookmarking the same post twice returns the existing id.
    pub async fn add_bookmark(
        &self,
        owner_id: &str,
        post_id: &str,
        author_id: &str,
    ) -> Result<String, DistributionError> {
        let store = self.store.as_ref();
        let reverse_path = bookmark_reverse_entry_key(post_id, owner_id);

        if let Some(existing) = store
            .get_json::<ReverseBookmark>(&reverse_path)
            .await
            .map_err(DistributionError::CouldNotLoadData)?
        {
            return Ok(existing.bookmark_id);
        }

        let post_exists = store
            .get(&user_post_key(author_id, post_id))
            .await
            .map_err(DistributionError::CouldNotLoadData)?
            .is_some();
        if !post_exists {
            return Err(DistributionError::PostNotFound { post_id: post_id.to_string() });
        }

        let bookmark_id = new_key();
        let forward = BookmarkRef {
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
        };
        let reverse = ReverseBookmark { bookmark_id: bookmark_id.clone() };

        let mut batch = WriteBatch::new();
        batch.set(
            bookmark_key(owner_id, &bookmark_id),
            encode(&forward).map_err(DistributionError::CouldNotLoadData)?,
        );
        batch.set(reverse_path, encode(&reverse).map_err(DistributionError::CouldNotLoadData)?);
        store.set_many(batch).await.map_err(DistributionError::CouldNotLoadData)?;

        debug!(owner_id, post_id, bookmark_id = %bookmark_id, "bookmarked post");
        Ok(bookmark_id)
    }

    /// Removing a bookmark that does not exist succeeds.
    pub async fn remove_bookmark(&self, owner_id: &str, post_id: &str) -> Result<(), DistributionError> {
        let store = self.store.as_ref();
        let reverse_path = bookmark_reverse_entry_key(post_id, owner_id);

        let Some(existing) = store
            .get_json::<ReverseBookmark>(&reverse_path)
            .await
            .map_err(DistributionError::CouldNotLoadData)?
        else {
            return Ok(());
        };

        let mut batch = WriteBatch::new();
        batch.remove(bookmark_key(owner_id, &existing.bookmark_id));
        batch.remove(reverse_path);
        store.set_many(batch).await.map_err(DistributionError::CouldNotLoadData)
    }

    /// Newest bookmarks first, each resolved to the post it points at.
    /// Bookmarks whose post is gone are skipped.
    pub async fn bookmarks_page(
        &self,
        owner_id: &str,
        page_size: usize,
        after_key: Option<&str>,
    ) -> Result<PostsPage, DistributionError> {
        if page_size == 0 {
            return Err(DistributionError::InvalidPageSize);
        }
        let store = self.store.as_ref();

        let entries = store
            .query_range(&bookmarks_key(owner_id), page_query(page_size, after_key))
            .await
            .map_err(DistributionError::CouldNotLoadData)?;
        let (last_key, reached_end) = next_cursor(&entries, after_key);

        let mut posts = Vec::with_capacity(entries.len());
        for (bookmark_id, value) in entries.into_iter().rev() {
            let bookmark = match decode::<BookmarkRef>(value) {
                Ok(bookmark) => bookmark,
                Err(err) => {
                    warn!(owner_id, bookmark_id = %bookmark_id, error = %err, "skipping undecodable bookmark");
                    continue;
                }
            };
            match store
                .get_json::<Post>(&user_post_key(&bookmark.author_id, &bookmark.post_id))
                .await
            {
                Ok(Some(post)) => posts.push(post),
                Ok(None) => debug!(owner_id, post_id = %bookmark.post_id, "bookmarked post is gone"),
                Err(err) => warn!(owner_id, post_id = %bookmark.post_id, error = %err, "bookmarked post lookup failed"),
            }
        }

        let posts = self.enrich_posts(posts, Some(owner_id)).await;
        Ok(PostsPage { posts, last_key, reached_end })
    }
}

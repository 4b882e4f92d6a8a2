//! Likes and comments, and the denormalized counters they drive on the
//! author's copy of the post.
//!
//! Counters are read, adjusted, and written back without a transaction;
//! two concurrent likes of the same post can lose an increment.
// TODO: move the counters to a compare-and-swap once KeyedStore grows one.

use serde_json::Value;
use tracing::debug;

use crate::codec::{decode, encode, KeyedStoreExt};
use crate::config::*;
use crate::core::errors::DistributionError;
use crate::core::helpers::new_key;
use crate::feed::{next_cursor, page_query};
use crate::models::models::{Comment, CommentsPage, Post};
use crate::posts::PostDistributionService;
use crate::store::WriteBatch;

impl PostDistributionService {
    async fn load_post(&self, author_id: &str, post_id: &str) -> Result<Post, DistributionError> {
        self.store
            .get_json::<Post>(&user_post_key(author_id, post_id))
            .await
            .map_err(DistributionError::CouldNotLoadData)?
            .ok_or_else(|| DistributionError::PostNotFound { post_id: post_id.to_string() })
    }

    /// Liking an already liked post changes nothing.
    pub async fn like_post(&self, viewer_id: &str, author_id: &str, post_id: &str) -> Result<u64, DistributionError> {
        let post = self.load_post(author_id, post_id).await?;
        let like_path = like_key(post_id, viewer_id);
        if self.store.get(&like_path).await.map_err(DistributionError::CouldNotLoadData)?.is_some() {
            return Ok(post.like_count);
        }

        let like_count = post.like_count + 1;
        let mut batch = WriteBatch::new();
        batch.set(like_path, Value::Bool(true));
        batch.set(
            format!("{}/likeCount", user_post_key(author_id, post_id)),
            Value::from(like_count),
        );
        self.store.set_many(batch).await.map_err(DistributionError::CouldNotLoadData)?;

        debug!(viewer_id, post_id, like_count, "liked post");
        Ok(like_count)
    }

    pub async fn unlike_post(&self, viewer_id: &str, author_id: &str, post_id: &str) -> Result<u64, DistributionError> {
        let post = self.load_post(author_id, post_id).await?;
        let like_path = like_key(post_id, viewer_id);
        if self.store.get(&like_path).await.map_err(DistributionError::CouldNotLoadData)?.is_none() {
            return Ok(post.like_count);
        }

        let like_count = post.like_count.saturating_sub(1);
        let mut batch = WriteBatch::new();
        batch.remove(like_path);
        batch.set(
            format!("{}/likeCount", user_post_key(author_id, post_id)),
            Value::from(like_count),
        );
        self.store.set_many(batch).await.map_err(DistributionError::CouldNotLoadData)?;

        debug!(viewer_id, post_id, like_count, "unliked post");
        Ok(like_count)
    }

    pub async fn add_comment(
        &self,
        author_id: &str,
        post_id: &str,
        commenter_id: &str,
        text: &str,
    ) -> Result<Comment, DistributionError> {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > MAX_COMMENT_LENGTH {
            return Err(DistributionError::InvalidPost("invalid comment".to_string()));
        }
        let post = self.load_post(author_id, post_id).await?;

        let comment = Comment {
            id: new_key(),
            author_id: commenter_id.to_string(),
            text: text.to_string(),
            created_at: chrono::Utc::now(),
        };
        let mut batch = WriteBatch::new();
        batch.set(
            comment_key(post_id, &comment.id),
            encode(&comment).map_err(DistributionError::CouldNotLoadData)?,
        );
        batch.set(
            format!("{}/commentCount", user_post_key(author_id, post_id)),
            Value::from(post.comment_count + 1),
        );
        self.store.set_many(batch).await.map_err(DistributionError::CouldNotLoadData)?;

        debug!(post_id, comment_id = %comment.id, "added comment");
        Ok(comment)
    }

    /// Deleting a missing comment succeeds and leaves the counter alone.
    pub async fn delete_comment(&self, author_id: &str, post_id: &str, comment_id: &str) -> Result<(), DistributionError> {
        let post = self.load_post(author_id, post_id).await?;
        let path = comment_key(post_id, comment_id);
        if self.store.get(&path).await.map_err(DistributionError::CouldNotLoadData)?.is_none() {
            return Ok(());
        }

        let mut batch = WriteBatch::new();
        batch.remove(path);
        batch.set(
            format!("{}/commentCount", user_post_key(author_id, post_id)),
            Value::from(post.comment_count.saturating_sub(1)),
        );
        self.store.set_many(batch).await.map_err(DistributionError::CouldNotLoadData)
    }

    /// Newest comments first, same cursor rules as post pages.
    pub async fn comments_page(
        &self,
        post_id: &str,
        page_size: usize,
        after_key: Option<&str>,
    ) -> Result<CommentsPage, DistributionError> {
        if page_size == 0 {
            return Err(DistributionError::InvalidPageSize);
        }
        let entries = self
            .store
            .query_range(&comments_key(post_id), page_query(page_size, after_key))
            .await
            .map_err(DistributionError::CouldNotLoadData)?;
        let (last_key, reached_end) = next_cursor(&entries, after_key);

        let comments = entries
            .into_iter()
            .rev()
            .filter_map(|(_, value)| decode::<Comment>(value).ok())
            .collect();
        Ok(CommentsPage { comments, last_key, reached_end })
    }
}

//! The one place where domain records cross into store values.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::store::{KeyedStore, RangeQuery, StoreError};

pub fn encode<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Typed reads on top of any [`KeyedStore`].
#[async_trait]
pub trait KeyedStoreExt: KeyedStore {
    async fn get_json<T>(&self, path: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(path).await? {
            Some(value) => decode(value).map(Some),
            None => Ok(None),
        }
    }

    /// Child keys of a collection, ascending. Values are not decoded.
    async fn child_keys(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.query_range(collection, RangeQuery::all()).await?;
        Ok(entries.into_iter().map(|(key, _)| key).collect())
    }

    /// Children of a collection decoded as `T`, ascending by key.
    async fn children_json<T>(
        &self,
        collection: &str,
        query: RangeQuery,
    ) -> Result<Vec<(String, T)>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        self.query_range(collection, query)
            .await?
            .into_iter()
            .map(|(key, value)| decode(value).map(|record| (key, record)))
            .collect()
    }
}

impl<S: KeyedStore + ?Sized> KeyedStoreExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::models::{BookmarkRef, Post};
    use serde_json::json;

    #[test]
    fn post_uses_store_field_names() {
        let post = Post::new("p1", "alice", "https://img/p1.jpg", "hello");
        let value = encode(&post).unwrap();

        assert_eq!(value["authorId"], json!("alice"));
        assert_eq!(value["photoUrl"], json!("https://img/p1.jpg"));
        assert_eq!(value["likeCount"], json!(0));
        assert_eq!(decode::<Post>(value).unwrap(), post);
    }

    #[test]
    fn missing_counts_default_to_zero() {
        let value = json!({
            "id": "p1",
            "authorId": "alice",
            "photoUrl": "u",
            "caption": "",
            "createdAt": "2024-01-01T00:00:00Z"
        });
        let post: Post = decode(value).unwrap();
        assert_eq!(post.like_count, 0);
        assert_eq!(post.comment_count, 0);
    }

    #[test]
    fn malformed_value_is_serialization_error() {
        let err = decode::<BookmarkRef>(json!({ "postId": 5 })).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}

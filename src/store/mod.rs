//! Hierarchical keyed store used by the distribution service.
//!
//! Paths are `/`-separated segments (`Posts/{userId}/{postId}`). Every
//! collection is an ordered map of its immediate children, ordered by key.

pub mod blob;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use blob::{BlobStore, MemoryBlobStore};
pub use memory::MemoryStore;

const FORBIDDEN_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("permission denied for '{path}'")]
    PermissionDenied { path: String },
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("invalid path '{path}'")]
    InvalidPath { path: String },
}

/// A set of path writes applied as one unit. `None` removes the path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: BTreeMap<String, Option<Value>>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: Value) -> &mut Self {
        self.writes.insert(path.into(), Some(value));
        self
    }

    pub fn remove(&mut self, path: impl Into<String>) -> &mut Self {
        self.writes.insert(path.into(), None);
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.writes.keys().map(String::as_str)
    }

    /// Checks every path and rejects batches where one path is an ancestor
    /// of another, since the result would depend on application order.
    pub fn validate(&self) -> Result<(), StoreError> {
        for path in self.writes.keys() {
            validate_path(path)?;
        }
        for path in self.writes.keys() {
            let mut ancestors = path.match_indices('/').map(|(idx, _)| &path[..idx]);
            if ancestors.any(|ancestor| self.writes.contains_key(ancestor)) {
                return Err(StoreError::InvalidPath { path: path.clone() });
            }
        }
        Ok(())
    }

    pub fn into_writes(self) -> impl Iterator<Item = (String, Option<Value>)> {
        self.writes.into_iter()
    }
}

/// Range over the immediate children of a collection, by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeQuery {
    /// Only keys strictly less than this one.
    pub end_before: Option<String>,
    /// Keep only the last N keys of the range.
    pub limit_last: Option<usize>,
}

impl RangeQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn last(limit: usize) -> Self {
        Self { end_before: None, limit_last: Some(limit) }
    }

    pub fn last_before(end_before: impl Into<String>, limit: usize) -> Self {
        Self { end_before: Some(end_before.into()), limit_last: Some(limit) }
    }
}

#[async_trait]
pub trait KeyedStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Applies every write in the batch, or none of them.
    async fn set_many(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Removes the node at `path` and everything below it.
    /// Removing a missing path succeeds.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Immediate children of `collection` in ascending key order.
    async fn query_range(
        &self,
        collection: &str,
        query: RangeQuery,
    ) -> Result<Vec<(String, Value)>, StoreError>;

    async fn count(&self, collection: &str) -> Result<usize, StoreError>;
}

pub fn validate_path(path: &str) -> Result<(), StoreError> {
    let valid = !path.is_empty()
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && !segment.contains(&FORBIDDEN_CHARS[..]));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidPath { path: path.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_malformed_paths() {
        assert!(validate_path("Posts/a/b").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("Posts//b").is_err());
        assert!(validate_path("Posts/a.b").is_err());
        assert!(validate_path("Posts/$x").is_err());
    }

    #[test]
    fn rejects_overlapping_batch_paths() {
        let mut batch = WriteBatch::new();
        batch.set("Users/a", json!({"username": "a"}));
        batch.set("Users/a-b", json!({"username": "b"}));
        batch.set("Users/a/hasPosts", json!(true));
        assert!(matches!(batch.validate(), Err(StoreError::InvalidPath { .. })));

        let mut batch = WriteBatch::new();
        batch.set("Users/a/hasPosts", json!(true));
        batch.set("Users/ab/hasPosts", json!(true));
        assert!(batch.validate().is_ok());
    }
}

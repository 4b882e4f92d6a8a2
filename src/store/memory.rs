//! In-memory implementation of [`KeyedStore`].
//!
//! The namespace is held as one JSON tree, mirroring how a realtime
//! document database exposes it. Batches are staged on a copy of the tree
//! and swapped in only when every write applied, which gives readers the
//! all-or-nothing view the fan-out relies on.
//!
//! Tests can make reads or writes under a path prefix fail with
//! [`StoreError::Unavailable`] to exercise partial-failure handling.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use super::{validate_path, KeyedStore, RangeQuery, StoreError, WriteBatch};

#[derive(Default)]
struct State {
    root: Map<String, Value>,
    failing_writes: Vec<String>,
    failing_reads: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write touching `prefix` or anything below it fails from now on.
    pub async fn fail_writes_under(&self, prefix: impl Into<String>) {
        self.state.write().await.failing_writes.push(prefix.into());
    }

    /// Every read of `prefix` or anything below it fails from now on.
    pub async fn fail_reads_under(&self, prefix: impl Into<String>) {
        self.state.write().await.failing_reads.push(prefix.into());
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.failing_writes.clear();
        state.failing_reads.clear();
    }

    /// Copy of the whole tree.
    pub async fn snapshot(&self) -> Value {
        Value::Object(self.state.read().await.root.clone())
    }
}

fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

fn check(prefixes: &[String], path: &str) -> Result<(), StoreError> {
    match prefixes.iter().find(|prefix| is_under(path, prefix)) {
        Some(prefix) => Err(StoreError::Unavailable {
            reason: format!("injected failure under '{}'", prefix),
        }),
        None => Ok(()),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn lookup<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('/');
    let mut node = root.get(segments.next()?)?;
    for segment in segments {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

fn set_node(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            // A leaf in the way is replaced by the new subtree.
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                set_node(child, rest, value);
            }
        }
    }
}

fn remove_node(map: &mut Map<String, Value>, segments: &[&str]) {
    match segments {
        [] => {}
        [last] => {
            map.remove(*last);
        }
        [head, rest @ ..] => {
            let now_empty = match map.get_mut(*head) {
                Some(Value::Object(child)) => {
                    remove_node(child, rest);
                    child.is_empty()
                }
                _ => false,
            };
            if now_empty {
                map.remove(*head);
            }
        }
    }
}

fn apply(root: &mut Map<String, Value>, path: &str, value: Option<Value>) {
    let segments: Vec<&str> = path.split('/').collect();
    match value {
        Some(value) if !is_empty_value(&value) => set_node(root, &segments, value),
        _ => remove_node(root, &segments),
    }
}

#[async_trait]
impl KeyedStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        validate_path(path)?;
        let state = self.state.read().await;
        check(&state.failing_reads, path)?;
        Ok(lookup(&state.root, path).cloned())
    }

    async fn set_many(&self, batch: WriteBatch) -> Result<(), StoreError> {
        batch.validate()?;
        let mut state = self.state.write().await;
        for path in batch.paths() {
            check(&state.failing_writes, path)?;
        }

        let writes = batch.len();
        let mut staged = state.root.clone();
        for (path, value) in batch.into_writes() {
            apply(&mut staged, &path, value);
        }
        state.root = staged;
        debug!(writes, "applied write batch");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        validate_path(path)?;
        let mut state = self.state.write().await;
        check(&state.failing_writes, path)?;
        apply(&mut state.root, path, None);
        Ok(())
    }

    async fn query_range(
        &self,
        collection: &str,
        query: RangeQuery,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        validate_path(collection)?;
        let state = self.state.read().await;
        check(&state.failing_reads, collection)?;

        let Some(Value::Object(children)) = lookup(&state.root, collection) else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<(String, Value)> = children
            .iter()
            .filter(|(key, _)| match &query.end_before {
                Some(end) => key.as_str() < end.as_str(),
                None => true,
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        if let Some(limit) = query.limit_last {
            let skip = entries.len().saturating_sub(limit);
            entries.drain(..skip);
        }
        Ok(entries)
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        validate_path(collection)?;
        let state = self.state.read().await;
        check(&state.failing_reads, collection)?;
        Ok(match lookup(&state.root, collection) {
            Some(Value::Object(children)) => children.len(),
            _ => 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        for key in ["p1", "p2", "p3", "p4", "p5"] {
            batch.set(format!("Posts/a/{}", key), json!({ "id": key }));
        }
        store.set_many(batch).await.unwrap();
        store
    }

    #[tokio::test]
    async fn query_range_returns_last_entries_before_cursor() {
        let store = seeded().await;

        let first = store.query_range("Posts/a", RangeQuery::last(2)).await.unwrap();
        let keys: Vec<_> = first.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["p4", "p5"]);

        let next = store
            .query_range("Posts/a", RangeQuery::last_before("p4", 2))
            .await
            .unwrap();
        let keys: Vec<_> = next.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["p2", "p3"]);

        let tail = store
            .query_range("Posts/a", RangeQuery::last_before("p1", 2))
            .await
            .unwrap();
        assert!(tail.is_empty());
    }

    #[tokio::test]
    async fn failed_batch_leaves_tree_untouched() {
        let store = seeded().await;
        store.fail_writes_under("Timelines/b").await;

        let mut batch = WriteBatch::new();
        batch.set("Posts/a/p6", json!({ "id": "p6" }));
        batch.set("Timelines/b/p6", json!({ "id": "p6" }));
        assert!(store.set_many(batch).await.is_err());

        assert_eq!(store.get("Posts/a/p6").await.unwrap(), None);
        assert_eq!(store.count("Posts/a").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn delete_prunes_empty_parents_and_is_idempotent() {
        let store = seeded().await;
        for key in ["p1", "p2", "p3", "p4", "p5"] {
            store.delete(&format!("Posts/a/{}", key)).await.unwrap();
        }
        store.delete("Posts/a/p1").await.unwrap();

        assert_eq!(store.get("Posts/a").await.unwrap(), None);
        assert_eq!(store.snapshot().await, json!({}));
    }

    #[tokio::test]
    async fn setting_child_keeps_siblings() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("Users/a", json!({ "username": "alice" }));
        store.set_many(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.set("Users/a/hasPosts", json!(true));
        store.set_many(batch).await.unwrap();

        assert_eq!(
            store.get("Users/a").await.unwrap(),
            Some(json!({ "username": "alice", "hasPosts": true }))
        );
    }
}

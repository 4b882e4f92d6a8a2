//! Post distribution for a photo-sharing feed: write-time fan-out of new
//! posts to follower timelines, cascading deletion, and key-cursor
//! pagination, on top of a hierarchical keyed store.

pub mod bookmarks;
pub mod codec;
pub mod config;
pub mod engagement;
pub mod feed;
pub mod follow;
pub mod handlers;
pub mod posts;
pub mod store;
pub mod users;

pub mod core {
    pub mod db;
    pub mod errors;
    pub mod helpers;
    pub mod query_params;
}

pub mod models {
    pub mod models;
}

pub use crate::core::errors::DistributionError;
pub use crate::feed::{FeedPaginator, FeedSource, PageOutcome};
pub use crate::posts::PostDistributionService;
pub use crate::store::{KeyedStore, MemoryBlobStore, MemoryStore, StoreError};

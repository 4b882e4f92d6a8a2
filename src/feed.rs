//! Read side: reverse-chronological pages over post collections.
//!
//! Every post collection is keyed by push-style ids, so key order is
//! creation order. A page is the last `page_size` keys strictly before the
//! cursor, reversed. The cursor handed back is the oldest key of the page.

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::codec::{decode, KeyedStoreExt};
use crate::config::*;
use crate::core::errors::DistributionError;
use crate::models::models::{FeedPost, Post, PostsPage, UserProfile, ViewerState};
use crate::posts::PostDistributionService;
use crate::store::{KeyedStore, RangeQuery, StoreError};

/// Which collection a page is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// Posts written by a user.
    User(String),
    /// A user's materialized home timeline.
    Timeline(String),
    Discover,
}

impl FeedSource {
    pub fn root(&self) -> String {
        match self {
            FeedSource::User(user_id) => user_posts_key(user_id),
            FeedSource::Timeline(user_id) => timeline_key(user_id),
            FeedSource::Discover => DISCOVER_ROOT.to_string(),
        }
    }
}

pub(crate) fn page_query(page_size: usize, after_key: Option<&str>) -> RangeQuery {
    match after_key {
        Some(after) => RangeQuery::last_before(after, page_size),
        None => RangeQuery::last(page_size),
    }
}

/// Cursor for the page after `entries`. An empty page keeps the old cursor
/// and marks the end of the stream.
pub(crate) fn next_cursor(
    entries: &[(String, Value)],
    after_key: Option<&str>,
) -> (Option<String>, bool) {
    match entries.first() {
        Some((oldest, _)) => (Some(oldest.clone()), false),
        None => (after_key.map(str::to_string), true),
    }
}

impl PostDistributionService {
    pub async fn get_posts_page(
        &self,
        source: &FeedSource,
        page_size: usize,
        after_key: Option<&str>,
        viewer_id: Option<&str>,
    ) -> Result<PostsPage, DistributionError> {
        if page_size == 0 {
            return Err(DistributionError::InvalidPageSize);
        }

        let root = source.root();
        let entries = self
            .store
            .query_range(&root, page_query(page_size, after_key))
            .await
            .map_err(DistributionError::CouldNotLoadPosts)?;
        let (last_key, reached_end) = next_cursor(&entries, after_key);

        let mut posts = Vec::with_capacity(entries.len());
        for (key, value) in entries.into_iter().rev() {
            match decode::<Post>(value) {
                Ok(post) => posts.push(post),
                Err(err) => warn!(collection = %root, key = %key, error = %err, "skipping undecodable post"),
            }
        }

        let posts = self.enrich_posts(posts, viewer_id).await;
        debug!(collection = %root, count = posts.len(), reached_end, "loaded page");

        Ok(PostsPage { posts, last_key, reached_end })
    }

    /// Attaches author profiles, live counters and viewer state. Lookups for
    /// all posts run concurrently; a failed lookup leaves its field empty.
    pub(crate) async fn enrich_posts(&self, posts: Vec<Post>, viewer_id: Option<&str>) -> Vec<FeedPost> {
        let store = self.store.as_ref();
        join_all(posts.into_iter().map(|post| enrich_post(store, post, viewer_id))).await
    }
}

async fn enrich_post(store: &dyn KeyedStore, mut post: Post, viewer_id: Option<&str>) -> FeedPost {
    let author_path = user_key(&post.author_id);
    let canonical_path = user_post_key(&post.author_id, &post.id);
    let (author, canonical, viewer) = futures::join!(
        store.get_json::<UserProfile>(&author_path),
        store.get_json::<Post>(&canonical_path),
        async {
            match viewer_id {
                Some(viewer_id) => Some(viewer_state(store, &post.id, viewer_id).await),
                None => None,
            }
        },
    );

    let author = match author {
        Ok(author) => author,
        Err(err) => {
            warn!(post_id = %post.id, author_id = %post.author_id, error = %err, "author lookup failed");
            None
        }
    };

    // Copies keep the counters they were created with; the author's copy
    // holds the live ones.
    match canonical {
        Ok(Some(current)) => {
            post.like_count = current.like_count;
            post.comment_count = current.comment_count;
        }
        Ok(None) => {}
        Err(err) => warn!(post_id = %post.id, error = %err, "counter lookup failed"),
    }

    let viewer = match viewer {
        Some(Ok(state)) => Some(state),
        Some(Err(err)) => {
            warn!(post_id = %post.id, viewer_id = ?viewer_id, error = %err, "viewer state lookup failed");
            None
        }
        None => None,
    };

    FeedPost { post, author, viewer }
}

async fn viewer_state(store: &dyn KeyedStore, post_id: &str, viewer_id: &str) -> Result<ViewerState, StoreError> {
    let like_path = like_key(post_id, viewer_id);
    let bookmark_path = bookmark_reverse_entry_key(post_id, viewer_id);
    let (liked, bookmarked) = futures::try_join!(
        store.get(&like_path),
        store.get(&bookmark_path),
    )?;
    Ok(ViewerState {
        liked: liked.is_some(),
        bookmarked: bookmarked.is_some(),
    })
}

/// Result of asking a [`FeedPaginator`] for more posts.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Page(Vec<FeedPost>),
    /// Another request for this list is still in flight.
    Busy,
    /// The end of the list was reached earlier.
    Exhausted,
}

#[derive(Debug, Default)]
struct Cursor {
    last_key: Option<String>,
    has_hit_end: bool,
}

/// Pagination state for one list on screen.
///
/// Only one page request runs at a time; overlapping calls get
/// [`PageOutcome::Busy`] instead of a duplicate fetch. Once a page comes
/// back empty the list stays exhausted until [`FeedPaginator::reset`].
pub struct FeedPaginator {
    source: FeedSource,
    page_size: usize,
    viewer_id: Option<String>,
    cursor: Mutex<Cursor>,
}

impl FeedPaginator {
    pub fn new(source: FeedSource, page_size: usize, viewer_id: Option<String>) -> Self {
        Self {
            source,
            page_size,
            viewer_id,
            cursor: Mutex::new(Cursor::default()),
        }
    }

    pub async fn next_page(&self, service: &PostDistributionService) -> Result<PageOutcome, DistributionError> {
        let Ok(mut cursor) = self.cursor.try_lock() else {
            return Ok(PageOutcome::Busy);
        };
        if cursor.has_hit_end {
            return Ok(PageOutcome::Exhausted);
        }

        let page = service
            .get_posts_page(
                &self.source,
                self.page_size,
                cursor.last_key.as_deref(),
                self.viewer_id.as_deref(),
            )
            .await?;

        if page.reached_end || page.last_key == cursor.last_key {
            cursor.has_hit_end = true;
        }
        cursor.last_key = page.last_key;
        Ok(PageOutcome::Page(page.posts))
    }

    pub async fn has_hit_end(&self) -> bool {
        self.cursor.lock().await.has_hit_end
    }

    /// Starts over from the newest post, as on pull-to-refresh.
    pub async fn reset(&self) {
        *self.cursor.lock().await = Cursor::default();
    }
}

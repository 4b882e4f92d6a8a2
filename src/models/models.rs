use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub photo_url: String,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        author_id: impl Into<String>,
        photo_url: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            photo_url: photo_url.into(),
            caption: caption.into(),
            created_at: Utc::now(),
            like_count: 0,
            comment_count: 0,
        }
    }
}

/// Stored at `Users/{userId}`. `hasPosts` is maintained by the distribution service.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub has_posts: bool,
}

/// Edge record under `Followers/{user}/{follower}` and `Following/{user}/{target}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FollowEdge {
    pub user_id: String,
}

/// Forward bookmark entry under `Bookmarks/{owner}/{bookmarkId}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRef {
    pub post_id: String,
    pub author_id: String,
}

/// Reverse entry under `BookmarksReverseIndex/{postId}/{owner}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReverseBookmark {
    pub bookmark_id: String,
}

/// Ownership record under `PostOwners/{postId}`. Lives until a delete of
/// the post has fully succeeded.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostOwner {
    pub author_id: String,
    pub photo_url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// What the requesting viewer has done with a post.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ViewerState {
    pub liked: bool,
    pub bookmarked: bool,
}

/// A post as served in a page, with its lookups attached.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub post: Post,
    pub author: Option<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer: Option<ViewerState>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostsPage {
    /// Newest first.
    pub posts: Vec<FeedPost>,
    /// Pass back as `after` to fetch the next page.
    pub last_key: Option<String>,
    pub reached_end: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentsPage {
    pub comments: Vec<Comment>,
    pub last_key: Option<String>,
    pub reached_end: bool,
}

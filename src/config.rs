// === Limits ===
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;

// === Namespace roots ===
pub const POSTS_ROOT: &str = "Posts";
pub const TIMELINES_ROOT: &str = "Timelines";
pub const DISCOVER_ROOT: &str = "DiscoverPosts";
pub const FOLLOWERS_ROOT: &str = "Followers";
pub const FOLLOWING_ROOT: &str = "Following";
pub const BOOKMARKS_ROOT: &str = "Bookmarks";
pub const BOOKMARKS_REVERSE_ROOT: &str = "BookmarksReverseIndex";
pub const USERS_ROOT: &str = "Users";
pub const COMMENTS_ROOT: &str = "Comments";
pub const LIKES_ROOT: &str = "Likes";
pub const DELIVERIES_ROOT: &str = "PostDeliveries";
pub const OWNERS_ROOT: &str = "PostOwners";

// === Keys ===
pub fn user_posts_key(user_id: &str) -> String {
    format!("{}/{}", POSTS_ROOT, user_id)
}

pub fn user_post_key(user_id: &str, post_id: &str) -> String {
    format!("{}/{}/{}", POSTS_ROOT, user_id, post_id)
}

pub fn timeline_key(user_id: &str) -> String {
    format!("{}/{}", TIMELINES_ROOT, user_id)
}

pub fn timeline_entry_key(user_id: &str, post_id: &str) -> String {
    format!("{}/{}/{}", TIMELINES_ROOT, user_id, post_id)
}

pub fn discover_entry_key(post_id: &str) -> String {
    format!("{}/{}", DISCOVER_ROOT, post_id)
}

pub fn followers_key(user_id: &str) -> String {
    format!("{}/{}", FOLLOWERS_ROOT, user_id)
}

pub fn follower_key(user_id: &str, follower_id: &str) -> String {
    format!("{}/{}/{}", FOLLOWERS_ROOT, user_id, follower_id)
}

pub fn followings_key(user_id: &str) -> String {
    format!("{}/{}", FOLLOWING_ROOT, user_id)
}

pub fn following_key(user_id: &str, following_id: &str) -> String {
    format!("{}/{}/{}", FOLLOWING_ROOT, user_id, following_id)
}

pub fn bookmarks_key(user_id: &str) -> String {
    format!("{}/{}", BOOKMARKS_ROOT, user_id)
}

pub fn bookmark_key(user_id: &str, bookmark_id: &str) -> String {
    format!("{}/{}/{}", BOOKMARKS_ROOT, user_id, bookmark_id)
}

pub fn bookmark_reverse_key(post_id: &str) -> String {
    format!("{}/{}", BOOKMARKS_REVERSE_ROOT, post_id)
}

pub fn bookmark_reverse_entry_key(post_id: &str, user_id: &str) -> String {
    format!("{}/{}/{}", BOOKMARKS_REVERSE_ROOT, post_id, user_id)
}

pub fn user_key(user_id: &str) -> String {
    format!("{}/{}", USERS_ROOT, user_id)
}

pub fn has_posts_key(user_id: &str) -> String {
    format!("{}/{}/hasPosts", USERS_ROOT, user_id)
}

pub fn comments_key(post_id: &str) -> String {
    format!("{}/{}", COMMENTS_ROOT, post_id)
}

pub fn comment_key(post_id: &str, comment_id: &str) -> String {
    format!("{}/{}/{}", COMMENTS_ROOT, post_id, comment_id)
}

pub fn likes_key(post_id: &str) -> String {
    format!("{}/{}", LIKES_ROOT, post_id)
}

pub fn like_key(post_id: &str, user_id: &str) -> String {
    format!("{}/{}/{}", LIKES_ROOT, post_id, user_id)
}

pub fn deliveries_key(post_id: &str) -> String {
    format!("{}/{}", DELIVERIES_ROOT, post_id)
}

pub fn delivery_key(post_id: &str, user_id: &str) -> String {
    format!("{}/{}/{}", DELIVERIES_ROOT, post_id, user_id)
}

pub fn owner_key(post_id: &str) -> String {
    format!("{}/{}", OWNERS_ROOT, post_id)
}

// === Environment ===
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

pub fn bind_address() -> String {
    std::env::var("POSTLINE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}

pub fn log_filter() -> String {
    std::env::var("POSTLINE_LOG").unwrap_or_else(|_| "info".to_string())
}

pub fn default_page_size() -> usize {
    env_or("POSTLINE_DEFAULT_PAGE_SIZE", 12)
}

pub fn max_page_size() -> usize {
    env_or("POSTLINE_MAX_PAGE_SIZE", 50)
}

pub fn max_caption_length() -> usize {
    env_or("POSTLINE_MAX_CAPTION_LENGTH", 2200)
}

pub fn seed_demo_data() -> bool {
    env_or("POSTLINE_SEED_DEMO", false)
}

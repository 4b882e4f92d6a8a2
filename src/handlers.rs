use actix_web::{web, HttpRequest, HttpResponse};

use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{caller_id, new_key, validate_key};
use crate::core::query_params::page_params;
use crate::feed::FeedSource;
use crate::follow::{follow_user, get_followers, get_followings, unfollow_user};
use crate::models::models::Post;
use crate::posts::PostDistributionService;
use crate::users::{get_profile as load_profile, sanitize_text, save_profile};

pub struct AppState {
    pub service: PostDistributionService,
}

type HandlerResult = Result<HttpResponse, ApiError>;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/posts", web::post().to(create_post))
        .route("/posts/{post_id}", web::delete().to(delete_post))
        .route("/posts/{author_id}/{post_id}/likes", web::post().to(like_post))
        .route("/posts/{author_id}/{post_id}/likes", web::delete().to(unlike_post))
        .route("/posts/{author_id}/{post_id}/comments", web::get().to(list_comments))
        .route("/posts/{author_id}/{post_id}/comments", web::post().to(add_comment))
        .route("/users/{user_id}/posts", web::get().to(user_posts))
        .route("/timeline", web::get().to(timeline))
        .route("/discover", web::get().to(discover))
        .route("/bookmarks", web::get().to(list_bookmarks))
        .route("/bookmarks", web::post().to(add_bookmark))
        .route("/bookmarks/{post_id}", web::delete().to(remove_bookmark))
        .route("/follow", web::post().to(handle_follow))
        .route("/unfollow", web::post().to(handle_unfollow))
        .route("/followers/{user_id}", web::get().to(get_followers_list))
        .route("/followings/{user_id}", web::get().to(get_followings_list))
        .route("/profile", web::get().to(get_profile))
        .route("/profile", web::put().to(update_profile));
}

fn json_body(body: &web::Bytes) -> Result<serde_json::Value, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))
}

fn checked_key(id: &str, what: &str) -> Result<(), ApiError> {
    if validate_key(id) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("Invalid {}", what)))
    }
}

// === Posts ===

async fn create_post(req: HttpRequest, state: web::Data<AppState>, body: web::Bytes) -> HandlerResult {
    let user_id = caller_id(&req)?;
    let value = json_body(&body)?;
    let photo_url = value["photoUrl"].as_str().unwrap_or_default();
    let caption = value["caption"].as_str().unwrap_or_default();

    if photo_url.is_empty() {
        return Err(ApiError::BadRequest("photoUrl is required".to_string()));
    }

    let post = Post::new(new_key(), user_id.clone(), photo_url, caption);
    let post = state.service.create_post(&post, &user_id).await?;

    Ok(HttpResponse::Created().json(&post))
}

async fn delete_post(req: HttpRequest, state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let user_id = caller_id(&req)?;
    let post_id = path.into_inner();
    checked_key(&post_id, "post id")?;

    match state.service.post_owner(&post_id).await? {
        Some(owner) if owner.author_id != user_id => return Err(ApiError::Forbidden),
        Some(owner) => {
            state
                .service
                .delete_post(&post_id, &user_id, Some(&owner.photo_url))
                .await?
        }
        // Never existed, or an earlier delete already finished.
        None => {}
    }
    Ok(HttpResponse::NoContent().finish())
}

async fn like_post(req: HttpRequest, state: web::Data<AppState>, path: web::Path<(String, String)>) -> HandlerResult {
    let user_id = caller_id(&req)?;
    let (author_id, post_id) = path.into_inner();
    checked_key(&author_id, "author id")?;
    checked_key(&post_id, "post id")?;

    let like_count = state.service.like_post(&user_id, &author_id, &post_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"likeCount": like_count})))
}

async fn unlike_post(req: HttpRequest, state: web::Data<AppState>, path: web::Path<(String, String)>) -> HandlerResult {
    let user_id = caller_id(&req)?;
    let (author_id, post_id) = path.into_inner();
    checked_key(&author_id, "author id")?;
    checked_key(&post_id, "post id")?;

    let like_count = state.service.unlike_post(&user_id, &author_id, &post_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"likeCount": like_count})))
}

async fn list_comments(req: HttpRequest, state: web::Data<AppState>, path: web::Path<(String, String)>) -> HandlerResult {
    let (_, post_id) = path.into_inner();
    checked_key(&post_id, "post id")?;
    let (limit, after) = page_params(&req.uri().to_string());

    let page = state.service.comments_page(&post_id, limit, after.as_deref()).await?;
    Ok(HttpResponse::Ok().json(&page))
}

async fn add_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Bytes,
) -> HandlerResult {
    let user_id = caller_id(&req)?;
    let (author_id, post_id) = path.into_inner();
    checked_key(&author_id, "author id")?;
    checked_key(&post_id, "post id")?;
    let value = json_body(&body)?;
    let text = sanitize_text(value["text"].as_str().unwrap_or_default());

    let comment = state.service.add_comment(&author_id, &post_id, &user_id, &text).await?;
    Ok(HttpResponse::Created().json(&comment))
}

// === Feeds ===

async fn user_posts(req: HttpRequest, state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let user_id = path.into_inner();
    checked_key(&user_id, "user id")?;
    let viewer = caller_id(&req).ok();
    let (limit, after) = page_params(&req.uri().to_string());

    let page = state
        .service
        .get_posts_page(&FeedSource::User(user_id), limit, after.as_deref(), viewer.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(&page))
}

async fn timeline(req: HttpRequest, state: web::Data<AppState>) -> HandlerResult {
    let user_id = caller_id(&req)?;
    let (limit, after) = page_params(&req.uri().to_string());

    let page = state
        .service
        .get_posts_page(&FeedSource::Timeline(user_id.clone()), limit, after.as_deref(), Some(&user_id))
        .await?;
    Ok(HttpResponse::Ok().json(&page))
}

async fn discover(req: HttpRequest, state: web::Data<AppState>) -> HandlerResult {
    let viewer = caller_id(&req).ok();
    let (limit, after) = page_params(&req.uri().to_string());

    let page = state
        .service
        .get_posts_page(&FeedSource::Discover, limit, after.as_deref(), viewer.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(&page))
}

// === Bookmarks ===

async fn list_bookmarks(req: HttpRequest, state: web::Data<AppState>) -> HandlerResult {
    let user_id = caller_id(&req)?;
    let (limit, after) = page_params(&req.uri().to_string());

    let page = state.service.bookmarks_page(&user_id, limit, after.as_deref()).await?;
    Ok(HttpResponse::Ok().json(&page))
}

async fn add_bookmark(req: HttpRequest, state: web::Data<AppState>, body: web::Bytes) -> HandlerResult {
    let user_id = caller_id(&req)?;
    let value = json_body(&body)?;
    let post_id = value["postId"].as_str().unwrap_or_default();
    let author_id = value["authorId"].as_str().unwrap_or_default();
    checked_key(post_id, "post id")?;
    checked_key(author_id, "author id")?;

    let bookmark_id = state.service.add_bookmark(&user_id, post_id, author_id).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({"bookmarkId": bookmark_id})))
}

async fn remove_bookmark(req: HttpRequest, state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let user_id = caller_id(&req)?;
    let post_id = path.into_inner();
    checked_key(&post_id, "post id")?;

    state.service.remove_bookmark(&user_id, &post_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

// === Follows ===

fn target_user(body: &web::Bytes, user_id: &str) -> Result<String, ApiError> {
    let value = json_body(body)?;
    let target_user_id = value["targetUserId"].as_str().unwrap_or_default();
    if !validate_key(target_user_id) || target_user_id == user_id {
        return Err(ApiError::BadRequest("Invalid target user".to_string()));
    }
    Ok(target_user_id.to_string())
}

async fn handle_follow(req: HttpRequest, state: web::Data<AppState>, body: web::Bytes) -> HandlerResult {
    let user_id = caller_id(&req)?;
    let target_user_id = target_user(&body, &user_id)?;

    let store = state.service.store();
    if load_profile(store.as_ref(), &target_user_id).await?.is_none() {
        return Err(ApiError::NotFound("Target user not found".to_string()));
    }
    follow_user(store.as_ref(), &user_id, &target_user_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({"status": "followed"})))
}

async fn handle_unfollow(req: HttpRequest, state: web::Data<AppState>, body: web::Bytes) -> HandlerResult {
    let user_id = caller_id(&req)?;
    let target_user_id = target_user(&body, &user_id)?;

    unfollow_user(state.service.store().as_ref(), &user_id, &target_user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"status": "unfollowed"})))
}

async fn get_followers_list(state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let user_id = path.into_inner();
    checked_key(&user_id, "user id")?;

    let followers = get_followers(state.service.store().as_ref(), &user_id).await?;
    Ok(HttpResponse::Ok().json(&followers))
}

async fn get_followings_list(state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let user_id = path.into_inner();
    checked_key(&user_id, "user id")?;

    let followings = get_followings(state.service.store().as_ref(), &user_id).await?;
    Ok(HttpResponse::Ok().json(&followings))
}

// === Profile ===

async fn get_profile(req: HttpRequest, state: web::Data<AppState>) -> HandlerResult {
    let user_id = caller_id(&req)?;
    match load_profile(state.service.store().as_ref(), &user_id).await? {
        Some(profile) => Ok(HttpResponse::Ok().json(&profile)),
        None => Err(ApiError::NotFound("User not found".to_string())),
    }
}

async fn update_profile(req: HttpRequest, state: web::Data<AppState>, body: web::Bytes) -> HandlerResult {
    let user_id = caller_id(&req)?;
    let value = json_body(&body)?;
    let username = sanitize_text(value["username"].as_str().unwrap_or_default());
    let profile_image_url = value["profileImageUrl"].as_str();

    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest("Username must be 3-50 characters".to_string()));
    }

    let profile = save_profile(state.service.store().as_ref(), &user_id, &username, profile_image_url).await?;
    Ok(HttpResponse::Ok().json(&profile))
}

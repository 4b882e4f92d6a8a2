use actix_web::HttpRequest;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::store::validate_path;

/// Header carrying the caller's user id, set by the gateway in front of us.
pub const USER_HEADER: &str = "X-User-Id";

/// Push-style key: time-ordered, so lexical order matches creation order.
pub fn new_key() -> String {
    Uuid::now_v7().to_string()
}

/// A key usable as a single path segment.
pub fn validate_key(id: &str) -> bool {
    !id.contains('/') && validate_path(id).is_ok()
}

pub fn caller_id(req: &HttpRequest) -> Result<String, ApiError> {
    let user_id = req
        .headers()
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if user_id.is_empty() || !validate_key(user_id) {
        return Err(ApiError::Unauthorized);
    }
    Ok(user_id.to_string())
}

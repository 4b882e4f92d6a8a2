use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;
use thiserror::Error;

use crate::store::StoreError;

/// Failures of the distribution service. Store errors are wrapped as the
/// source of the operation that hit them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DistributionError {
    #[error("could not upload post")]
    CouldNotUploadPost(#[source] StoreError),
    #[error("could not delete post")]
    CouldNotDeletePost(#[source] StoreError),
    #[error("could not load posts")]
    CouldNotLoadPosts(#[source] StoreError),
    #[error("could not load data")]
    CouldNotLoadData(#[source] StoreError),
    #[error("invalid post: {0}")]
    InvalidPost(String),
    #[error("page size must be positive")]
    InvalidPageSize,
    #[error("post {post_id} not found")]
    PostNotFound { post_id: String },
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::Forbidden => write!(f, "Forbidden"),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let msg = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::InternalError(msg) => {
                msg.clone()
            }
            ApiError::Unauthorized => "Unauthorized".to_string(),
            ApiError::Forbidden => "Forbidden".to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({"error": msg}))
    }
}

impl std::error::Error for ApiError {}

impl From<DistributionError> for ApiError {
    fn from(err: DistributionError) -> Self {
        match err {
            DistributionError::InvalidPost(msg) => ApiError::BadRequest(msg),
            DistributionError::InvalidPageSize => ApiError::BadRequest(err.to_string()),
            DistributionError::PostNotFound { .. } => ApiError::NotFound(err.to_string()),
            other => {
                tracing::error!(error = ?other, "request failed");
                ApiError::InternalError(other.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store request failed");
        ApiError::InternalError(err.to_string())
    }
}

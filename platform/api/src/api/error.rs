use common::http::RouteError;
use hyper::StatusCode;

use super::middleware::auth::AuthError;
use crate::store::StoreError;

pub type Result<T, E = RouteError<ApiError>> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("failed to read http body: {0}")]
    ParseHttpBody(#[from] hyper::Error),
    #[error("failed to parse json body: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Maps the store taxonomy onto http statuses. Database failures stay
/// opaque to the client and get logged through the error handler.
#[track_caller]
pub fn map_store_error(err: StoreError) -> RouteError<ApiError> {
    let (status, message) = match &err {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        StoreError::Validation { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        StoreError::Database(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        ),
    };

    RouteError::from((status, message)).with_source(Some(ApiError::Store(err)))
}

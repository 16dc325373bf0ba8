use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::store::StoreError;

pub const USER_NOT_FOUND_MESSAGE: &str = "User not found";

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Maps a store failure to a response. `failure` is what the client
    /// sees when storage itself broke; the cause only goes to the log.
    pub fn from_store(err: StoreError, failure: &'static str) -> Self {
        match err {
            StoreError::Validation(invalid) => Self::bad_request(invalid.reason),
            StoreError::Conflict(message) => Self::bad_request(message),
            StoreError::NotFound(_) => Self::not_found(),
            StoreError::Storage(detail) => {
                error!(detail = %detail, "{}", failure);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, failure)
            }
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, USER_NOT_FOUND_MESSAGE)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

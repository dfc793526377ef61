use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fluentcloud_common::CloudError;
use std::fmt;

/// Error answered with the service's `{"error": {"code", "message"}}` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl CloudApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        CloudApiError {
            status,
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn unauthorized(code: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::bad_request("InvalidParameter", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError", message)
    }
}

impl fmt::Display for CloudApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.code, self.message)
    }
}

impl IntoResponse for CloudApiError {
    fn into_response(self) -> Response {
        tracing::debug!("[mock] {}", self);
        (self.status, Json(CloudError::new(self.code, self.message))).into_response()
    }
}

pub type ApiResult<T> = Result<T, CloudApiError>;

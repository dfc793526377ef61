use fluentcloud_common::ResourceIdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("long-running operation failed: {code}: {message}")]
    OperationFailed { code: String, message: String },

    #[error("long-running operation did not finish after {attempts} polls")]
    PollTimeout { attempts: u32 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ResourceId(#[from] ResourceIdError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SdkError {
    /// Error code reported by the service, if this error came from one.
    pub fn service_code(&self) -> Option<&str> {
        match self {
            SdkError::Service { code, .. } | SdkError::OperationFailed { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SdkError::Service { status, .. } => Some(*status),
            SdkError::NotFound(_) => Some(404),
            SdkError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SdkError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_code_is_exposed() {
        let err = SdkError::Service {
            status: 400,
            code: "InvalidParameter".to_string(),
            message: "bad".to_string(),
        };
        assert_eq!(err.service_code(), Some("InvalidParameter"));
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_not_found());
        assert_eq!(SdkError::NotFound("x".into()).status(), Some(404));
    }
}

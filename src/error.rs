use serde::Serialize;
use thiserror::Error;

/// Application-wide error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("The server has been run before!")]
    AlreadyBootstrapped,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Failed to create directory {path}: {source}")]
    DirectoryFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to obtain jar file: {0}")]
    ArtifactProvisionFailed(String),

    #[error("Failed to save configuration: {0}")]
    PersistFailed(String),

    #[error("User exists")]
    UserExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Failed to create user: {0}")]
    CreateFailed(String),

    #[error("User deletion failed: {0}")]
    DeleteFailed(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used for status codes and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    GuardViolation,
    Validation,
    Resource,
    Conflict,
    Store,
    Unauthorized,
}

impl AppError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyBootstrapped => ErrorKind::GuardViolation,
            Self::Validation(_) => ErrorKind::Validation,
            Self::DirectoryFailed { .. }
            | Self::ArtifactProvisionFailed(_)
            | Self::PersistFailed(_)
            | Self::Config(_)
            | Self::Internal(_) => ErrorKind::Resource,
            Self::UserExists | Self::UserNotFound => ErrorKind::Conflict,
            Self::CreateFailed(_) | Self::DeleteFailed(_) | Self::Database(_) => ErrorKind::Store,
            Self::Unauthorized => ErrorKind::Unauthorized,
        }
    }

    /// Envelope code returned to HTTP callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyBootstrapped => "is_not_first_run",
            Self::Validation(_) => "invalid_input",
            Self::UserExists => "User exists",
            Self::UserNotFound => "User not found",
            Self::CreateFailed(_) => "Failed to create user",
            Self::DeleteFailed(_) => "User deletion failed",
            Self::Unauthorized => "unauthorized",
            Self::DirectoryFailed { .. }
            | Self::ArtifactProvisionFailed(_)
            | Self::PersistFailed(_)
            | Self::Config(_)
            | Self::Database(_)
            | Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Structured error envelope: `{code, moreinfo?, debuginfo?}`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moreinfo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debuginfo: Option<String>,
}

/// Convert AppError to HTTP status codes for web responses
impl AppError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self.kind() {
            ErrorKind::GuardViolation => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Resource => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Conflict => match self {
                Self::UserNotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::CONFLICT,
            },
            ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let (moreinfo, debuginfo) = match self.kind() {
            ErrorKind::GuardViolation | ErrorKind::Validation | ErrorKind::Unauthorized => {
                (Some(self.to_string()), None)
            }
            ErrorKind::Resource => (None, Some(self.to_string())),
            ErrorKind::Conflict | ErrorKind::Store => (None, None),
        };

        ErrorEnvelope {
            code: self.code(),
            moreinfo,
            debuginfo,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self.kind() {
            ErrorKind::Resource | ErrorKind::Store => tracing::error!("ERROR: {}", self),
            _ => tracing::debug!("Request rejected: {}", self),
        }

        let status = self.status_code();
        (status, axum::Json(self.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn test_guard_violation_envelope() {
        let err = AppError::AlreadyBootstrapped;
        assert_eq!(err.kind(), ErrorKind::GuardViolation);
        let envelope = err.envelope();
        assert_eq!(envelope.code, "is_not_first_run");
        assert_eq!(
            envelope.moreinfo.as_deref(),
            Some("The server has been run before!")
        );
        assert!(envelope.debuginfo.is_none());
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_resource_errors_are_internal_with_debuginfo() {
        let err = AppError::ArtifactProvisionFailed("invalid_jar".to_string());
        let envelope = err.envelope();
        assert_eq!(envelope.code, "internal");
        assert!(envelope.debuginfo.unwrap().contains("invalid_jar"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_errors_hide_detail() {
        let err = AppError::CreateFailed("disk I/O error".to_string());
        let envelope = err.envelope();
        assert_eq!(envelope.code, "Failed to create user");
        assert!(envelope.moreinfo.is_none());
        assert!(envelope.debuginfo.is_none());
    }

    #[test]
    fn test_user_error_status_codes() {
        assert_eq!(AppError::UserExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::UserNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::validation("bad port").status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}

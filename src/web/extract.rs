//! JSON body extractor whose rejections use the service error envelope.

use crate::error::AppError;
use axum::extract::{rejection::JsonRejection, FromRequest};

/// `axum::Json` with malformed bodies reported as `invalid_input`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

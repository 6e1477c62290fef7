use poem_openapi::Object;

use crate::core::error::QrError;

#[derive(Object, Debug)]
pub struct ErrorResponse {
    /// Human readable reason
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(filepath: &str, function: &str, err: &QrError) -> Self {
        match err {
            QrError::Internal(detail) => {
                tracing::error!("error: on {}::{} error: {}", filepath, function, detail)
            }
            other => tracing::warn!("rejected: on {}::{} reason: {}", filepath, function, other),
        }
        Self {
            detail: err.client_message(),
        }
    }

    pub fn message(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

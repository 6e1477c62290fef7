use std::fmt::{Display, Error, Formatter};

use poem::http::StatusCode;

use crate::core::options::{EcLevel, OutputFormat};

// Error
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrError {
    // Request normalizer
    MissingData,
    UnsupportedFormat { format: String, supported: &'static [OutputFormat] },
    InvalidErrorCorrection(String),
    InvalidParameter { field: String, reason: String },
    PayloadTooLarge { field: String, limit: usize },

    // Encoder
    CapacityExceeded { version: Option<u8>, ec_level: EcLevel },

    // Post-processor / decoder
    InvalidLogoImage,
    InvalidImage,

    // Batch
    BatchFailed(Vec<BatchItemError>),

    // Anything the caller cannot fix; detail is logged, never returned
    Internal(String),
}

/// One failed batch item, 1-based like the generated file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemError {
    pub index: usize,
    pub detail: String,
}

impl QrError {
    pub fn invalid_parameter(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { field: field.into(), reason: reason.into() }
    }

    pub fn internal(err: impl Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to hand back to the client.
    pub fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error.".to_string(),
            other => other.to_string(),
        }
    }
}

impl Display for QrError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        match self {
            Self::MissingData => f.write_str("'data' field must not be empty."),
            Self::UnsupportedFormat { format, supported } => {
                let names: Vec<&str> = supported.iter().map(|s| s.as_str()).collect();
                write!(
                    f,
                    "Unsupported format '{}'. Supported formats: {}.",
                    format,
                    names.join(", ")
                )
            }
            Self::InvalidErrorCorrection(value) => write!(
                f,
                "Invalid error correction level '{}'. Expected one of: L, M, Q, H.",
                value
            ),
            Self::InvalidParameter { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            Self::PayloadTooLarge { field, limit } => {
                write!(f, "Upload '{}' exceeds the limit of {} bytes.", field, limit)
            }
            Self::CapacityExceeded { version: Some(v), ec_level } => write!(
                f,
                "Data too long for QR version {} with error correction {}. \
                 Use a higher version or a lower error correction level.",
                v, ec_level
            ),
            Self::CapacityExceeded { version: None, ec_level } => write!(
                f,
                "Data too long for any QR version with error correction {}. \
                 Use a lower error correction level or shorter data.",
                ec_level
            ),
            Self::InvalidLogoImage => f.write_str("Invalid logo image file."),
            Self::InvalidImage => f.write_str("Invalid image file: could not read an image from the upload."),
            Self::BatchFailed(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| format!("item {}: {}", item.index, item.detail))
                    .collect();
                write!(f, "All {} batch items failed. {}", items.len(), parts.join("; "))
            }
            Self::Internal(detail) => write!(f, "Internal error: {}", detail),
        }
    }
}

impl std::error::Error for QrError {}

pub type QrResult<T> = Result<T, QrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = QrError::internal("png encoder exploded at /srv/secret");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.client_message().contains("secret"));
    }

    #[test]
    fn capacity_message_suggests_fix() {
        let err = QrError::CapacityExceeded { version: Some(1), ec_level: EcLevel::H };
        let msg = err.to_string();
        assert!(msg.contains("version 1"));
        assert!(msg.contains("higher version"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn batch_failure_names_items() {
        let err = QrError::BatchFailed(vec![
            BatchItemError { index: 1, detail: "'data' field must not be empty.".into() },
            BatchItemError { index: 3, detail: "bad".into() },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("item 1"));
        assert!(msg.contains("item 3"));
    }
}

//! Error types for the signing API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use signinjector_core::{CoreError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid signature image: {0}")]
    InvalidSignature(String),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Request body too large: {0}")]
    BodyTooLarge(String),

    #[error("PDF not found: {0}")]
    PdfNotFound(String),

    #[error("PDF exceeds the {limit} byte limit")]
    PdfTooLarge { limit: usize },

    #[error("No file provided")]
    NoFile,

    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Audit lookup failed: {0}")]
    AuditLookup(sqlx::Error),

    #[error("Signing failed: {0}")]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP status and wire code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.code()),
            ApiError::InvalidSignature(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_SIGNATURE")
            }
            ApiError::InvalidJson(_) => (StatusCode::BAD_REQUEST, "INVALID_JSON"),
            ApiError::BodyTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "REQUEST_TOO_LARGE"),
            ApiError::PdfNotFound(_) => (StatusCode::NOT_FOUND, "PDF_NOT_FOUND"),
            ApiError::PdfTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "PDF_TOO_LARGE"),
            ApiError::NoFile => (StatusCode::BAD_REQUEST, "NO_FILE"),
            ApiError::InvalidFileType(_) => (StatusCode::BAD_REQUEST, "INVALID_FILE_TYPE"),
            ApiError::Upload(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UPLOAD_FAILED"),
            ApiError::AuditLookup(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AUDIT_LOOKUP_FAILED")
            }
            ApiError::Core(_) | ApiError::Database(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SIGN_PDF_FAILED")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            ApiError::Validation(e) => {
                tracing::warn!(code, "Rejected request: {}", e.message);
                e.message.clone()
            }
            ApiError::Upload(e) => {
                tracing::error!("Upload failed: {}", e);
                "Failed to store upload".to_string()
            }
            ApiError::AuditLookup(e) => {
                tracing::error!("Audit lookup failed: {}", e);
                "Failed to load audit records".to_string()
            }
            // Internal detail stays in the log
            ApiError::Core(_) | ApiError::Database(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                tracing::error!("Signing failed: {}", self);
                "Failed to sign PDF".to_string()
            }
            other => {
                tracing::warn!(code, "Rejected request: {}", other);
                other.to_string()
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signinjector_core::validate;

    #[test]
    fn test_validation_maps_to_422() {
        let err: ApiError = validate(&json!({})).unwrap().into();
        assert_eq!(
            err.status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_PDF_ID")
        );
    }

    #[test]
    fn test_internal_failures_share_one_code() {
        let core: ApiError = CoreError::UnsupportedImageFormat.into();
        let io: ApiError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert_eq!(core.status_and_code().1, "SIGN_PDF_FAILED");
        assert_eq!(io.status_and_code().1, "SIGN_PDF_FAILED");
    }

    #[test]
    fn test_size_errors() {
        let err = ApiError::PdfTooLarge { limit: 10 };
        assert_eq!(
            err.status_and_code(),
            (StatusCode::PAYLOAD_TOO_LARGE, "PDF_TOO_LARGE")
        );
        let err = ApiError::BodyTooLarge("length limit exceeded".into());
        assert_eq!(
            err.status_and_code(),
            (StatusCode::PAYLOAD_TOO_LARGE, "REQUEST_TOO_LARGE")
        );
    }
}

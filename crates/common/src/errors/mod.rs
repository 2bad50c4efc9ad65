//! Error types shared by the gateway, the catalog and the submission client
//!
//! Every failure is an [`AppError`]. Over HTTP it renders as
//! `{"error": {"code", "message", "details"?}}`; server-side failures never
//! leak their detail into `message`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Message returned to callers for every server-side failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Machine-readable code carried in every error body
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    MissingField,
    InvalidFormat,
    InvalidFileType,
    PayloadTooLarge,
    Unauthorized,
    InvalidToken,
    PaperNotFound,
    FileNotFound,
    RateLimited,
    DatabaseError,
    ConnectionError,
    StorageError,
    UpstreamError,
    InternalError,
    ConfigurationError,
    SerializationError,
    ServiceUnavailable,
}

#[derive(Error, Debug)]
pub enum AppError {
    // Rejected input
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Validation failed for {} field(s)", .0.len())]
    FieldErrors(BTreeMap<String, String>),

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("File path is required")]
    MissingFilePath,

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Invalid file type")]
    InvalidFileType { content_type: String },

    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    // No usable identity
    #[error("{message}")]
    Unauthorized { message: String },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Paper not found")]
    PaperNotFound { id: String },

    #[error("File not found")]
    FileNotFound { path: String },

    #[error("Rate limit exceeded")]
    RateLimited { origin: String },

    // Transport and backend failures
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Upstream error: {message}")]
    Upstream { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } | AppError::FieldErrors(_) => ErrorCode::ValidationError,
            AppError::MissingField { .. } | AppError::MissingFilePath => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::InvalidFileType { .. } => ErrorCode::InvalidFileType,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::FileNotFound { .. } => ErrorCode::FileNotFound,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Storage { .. } => ErrorCode::StorageError,
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. }
            | AppError::FieldErrors(_)
            | AppError::MissingField { .. }
            | AppError::MissingFilePath
            | AppError::InvalidFormat { .. }
            | AppError::InvalidFileType { .. } => StatusCode::BAD_REQUEST,

            AppError::Unauthorized { .. } | AppError::InvalidToken => StatusCode::UNAUTHORIZED,

            AppError::PaperNotFound { .. } | AppError::FileNotFound { .. } => StatusCode::NOT_FOUND,

            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Storage { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,

            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to hand back to callers. Server-side failures collapse
    /// to a generic message; the detail only goes to the logs.
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::FieldErrors(fields) => serde_json::to_value(fields).ok(),
            AppError::Validation { field: Some(field), .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        }
    }
}

/// Wire shape of every error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Generic internal error body, used by the panic boundary as well
    pub fn internal() -> Self {
        Self {
            error: ErrorDetails {
                code: ErrorCode::InternalError,
                message: INTERNAL_ERROR_MESSAGE.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = ?code, status = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %self, code = ?code, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message: self.public_message(),
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<object_store::Error> for AppError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => AppError::FileNotFound { path },
            other => AppError::Storage {
                message: other.to_string(),
            },
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::PaperNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::PaperNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_missing_field_message() {
        let err = AppError::MissingField { field: "abstract".into() };
        assert_eq!(err.to_string(), "Missing required field: abstract");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingFilePath.to_string(), "File path is required");
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = AppError::Internal {
            message: "connection string leaked".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
        assert_eq!(err.public_message(), INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn test_client_errors_keep_detail() {
        let err = AppError::Validation {
            message: "Invalid title".into(),
            field: Some("title".into()),
        };
        assert!(err.is_client_error());
        assert_eq!(err.public_message(), "Validation failed: Invalid title");
    }

    #[test]
    fn test_missing_object_maps_to_not_found() {
        let err: AppError = object_store::Error::NotFound {
            path: "papers/1_x.pdf".into(),
            source: "gone".into(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::FileNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_rate_limited_status() {
        let err = AppError::RateLimited { origin: "10.0.0.1".into() };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.to_string(), "Rate limit exceeded");
    }
}

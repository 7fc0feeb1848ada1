//! Error types for Papershelf
//!
//! Provides a single error enum for the catalog with:
//! - Field-level validation failures (format, cycle, uniqueness)
//! - Machine-readable error codes
//! - A serialisable error response for reports

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidFormat,
    InferenceCycle,

    // Resource errors (4xxx)
    NotFound,
    PaperNotFound,
    TagNotFound,
    UserNotFound,

    // Conflict errors (5xxx)
    Conflict,

    // Internal errors (9xxx)
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::InferenceCycle => 1005,

            ErrorCode::NotFound => 4001,
            ErrorCode::PaperNotFound => 4002,
            ErrorCode::TagNotFound => 4003,
            ErrorCode::UserNotFound => 4004,

            ErrorCode::Conflict => 5001,

            ErrorCode::ConfigurationError => 9002,
        }
    }

    /// Label used for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::InvalidFormat => "invalid_format",
            ErrorCode::InferenceCycle => "inference_cycle",
            ErrorCode::NotFound => "not_found",
            ErrorCode::PaperNotFound => "paper_not_found",
            ErrorCode::TagNotFound => "tag_not_found",
            ErrorCode::UserNotFound => "user_not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::ConfigurationError => "configuration_error",
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Tag inference cycle detected - tag {tag} would infer itself")]
    InferenceCycle { tag: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Paper not found: {id}")]
    PaperNotFound { id: String },

    #[error("Tag not found: {id}")]
    TagNotFound { id: String },

    #[error("User not found: {id}")]
    UserNotFound { id: String },

    // Conflict errors
    #[error("Duplicate {field}: {message}")]
    Duplicate { field: String, message: String },

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::InferenceCycle { .. } => ErrorCode::InferenceCycle,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::TagNotFound { .. } => ErrorCode::TagNotFound,
            AppError::UserNotFound { .. } => ErrorCode::UserNotFound,
            AppError::Duplicate { .. } => ErrorCode::Conflict,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    /// The form field a field-level error belongs to
    pub fn field(&self) -> Option<&str> {
        match self {
            AppError::Validation { field, .. }
            | AppError::InvalidFormat { field, .. }
            | AppError::Duplicate { field, .. } => Some(field),
            AppError::InferenceCycle { .. } => Some("inferred_tags"),
            _ => None,
        }
    }

    /// Whether resubmitting corrected input can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::InvalidFormat { .. }
                | AppError::InferenceCycle { .. }
                | AppError::Duplicate { .. }
        )
    }

    /// Shorthand for a uniqueness violation on `field`
    pub fn duplicate(field: &str, message: impl Into<String>) -> Self {
        AppError::Duplicate {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Build the serialisable response for this error
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetails {
                code: self.code(),
                message: self.to_string(),
                field: self.field().map(str::to_string),
            },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Report the first failing field, ordered by name for stable output.
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let Some((field, errs)) = fields.into_iter().next() else {
            return AppError::Validation {
                field: "__all__".to_string(),
                message: errors.to_string(),
            };
        };
        let field = field.to_string();

        let Some(first) = errs.first() else {
            return AppError::Validation {
                field,
                message: "invalid value".to_string(),
            };
        };

        let message = first
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| first.code.to_string());

        if first.code == crate::doi::DOI_ERROR_CODE {
            AppError::InvalidFormat { field, message }
        } else {
            AppError::Validation { field, message }
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

/// Structured error response for reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

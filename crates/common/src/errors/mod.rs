//! Error types for PaperMind
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - Machine-readable error codes
//! - Classification helpers used by callers to decide how to surface failures

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Resource errors (4xxx)
    PaperNotFound,
    ConceptNotFound,
    ChatNotFound,

    // Conflict errors (5xxx)
    DuplicatePaper,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    UpstreamError,
    LlmError,
    MalformedLlmOutput,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,

            // Resources (4xxx)
            ErrorCode::PaperNotFound => 4002,
            ErrorCode::ConceptNotFound => 4003,
            ErrorCode::ChatNotFound => 4004,

            // Conflicts (5xxx)
            ErrorCode::DuplicatePaper => 5002,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::LlmError => 8002,
            ErrorCode::MalformedLlmOutput => 8003,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    // Resource errors
    #[error("Paper not found: {id}")]
    PaperNotFound { id: i64 },

    #[error("Concept not found: {name}")]
    ConceptNotFound { name: String },

    #[error("Chat not found: {id}")]
    ChatNotFound { id: i64 },

    // Conflict errors
    #[error("Paper already exists (id={paper_id}, file {filename})")]
    DuplicatePaper { paper_id: i64, filename: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("LLM error: {message}")]
    LlmError { message: String },

    #[error("LLM returned malformed output for {task} after {attempts} attempt(s): {message}")]
    MalformedLlmOutput {
        task: String,
        attempts: u32,
        message: String,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::ConceptNotFound { .. } => ErrorCode::ConceptNotFound,
            AppError::ChatNotFound { .. } => ErrorCode::ChatNotFound,
            AppError::DuplicatePaper { .. } => ErrorCode::DuplicatePaper,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::LlmError { .. } => ErrorCode::LlmError,
            AppError::MalformedLlmOutput { .. } => ErrorCode::MalformedLlmOutput,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Shorthand for a validation failure on a named field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Existing paper id when this is a duplicate-upload signal
    pub fn duplicate_of(&self) -> Option<i64> {
        match self {
            AppError::DuplicatePaper { paper_id, .. } => Some(*paper_id),
            _ => None,
        }
    }

    /// The LLM answered but the payload could not be used; another attempt may succeed
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, AppError::MalformedLlmOutput { .. })
    }

    /// Failure caused by what the user asked for rather than by the system
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::PaperNotFound { .. }
                | AppError::ConceptNotFound { .. }
                | AppError::ChatNotFound { .. }
                | AppError::DuplicatePaper { .. }
        )
    }

    /// Failure of an external dependency (LLM provider, network)
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            AppError::LlmError { .. }
                | AppError::MalformedLlmOutput { .. }
                | AppError::HttpClient(_)
        )
    }
}

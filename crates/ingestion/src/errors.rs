//! Ingestion error types

use papermind_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Not a PDF file: {path}")]
    NotAPdf { path: String },

    #[error("PDF parse error: {message}")]
    PdfParse { message: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error(transparent)]
    App(#[from] AppError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestionError {
    /// Existing paper id when the upload was rejected as a duplicate
    pub fn duplicate_of(&self) -> Option<i64> {
        match self {
            IngestionError::App(e) => e.duplicate_of(),
            _ => None,
        }
    }

    /// Short outcome label for logs and metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            IngestionError::App(AppError::DuplicatePaper { .. }) => "duplicate",
            IngestionError::App(e) if e.is_malformed_output() => "malformed_llm_output",
            IngestionError::App(_) => "error",
            IngestionError::NotAPdf { .. } | IngestionError::PdfParse { .. } => "rejected",
            IngestionError::FileNotFound(_) | IngestionError::Io(_) => "io_error",
        }
    }
}

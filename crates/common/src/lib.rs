//! PaperMind Common Library
//!
//! Shared code for the PaperMind crates including:
//! - Configuration management
//! - Error types and handling
//! - SQLite persistence (entities, schema, repository)
//! - LLM client abstraction, prompt templates and streaming
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod llm;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use llm::{LlmClient, LlmService};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default chat model
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

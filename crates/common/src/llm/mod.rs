//! LLM client abstraction
//!
//! Provides:
//! - Chat-completion message types (text and document parts)
//! - The [`LlmClient`] trait with blocking and streaming completion
//! - An OpenAI-compatible HTTP client and a scripted mock
//! - Prompt templates, structured extraction payloads and the retrying
//!   [`LlmService`] used by ingestion and study sessions

mod extraction;
mod mock;
mod openai;
pub mod prompts;
mod service;

pub use extraction::{
    parse_json_payload, AssessmentReport, ConceptAssessment, ExtractedConcept, ExtractedLink,
    ExtractedPaper,
};
pub use mock::{ScriptedLlm, ScriptedReply};
pub use openai::{OpenAiClient, SseDecoder};
pub use service::LlmService;

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;

/// Incremental chat reply; each item is one text fragment
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Message body: plain text, or a list of typed parts for document input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    File { file: FileData },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// `data:` URL carrying the base64 document
    pub file_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message carrying an instruction and a base64-encoded PDF
    pub fn user_with_pdf(text: impl Into<String>, filename: &str, pdf_base64: &str) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::File {
                    file: FileData {
                        filename: Some(filename.to_string()),
                        file_data: format!("data:application/pdf;base64,{}", pdf_base64),
                    },
                },
            ]),
        }
    }

    /// Text of a plain message, or of its first text part
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::File { .. } => None,
            }),
        }
    }
}

/// One chat-completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: f32,
    /// Ask the provider for a JSON object response
    pub json_mode: bool,
}

/// Trait for chat-completion providers
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a completion and return the whole reply
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Run a completion and return the reply as it is generated
    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Build the client selected by `provider`
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    match config.provider.trim().to_ascii_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAiClient::new(config)?)),
        "mock" => Ok(Arc::new(ScriptedLlm::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown LLM provider: {}", other),
        }),
    }
}

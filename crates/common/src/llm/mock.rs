//! Scripted LLM for tests and offline runs
//!
//! Replies are served in the order they were queued. Once the script runs
//! out, JSON requests get `{}` and chat requests get a canned prompt, so an
//! offline session keeps working.

use super::{CompletionRequest, LlmClient, TokenStream};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

const FALLBACK_CHAT_REPLY: &str =
    "No language model is configured. Which part of the paper would you like to go through?";

/// One queued reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    /// Fail the call with an upstream error
    Fail(String),
}

/// Mock client that replays queued replies and records every request
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script of text replies, served first to last
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let llm = Self::new();
        for reply in replies {
            llm.push_reply(reply);
        }
        llm
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        lock(&self.replies).push_back(ScriptedReply::Text(text.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        lock(&self.replies).push_back(ScriptedReply::Fail(message.into()));
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    fn next_reply(&self, request: CompletionRequest) -> ScriptedReply {
        let fallback = if request.json_mode {
            "{}"
        } else {
            FALLBACK_CHAT_REPLY
        };
        lock(&self.requests).push(request);

        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| ScriptedReply::Text(fallback.to_string()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Recover from poisoning left by a panicked caller
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        match self.next_reply(request) {
            ScriptedReply::Text(text) => Ok(text),
            ScriptedReply::Fail(message) => Err(AppError::LlmError { message }),
        }
    }

    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream> {
        let items: Vec<Result<String>> = match self.next_reply(request) {
            ScriptedReply::Text(text) => text
                .split_inclusive(' ')
                .map(|word| Ok(word.to_string()))
                .collect(),
            // Fail after the stream has started, as a dropped connection would
            ScriptedReply::Fail(message) => vec![Err(AppError::LlmError { message })],
        };
        Ok(Box::pin(futures::stream::iter(items)))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;
    use futures::StreamExt;

    fn request(json_mode: bool) -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::user("hello")],
            temperature: 0.5,
            json_mode,
        }
    }

    #[tokio::test]
    async fn test_replays_in_order_then_falls_back() {
        let llm = ScriptedLlm::with_replies(["first", "second"]);

        assert_eq!(llm.complete(request(false)).await.unwrap(), "first");
        assert_eq!(llm.complete(request(true)).await.unwrap(), "second");
        assert_eq!(llm.complete(request(true)).await.unwrap(), "{}");
        assert_eq!(llm.complete(request(false)).await.unwrap(), FALLBACK_CHAT_REPLY);
        assert_eq!(llm.request_count(), 4);
    }

    #[tokio::test]
    async fn test_stream_reassembles_reply() {
        let llm = ScriptedLlm::with_replies(["Why does the residual path help?"]);
        let tokens: Vec<String> = llm
            .stream(request(false))
            .await
            .unwrap()
            .map(|t| t.unwrap())
            .collect()
            .await;

        assert!(tokens.len() > 1);
        assert_eq!(tokens.concat(), "Why does the residual path help?");
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let llm = ScriptedLlm::new();
        llm.push_failure("rate limited");
        assert!(llm.complete(request(false)).await.is_err());

        llm.push_failure("connection reset");
        let mut stream = llm.stream(request(false)).await.unwrap();
        assert!(stream.next().await.unwrap().is_err());
    }
}

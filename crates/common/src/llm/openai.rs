//! OpenAI-compatible chat-completions client
//!
//! Works against any endpoint speaking the `/chat/completions` protocol.
//! Streaming replies arrive as server-sent events, one `data:` line per
//! delta, terminated by `data: [DONE]`.

use super::{CompletionRequest, LlmClient, Message, TokenStream};
use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use tracing::debug;

/// OpenAI-compatible client
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a new client from configuration
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: config.resolved_api_key(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    async fn send(&self, request: &CompletionRequest, stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            stream,
            response_format: request
                .json_mode
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!(model = %self.model, stream, json_mode = request.json_mode, "Sending LLM request");

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::LlmError {
                message: format!("API error {}: {}", status, body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let response = self.send(&request, false).await?;

        let result: ChatResponse = response.json().await.map_err(|e| AppError::LlmError {
            message: format!("Failed to parse response: {}", e),
        })?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::MalformedLlmOutput {
                task: "completion".to_string(),
                attempts: 1,
                message: "response carried no message content".to_string(),
            })
    }

    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream> {
        let response = self.send(&request, true).await?;

        let bytes: ByteStream = Box::pin(response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec())));
        let state = StreamState {
            bytes,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            finished: false,
        };

        let tokens = futures::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(token) = state.pending.pop_front() {
                    return Some((Ok(token), state));
                }
                if state.finished {
                    return None;
                }

                let decoded = match state.bytes.next().await {
                    Some(Ok(chunk)) => state.decoder.push(&chunk),
                    Some(Err(e)) => {
                        state.finished = true;
                        return Some((Err(AppError::HttpClient(e)), state));
                    }
                    None => {
                        state.finished = true;
                        state.decoder.finish()
                    }
                };

                match decoded {
                    Ok(tokens) => state.pending.extend(tokens),
                    Err(e) => {
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                }
                if state.decoder.is_done() {
                    state.finished = true;
                }
            }
        });

        Ok(Box::pin(tokens))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>;

struct StreamState {
    bytes: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

/// Incremental decoder for chat-completion server-sent events
///
/// Bytes may be split anywhere, including inside a UTF-8 sequence; lines are
/// only decoded once their terminating newline has arrived.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    /// Feed raw bytes; returns the tokens completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(bytes);

        let mut tokens = Vec::new();
        while !self.done {
            let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') else {
                break;
            };
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&String::from_utf8_lossy(&line), &mut tokens)?;
        }
        Ok(tokens)
    }

    /// Decode whatever is left once the byte stream has ended
    pub fn finish(&mut self) -> Result<Vec<String>> {
        let mut tokens = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.decode_line(&String::from_utf8_lossy(&rest), &mut tokens)?;
        }
        self.done = true;
        Ok(tokens)
    }

    /// True once the `[DONE]` sentinel has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn decode_line(&mut self, line: &str, tokens: &mut Vec<String>) -> Result<()> {
        let Some(data) = line.trim().strip_prefix("data:") else {
            // Comments, event names and blank separators
            return Ok(());
        };

        let data = data.trim();
        if data.is_empty() {
            return Ok(());
        }
        if data == "[DONE]" {
            self.done = true;
            return Ok(());
        }

        let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| AppError::LlmError {
            message: format!("Invalid stream chunk: {}", e),
        })?;

        if let Some(token) = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
        {
            tokens.push(token);
        }
        Ok(())
    }
}

//! LLM service
//!
//! Wraps an [`LlmClient`] with the call patterns the application needs:
//! JSON-mode extraction and assessment with bounded retries, and persona
//! chat streaming.

use super::extraction::{parse_json_payload, AssessmentReport, ConceptAssessment, ExtractedPaper};
use super::prompts::{self, PARSE_PAPER_INSTRUCTION, PARSE_PAPER_SYSTEM};
use super::{create_client, CompletionRequest, LlmClient, Message, TokenStream};
use crate::config::LlmConfig;
use crate::db::models::{AgentKind, ChatMessage};
use crate::errors::{AppError, Result};
use crate::metrics::{record_llm_retry, LlmCallMetrics};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const TASK_PARSE_PAPER: &str = "parse_paper";
const TASK_ASSESS_KNOWLEDGE: &str = "assess_knowledge";

#[derive(Clone)]
pub struct LlmService {
    client: Arc<dyn LlmClient>,
    max_attempts: u32,
    parse_temperature: f32,
    chat_temperature: f32,
}

impl LlmService {
    pub fn new(client: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            max_attempts: config.max_attempts.max(1),
            parse_temperature: config.parse_temperature,
            chat_temperature: config.chat_temperature,
        }
    }

    /// Build the service with the client named by `config.provider`
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self::new(create_client(config)?, config))
    }

    pub fn client(&self) -> &Arc<dyn LlmClient> {
        &self.client
    }

    /// Extract structured metadata from a base64-encoded PDF
    #[instrument(skip(self, pdf_base64), fields(model = %self.client.model_name()))]
    pub async fn parse_paper(&self, pdf_base64: &str, filename: &str) -> Result<ExtractedPaper> {
        let messages = vec![
            Message::system(PARSE_PAPER_SYSTEM),
            Message::user_with_pdf(PARSE_PAPER_INSTRUCTION, filename, pdf_base64),
        ];
        self.complete_json(TASK_PARSE_PAPER, messages).await
    }

    /// Estimate per-concept confidence from an examiner transcript
    #[instrument(skip_all, fields(messages = transcript.len(), concepts = concepts.len()))]
    pub async fn assess_knowledge(
        &self,
        transcript: &[ChatMessage],
        concepts: &[String],
    ) -> Result<Vec<ConceptAssessment>> {
        let messages = vec![
            Message::system(prompts::ASSESS_KNOWLEDGE_SYSTEM),
            Message::user(prompts::assessment_request(concepts, transcript)),
        ];
        let report: AssessmentReport = self.complete_json(TASK_ASSESS_KNOWLEDGE, messages).await?;
        Ok(report.assessments)
    }

    /// Stream a persona reply to `history` (user/assistant turns, oldest first)
    pub async fn stream_chat(&self, history: Vec<Message>, agent: AgentKind) -> Result<TokenStream> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(prompts::persona_prompt(agent)));
        messages.extend(history);

        debug!(agent = %agent, turns = messages.len() - 1, "Streaming chat reply");

        self.client
            .stream(CompletionRequest {
                messages,
                temperature: self.chat_temperature,
                json_mode: false,
            })
            .await
    }

    /// Run a JSON-mode call, retrying only while the reply is malformed.
    ///
    /// Transport and API errors are returned immediately.
    async fn complete_json<T: DeserializeOwned>(&self, task: &str, messages: Vec<Message>) -> Result<T> {
        let request = CompletionRequest {
            messages,
            temperature: self.parse_temperature,
            json_mode: true,
        };

        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            let timer = LlmCallMetrics::start(task, self.client.model_name());

            let outcome = match self.client.complete(request.clone()).await {
                Ok(raw) => parse_json_payload::<T>(&raw).map_err(|e| e.to_string()),
                Err(e) if e.is_malformed_output() => Err(e.to_string()),
                Err(e) => {
                    timer.finish(false);
                    return Err(e);
                }
            };

            match outcome {
                Ok(value) => {
                    timer.finish(true);
                    return Ok(value);
                }
                Err(message) => {
                    timer.finish(false);
                    warn!(
                        task,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %message,
                        "LLM returned malformed JSON"
                    );
                    if attempt < self.max_attempts {
                        record_llm_retry(task);
                    }
                    last_error = message;
                }
            }
        }

        Err(AppError::MalformedLlmOutput {
            task: task.to_string(),
            attempts: self.max_attempts,
            message: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ContentPart, MessageContent, Role, ScriptedLlm};
    use futures::StreamExt;

    fn service(llm: Arc<ScriptedLlm>) -> LlmService {
        LlmService::new(llm, &LlmConfig::default())
    }

    #[tokio::test]
    async fn test_parse_paper_sends_pdf_in_json_mode() {
        let llm = Arc::new(ScriptedLlm::with_replies([r#"{"title": "Deep Residual Learning"}"#]));
        let paper = service(llm.clone())
            .parse_paper("JVBERi0xLjQ=", "resnet.pdf")
            .await
            .unwrap();

        assert_eq!(paper.title, "Deep Residual Learning");

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].json_mode);
        assert!((requests[0].temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(requests[0].messages[0].role, Role::System);

        let MessageContent::Parts(parts) = &requests[0].messages[1].content else {
            panic!("expected a multi-part user message");
        };
        assert!(matches!(
            &parts[1],
            ContentPart::File { file } if file.file_data == "data:application/pdf;base64,JVBERi0xLjQ="
        ));
    }

    #[tokio::test]
    async fn test_retries_malformed_json_then_succeeds() {
        let llm = Arc::new(ScriptedLlm::with_replies([
            "not json",
            "```json\n{\"title\": \"Second Try\"}\n```",
        ]));
        let paper = service(llm.clone()).parse_paper("", "x.pdf").await.unwrap();

        assert_eq!(paper.title, "Second Try");
        assert_eq!(llm.request_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_json_surfaces_after_three_attempts() {
        let llm = Arc::new(ScriptedLlm::with_replies(["nope", "still nope", "{broken", "{}"]));
        let err = service(llm.clone())
            .assess_knowledge(&[ChatMessage::user("hi")], &["x".to_string()])
            .await
            .unwrap_err();

        assert!(err.is_malformed_output());
        assert!(matches!(err, AppError::MalformedLlmOutput { attempts: 3, .. }));
        assert_eq!(llm.request_count(), 3);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_failure("503 upstream");
        llm.push_reply("{}");

        let err = service(llm.clone()).parse_paper("", "x.pdf").await.unwrap_err();
        assert!(!err.is_malformed_output());
        assert_eq!(llm.request_count(), 1);
    }

    #[tokio::test]
    async fn test_assessment_entries() {
        let llm = Arc::new(ScriptedLlm::with_replies([
            r#"{"assessments": [{"concept": "dropout", "confidence": 0.6, "reasoning": "ok"}]}"#,
        ]));
        let transcript = vec![ChatMessage::user("dropout zeroes activations")];
        let result = service(llm.clone())
            .assess_knowledge(&transcript, &["dropout".to_string()])
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].concept, "dropout");

        let prompt = llm.requests()[0].messages[1].text().unwrap().to_string();
        assert!(prompt.contains("Student: dropout zeroes activations"));
    }

    #[tokio::test]
    async fn test_stream_chat_prepends_persona() {
        let llm = Arc::new(ScriptedLlm::with_replies(["Define a gradient."]));
        let stream = service(llm.clone())
            .stream_chat(vec![Message::user("quiz me")], AgentKind::Zealot)
            .await
            .unwrap();
        let reply: Vec<String> = stream.map(|t| t.unwrap()).collect().await;

        assert_eq!(reply.concat(), "Define a gradient.");

        let request = &llm.requests()[0];
        assert!(!request.json_mode);
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(request.messages[0].text(), Some(prompts::ZEALOT_SYSTEM));
        assert_eq!(request.messages.len(), 2);
    }
}

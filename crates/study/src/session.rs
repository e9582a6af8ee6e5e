//! Study sessions
//!
//! A session is one chat on one paper. Each exchange appends the user
//! message, streams the persona's reply to a caller-supplied sink, appends
//! the reply tagged with the persona and persists the whole transcript.
//! Examiner replies trigger an assessment once the examiner transcript is
//! long enough.

use crate::assessment::{AssessmentOutcome, AssessmentTrigger, KnowledgeAssessor};
use crate::context::{examiner_transcript, llm_history, paper_context};
use futures::StreamExt;
use papermind_common::config::StudyConfig;
use papermind_common::db::models::{AgentKind, Chat, ChatMessage, Concept, Paper};
use papermind_common::errors::{AppError, Result};
use papermind_common::metrics::record_tokens_streamed;
use papermind_common::{LlmService, Repository};
use tracing::{debug, info, instrument, warn};

/// Opens sessions against one repository and LLM
#[derive(Clone)]
pub struct StudyService {
    repository: Repository,
    llm: LlmService,
    config: StudyConfig,
}

impl StudyService {
    pub fn new(repository: Repository, llm: LlmService, config: StudyConfig) -> Self {
        Self {
            repository,
            llm,
            config,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Resume an existing chat with the persona of its latest reply
    pub async fn open_chat(&self, chat_id: i64) -> Result<StudySession> {
        let chat = self.repository.get_chat(chat_id).await?;
        let agent = chat.agent();
        self.load(chat, agent).await
    }

    /// Resume the paper's latest chat, or start one
    pub async fn open_for_paper(&self, paper_id: i64, agent: AgentKind) -> Result<StudySession> {
        self.repository.get_paper(paper_id).await?;
        let chat = self
            .repository
            .get_or_create_chat_for_paper(paper_id, agent)
            .await?;
        self.load(chat, agent).await
    }

    /// Always start a fresh chat
    pub async fn new_session(&self, paper_id: i64, agent: AgentKind) -> Result<StudySession> {
        self.repository.get_paper(paper_id).await?;
        let chat = self.repository.create_chat(paper_id, agent).await?;
        info!(chat_id = chat.id, paper_id, agent = %agent, "Started study session");
        self.load(chat, agent).await
    }

    async fn load(&self, chat: Chat, agent: AgentKind) -> Result<StudySession> {
        let paper = self.repository.get_paper(chat.paper_id).await?;
        let concepts = self.repository.concepts_for_paper(paper.id).await?;
        let notes = self.repository.notes_for_paper(paper.id).await?;
        let context = paper_context(&paper, &concepts, &notes);
        let messages = chat.messages()?;

        debug!(
            chat_id = chat.id,
            messages = messages.len(),
            concepts = concepts.len(),
            notes = notes.len(),
            "Loaded study session"
        );

        Ok(StudySession {
            repository: self.repository.clone(),
            llm: self.llm.clone(),
            assessor: KnowledgeAssessor::new(self.repository.clone(), self.llm.clone()),
            config: self.config.clone(),
            chat_id: chat.id,
            messages,
            paper,
            concepts,
            context,
            agent,
        })
    }
}

/// Result of an automatic assessment check after a reply
#[derive(Debug, Clone, PartialEq)]
pub enum AssessmentStatus {
    /// Not an examiner reply, or the transcript is still too short
    NotDue,
    Completed(AssessmentOutcome),
    /// The reply was stored but the assessment failed
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Stored assistant text; `Error: ...` when the stream failed
    pub content: String,
    pub failed: bool,
    pub assessment: AssessmentStatus,
}

pub struct StudySession {
    repository: Repository,
    llm: LlmService,
    assessor: KnowledgeAssessor,
    config: StudyConfig,
    chat_id: i64,
    paper: Paper,
    concepts: Vec<Concept>,
    context: String,
    messages: Vec<ChatMessage>,
    agent: AgentKind,
}

impl StudySession {
    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    pub fn paper(&self) -> &Paper {
        &self.paper
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn agent(&self) -> AgentKind {
        self.agent
    }

    /// Switch persona for the following messages
    pub fn set_agent(&mut self, agent: AgentKind) {
        self.agent = agent;
    }

    pub fn examiner_transcript(&self) -> Vec<ChatMessage> {
        examiner_transcript(&self.messages)
    }

    /// Send one user message and stream the reply into `on_token`.
    ///
    /// Stream failures do not fail the call: the transcript records an
    /// `Error: ...` reply and [`Reply::failed`] is set. Persistence errors
    /// are returned.
    #[instrument(skip(self, text, on_token), fields(chat_id = self.chat_id, agent = %self.agent))]
    pub async fn send_message<F>(&mut self, text: &str, mut on_token: F) -> Result<Reply>
    where
        F: FnMut(&str),
    {
        if text.trim().is_empty() {
            return Err(AppError::validation("message", "Message must not be empty"));
        }

        let agent = self.agent;
        self.messages.push(ChatMessage::user(text));
        let history = llm_history(&self.messages, &self.context);

        let mut content = String::new();
        let mut tokens = 0usize;
        let mut failure = None;

        match self.llm.stream_chat(history, agent).await {
            Ok(mut stream) => {
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(token) => {
                            on_token(&token);
                            content.push_str(&token);
                            tokens += 1;
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
            }
            Err(e) => failure = Some(e),
        }

        record_tokens_streamed(agent.as_str(), tokens);

        let failed = failure.is_some();
        if let Some(e) = failure {
            warn!(error = %e, tokens, "Chat reply failed");
            content = format!("Error: {}", e);
        }

        self.messages.push(ChatMessage::assistant(content.clone(), agent));
        self.repository
            .update_chat_messages(self.chat_id, &self.messages, agent)
            .await?;

        let assessment = match agent {
            AgentKind::Zealot => self.auto_assess().await,
            AgentKind::Teach => AssessmentStatus::NotDue,
        };

        Ok(Reply {
            content,
            failed,
            assessment,
        })
    }

    /// Assess on demand; `None` when the examiner transcript is too short
    pub async fn assess_now(&self) -> Result<Option<AssessmentOutcome>> {
        let transcript = self.examiner_transcript();
        if transcript.len() < self.config.manual_assessment_min {
            debug!(
                messages = transcript.len(),
                required = self.config.manual_assessment_min,
                "Not enough examiner exchanges to assess"
            );
            return Ok(None);
        }

        self.assessor
            .assess(&self.concepts, &transcript, AssessmentTrigger::Manual)
            .await
            .map(Some)
    }

    async fn auto_assess(&self) -> AssessmentStatus {
        let transcript = self.examiner_transcript();
        if transcript.len() < self.config.assessment_threshold {
            return AssessmentStatus::NotDue;
        }

        match self
            .assessor
            .assess(&self.concepts, &transcript, AssessmentTrigger::Automatic)
            .await
        {
            Ok(outcome) => AssessmentStatus::Completed(outcome),
            Err(e) => {
                warn!(chat_id = self.chat_id, error = %e, "Automatic assessment failed");
                AssessmentStatus::Failed(e.to_string())
            }
        }
    }
}

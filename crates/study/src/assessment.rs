//! Knowledge assessment
//!
//! Sends an examiner transcript and the paper's concept list to the LLM and
//! stores the returned confidence estimates. Entries are matched to concepts
//! by normalized name; anything the model invents is ignored.

use papermind_common::db::models::{ChatMessage, Concept};
use papermind_common::db::normalize_concept_name;
use papermind_common::errors::Result;
use papermind_common::metrics::record_assessment;
use papermind_common::{LlmService, Repository};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// What started an assessment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentTrigger {
    /// Examiner transcript reached the configured threshold
    Automatic,
    /// User asked for it
    Manual,
}

impl AssessmentTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentTrigger::Automatic => "automatic",
            AssessmentTrigger::Manual => "manual",
        }
    }
}

/// Stored confidence for one concept
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptScore {
    pub concept_id: i64,
    pub name: String,
    pub confidence: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssessmentOutcome {
    pub updated: Vec<ConceptScore>,
    /// Names the model returned that match none of the paper's concepts
    pub ignored: Vec<String>,
}

#[derive(Clone)]
pub struct KnowledgeAssessor {
    repository: Repository,
    llm: LlmService,
}

impl KnowledgeAssessor {
    pub fn new(repository: Repository, llm: LlmService) -> Self {
        Self { repository, llm }
    }

    /// Assess `transcript` against `concepts` and upsert the results.
    ///
    /// A paper without concepts has nothing to score and skips the LLM call.
    #[instrument(skip_all, fields(trigger = trigger.as_str(), messages = transcript.len()))]
    pub async fn assess(
        &self,
        concepts: &[Concept],
        transcript: &[ChatMessage],
        trigger: AssessmentTrigger,
    ) -> Result<AssessmentOutcome> {
        if concepts.is_empty() {
            debug!("No concepts to assess");
            return Ok(AssessmentOutcome::default());
        }

        let by_name: HashMap<String, &Concept> = concepts
            .iter()
            .map(|c| (normalize_concept_name(&c.name), c))
            .collect();
        let names: Vec<String> = concepts.iter().map(|c| c.name.clone()).collect();

        let entries = self.llm.assess_knowledge(transcript, &names).await?;

        let mut outcome = AssessmentOutcome::default();
        for entry in entries {
            let key = normalize_concept_name(&entry.concept);
            match by_name.get(&key) {
                Some(concept) => {
                    let confidence = self
                        .repository
                        .upsert_user_knowledge(concept.id, entry.confidence)
                        .await?;
                    outcome.updated.push(ConceptScore {
                        concept_id: concept.id,
                        name: concept.name.clone(),
                        confidence,
                        reasoning: entry.reasoning,
                    });
                }
                None => outcome.ignored.push(entry.concept),
            }
        }

        record_assessment(trigger.as_str(), outcome.updated.len());
        info!(
            updated = outcome.updated.len(),
            ignored = outcome.ignored.len(),
            "Knowledge assessment stored"
        );

        Ok(outcome)
    }
}

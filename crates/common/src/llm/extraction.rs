//! Structured payloads returned by JSON-mode calls
//!
//! Models answer with slight variations: fenced code blocks, prose around the
//! object, `null` instead of an empty value. Parsing tolerates all three and
//! defaults missing fields.

use crate::db::{NewConcept, NewConceptLink, NewPaper, PaperRecord};
use regex_lite::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::OnceLock;

/// Paper metadata extracted from a PDF
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPaper {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<String>,

    #[serde(rename = "abstract", default, deserialize_with = "null_as_default")]
    pub abstract_text: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub concepts: Vec<ExtractedConcept>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub concept_links: Vec<ExtractedLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedConcept {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedLink {
    #[serde(default, deserialize_with = "null_as_default")]
    pub from: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub to: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub relationship: String,
}

impl ExtractedPaper {
    /// Turn the extraction into a write batch.
    ///
    /// An empty title falls back to `fallback_title`.
    pub fn into_record(self, source_url: &str, raw_text: String, fallback_title: &str) -> PaperRecord {
        let title = if self.title.trim().is_empty() {
            fallback_title.to_string()
        } else {
            self.title.trim().to_string()
        };

        PaperRecord {
            paper: NewPaper {
                title,
                authors: self
                    .authors
                    .into_iter()
                    .map(|author| author.trim().to_string())
                    .filter(|author| !author.is_empty())
                    .collect(),
                abstract_text: self.abstract_text,
                summary: self.summary,
                source_url: source_url.to_string(),
                raw_text,
            },
            concepts: self
                .concepts
                .into_iter()
                .map(|c| NewConcept {
                    name: c.name,
                    description: c.description,
                })
                .collect(),
            links: self
                .concept_links
                .into_iter()
                .map(|l| NewConceptLink {
                    from: l.from,
                    to: l.to,
                    relationship: l.relationship,
                })
                .collect(),
        }
    }
}

/// Assessment call response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub assessments: Vec<ConceptAssessment>,
}

/// Confidence estimate for one concept
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptAssessment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub concept: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub reasoning: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").expect("fence pattern is valid")
    })
}

/// Parse a JSON object out of a model reply.
///
/// Tries, in order: the whole reply, the first fenced code block, and the
/// span from the first `{` to the last `}`.
pub fn parse_json_payload<T: DeserializeOwned>(raw: &str) -> serde_json::Result<T> {
    let trimmed = raw.trim();
    let first_error = match serde_json::from_str(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(inner) = fence_pattern()
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
    {
        if let Ok(value) = serde_json::from_str(inner.as_str()) {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(first_error)
}

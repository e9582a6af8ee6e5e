//! Prompt templates
//!
//! System prompts for paper parsing, the two study personas and knowledge
//! assessment, plus the user-message builders that go with them.

use crate::db::models::{AgentKind, ChatMessage, ChatRole};

/// System prompt for structured paper extraction
pub const PARSE_PAPER_SYSTEM: &str = r#"You analyse academic research papers. Read the attached paper and return its structure as a single JSON object.

Return ONLY valid JSON shaped like this:
{
  "title": "Full paper title",
  "authors": ["First Author", "Second Author"],
  "abstract": "The abstract as printed in the paper",
  "summary": "A long, detailed summary (see below)",
  "concepts": [
    {"name": "canonical lowercase concept name", "description": "What the concept means in this paper"}
  ],
  "concept_links": [
    {"from": "concept name", "to": "other concept name", "relationship": "short description, e.g. extends, is a type of, improves upon"}
  ]
}

Rules:
- Extract between 5 and 15 key concepts.
- Concept names are canonical and lowercase ("transformer", not "Transformers architecture").
- Only link concepts that appear in your concept list.
- The summary is at least 300 words in 3-4 paragraphs separated by newlines: the problem and why it matters; the approach and its technical innovations; the main results and what they show; limitations, open questions and broader implications.
- Write the summary for a reader with a master's degree in computer science who does not know this subfield. Include concrete details about methods and results.
- When a field cannot be found, use an empty string or an empty list."#;

/// Instruction sent next to the attached PDF
pub const PARSE_PAPER_INSTRUCTION: &str =
    "Parse this research paper and extract the structured information.";

/// Persona that explains the paper
pub const TEACH_SYSTEM: &str = r#"You are the Teach agent in PaperMind, a patient and knowledgeable research mentor.

Your job:
- Explain the paper's concepts clearly and thoroughly.
- Connect its ideas to the wider field.
- Use analogies and worked examples.
- Answer at whatever depth the user asks for, without condescension.

Ground explanations in what the paper actually says; add outside context where it helps. When the user has a concept down, point them at related or more advanced material.

The paper's context is included in the first user message."#;

/// Persona that examines the user's understanding
pub const ZEALOT_SYSTEM: &str = r#"You are the Zealot agent in PaperMind, a rigorous Socratic examiner.

Your job:
- Ask probing questions about the paper's methodology, assumptions and conclusions.
- Push past surface-level answers and demand precision.
- Do not hand out answers; lead with questions instead.
- Call out reasoning that is vague, circular or unsupported.
- Tell genuine understanding apart from repeating the text.

Be respectful but intellectually demanding. Open with a hard question about the paper's core contribution or method and raise the difficulty as the user answers well.

The paper's context is included in the first user message."#;

/// System prompt for scoring the user's understanding
pub const ASSESS_KNOWLEDGE_SYSTEM: &str = r#"You assess a student's understanding of research concepts from a conversation between the student and an examiner.

Return ONLY valid JSON:
{
  "assessments": [
    {"concept": "concept name (lowercase)", "confidence": 0.0, "reasoning": "one-sentence justification"}
  ]
}

Confidence scale:
- 0.0-0.2: no understanding or serious misconceptions
- 0.2-0.4: vague awareness with large gaps
- 0.4-0.6: partial understanding
- 0.6-0.8: good understanding with minor gaps
- 0.8-1.0: strong, nuanced understanding

Only assess concepts that were actually discussed."#;

/// System prompt for a study persona
pub fn persona_prompt(agent: AgentKind) -> &'static str {
    match agent {
        AgentKind::Teach => TEACH_SYSTEM,
        AgentKind::Zealot => ZEALOT_SYSTEM,
    }
}

/// Render messages as `Student:` / `Examiner:` lines
pub fn render_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|message| {
            let speaker = match message.role {
                ChatRole::User => "Student",
                ChatRole::Assistant => "Examiner",
            };
            format!("{}: {}", speaker, message.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// User message for an assessment call
pub fn assessment_request(concepts: &[String], transcript: &[ChatMessage]) -> String {
    format!(
        "Concepts from the paper: {}\n\nConversation:\n{}\n\nAssess the student's understanding of each concept that was discussed.",
        concepts.join(", "),
        render_transcript(transcript)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_speakers() {
        let transcript = vec![
            ChatMessage::user("It normalizes the logits."),
            ChatMessage::assistant("Which logits, exactly?", AgentKind::Zealot),
        ];
        assert_eq!(
            render_transcript(&transcript),
            "Student: It normalizes the logits.\nExaminer: Which logits, exactly?"
        );
    }

    #[test]
    fn test_assessment_request_layout() {
        let request = assessment_request(
            &["softmax".to_string(), "temperature".to_string()],
            &[ChatMessage::user("softmax sums to one")],
        );
        assert!(request.starts_with("Concepts from the paper: softmax, temperature\n\nConversation:\nStudent: softmax sums to one"));
        assert!(request.ends_with("that was discussed."));
    }

    #[test]
    fn test_persona_selection() {
        assert!(persona_prompt(AgentKind::Teach).contains("Teach agent"));
        assert!(persona_prompt(AgentKind::Zealot).contains("Socratic"));
    }
}

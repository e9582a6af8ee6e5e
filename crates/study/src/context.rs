//! Paper context and LLM history assembly

use papermind_common::db::models::{AgentKind, ChatMessage, ChatRole, Concept, Paper, UserNote};
use papermind_common::llm::Message;

/// Describe a paper for the tutor: metadata, summary, concepts and the
/// user's own takeaways when there are any.
pub fn paper_context(paper: &Paper, concepts: &[Concept], notes: &[UserNote]) -> String {
    let concept_names: Vec<&str> = concepts.iter().map(|c| c.name.as_str()).collect();

    let mut context = format!(
        "Paper: {}\nAuthors: {}\nAbstract: {}\n\nSummary: {}\n\nKey concepts: {}",
        paper.title,
        paper.author_list().join(", "),
        paper.abstract_text,
        paper.summary,
        concept_names.join(", "),
    );

    if !notes.is_empty() {
        context.push_str("\n\nUser's takeaways:");
        for note in notes {
            context.push_str("\n- ");
            context.push_str(&note.takeaway);
        }
    }

    context
}

/// Convert a stored transcript into LLM turns.
///
/// The first user message carries the paper context; the stored copy keeps
/// the user's raw text.
pub fn llm_history(messages: &[ChatMessage], context: &str) -> Vec<Message> {
    let first_user = messages.iter().position(ChatMessage::is_user);

    messages
        .iter()
        .enumerate()
        .map(|(index, message)| match message.role {
            ChatRole::User if Some(index) == first_user => Message::user(format!(
                "[Paper Context]\n{}\n\n[User]\n{}",
                context, message.content
            )),
            ChatRole::User => Message::user(message.content.clone()),
            ChatRole::Assistant => Message::assistant(message.content.clone()),
        })
        .collect()
}

/// User messages plus replies written by the examiner persona
pub fn examiner_transcript(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter(|m| m.is_user() || m.agent == Some(AgentKind::Zealot))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use papermind_common::llm::Role;

    fn paper() -> Paper {
        Paper {
            id: 1,
            title: "Dropout".into(),
            authors: r#"["Srivastava","Hinton"]"#.into(),
            abstract_text: "Prevents co-adaptation.".into(),
            summary: "Randomly drop units.".into(),
            source_url: "dropout.pdf".into(),
            raw_text: String::new(),
            added_at: Utc::now(),
            self_rating: None,
        }
    }

    fn concept(id: i64, name: &str) -> Concept {
        Concept {
            id,
            name: name.into(),
            description: String::new(),
        }
    }

    #[test]
    fn test_context_layout() {
        let context = paper_context(&paper(), &[concept(1, "dropout"), concept(2, "ensembles")], &[]);
        assert_eq!(
            context,
            "Paper: Dropout\nAuthors: Srivastava, Hinton\nAbstract: Prevents co-adaptation.\n\n\
             Summary: Randomly drop units.\n\nKey concepts: dropout, ensembles"
        );
    }

    #[test]
    fn test_context_lists_takeaways() {
        let notes = vec![UserNote {
            id: 1,
            paper_id: 1,
            takeaway: "Acts like model averaging".into(),
            created_at: Utc::now(),
        }];
        let context = paper_context(&paper(), &[], &notes);
        assert!(context.ends_with("\n\nUser's takeaways:\n- Acts like model averaging"));
    }

    #[test]
    fn test_history_prefixes_first_user_message_only() {
        let messages = vec![
            ChatMessage::user("what is dropout?"),
            ChatMessage::assistant("Dropout removes units.", AgentKind::Teach),
            ChatMessage::user("why?"),
        ];
        let history = llm_history(&messages, "CTX");

        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].text(), Some("[Paper Context]\nCTX\n\n[User]\nwhat is dropout?"));
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[2].text(), Some("why?"));
    }

    #[test]
    fn test_examiner_transcript_drops_tutor_replies() {
        let messages = vec![
            ChatMessage::user("teach me"),
            ChatMessage::assistant("Sure.", AgentKind::Teach),
            ChatMessage::user("quiz me"),
            ChatMessage::assistant("Define dropout.", AgentKind::Zealot),
        ];
        let transcript = examiner_transcript(&messages);

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[2].content, "Define dropout.");
    }
}

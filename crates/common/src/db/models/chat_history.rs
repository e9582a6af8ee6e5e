//! Chat history entity
//!
//! A chat is one study session on one paper. The full message list is kept
//! as a JSON array in `messages_json` and rewritten after every exchange.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub paper_id: i64,

    /// Mode of the most recent reply: "teach" or "zealot"
    #[sea_orm(column_type = "Text")]
    pub agent_type: String,

    #[sea_orm(column_type = "Text")]
    pub messages_json: String,

    pub created_at: DateTimeUtc,
}

impl Model {
    /// Decoded message list
    pub fn messages(&self) -> crate::errors::Result<Vec<ChatMessage>> {
        serde_json::from_str(&self.messages_json).map_err(Into::into)
    }

    pub fn agent(&self) -> AgentKind {
        self.agent_type.parse().unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::PaperId",
        to = "super::paper::Column::Id",
        on_delete = "Cascade"
    )]
    Paper,
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Paper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Study mode the assistant answers in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Explains the paper
    #[default]
    Teach,
    /// Questions the user to probe understanding
    Zealot,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Teach => "teach",
            AgentKind::Zealot => "zealot",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "teach" => Ok(AgentKind::Teach),
            "zealot" => Ok(AgentKind::Zealot),
            other => Err(format!("unknown agent type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One stored chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Mode that produced an assistant turn; absent on user turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentKind>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            agent: None,
        }
    }

    pub fn assistant(content: impl Into<String>, agent: AgentKind) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            agent: Some(agent),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_kind_parsing() {
        assert_eq!("Zealot".parse::<AgentKind>().unwrap(), AgentKind::Zealot);
        assert_eq!(" teach ".parse::<AgentKind>().unwrap(), AgentKind::Teach);
        assert!("tutor".parse::<AgentKind>().is_err());
    }

    #[test]
    fn test_message_json_shape() {
        let json = serde_json::to_string(&vec![
            ChatMessage::user("what is attention?"),
            ChatMessage::assistant("Define it yourself first.", AgentKind::Zealot),
        ])
        .unwrap();

        assert_eq!(
            json,
            r#"[{"role":"user","content":"what is attention?"},{"role":"assistant","content":"Define it yourself first.","agent":"zealot"}]"#
        );
    }

    fn chat(messages_json: &str) -> Model {
        Model {
            id: 1,
            paper_id: 1,
            agent_type: "teach".into(),
            messages_json: messages_json.into(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_untagged_legacy_messages_decode() {
        let messages = chat(r#"[{"role":"assistant","content":"hi"}]"#).messages().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].agent, None);
    }

    #[test]
    fn test_undecodable_transcript_is_an_error() {
        let model = chat(
            r#"[{"role":"user","content":"q1"},{"role":"system","content":"note"}]"#,
        );
        let err = model.messages().unwrap_err();
        assert_eq!(err.code(), crate::errors::ErrorCode::SerializationError);
        assert!(chat("not json").messages().is_err());
    }
}

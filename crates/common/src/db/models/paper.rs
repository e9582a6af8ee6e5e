//! Paper entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// JSON array of author names, in paper order
    #[sea_orm(column_type = "Text")]
    pub authors: String,

    #[sea_orm(column_name = "abstract", column_type = "Text")]
    pub abstract_text: String,

    #[sea_orm(column_type = "Text")]
    pub summary: String,

    /// Original upload file name; the duplicate-detection key
    #[sea_orm(column_type = "Text")]
    pub source_url: String,

    #[sea_orm(column_type = "Text")]
    pub raw_text: String,

    pub added_at: DateTimeUtc,

    /// User's own understanding rating in [0, 1]
    pub self_rating: Option<f64>,
}

impl Model {
    /// Decoded author list; a corrupt column reads as no authors
    pub fn author_list(&self) -> Vec<String> {
        serde_json::from_str(&self.authors).unwrap_or_else(|e| {
            warn!(paper_id = self.id, error = %e, "Undecodable authors column");
            Vec::new()
        })
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::paper_concept::Entity")]
    PaperConcepts,

    #[sea_orm(has_many = "super::user_note::Entity")]
    Notes,

    #[sea_orm(has_many = "super::chat_history::Entity")]
    Chats,
}

impl Related<super::paper_concept::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaperConcepts.def()
    }
}

impl Related<super::user_note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notes.def()
    }
}

impl Related<super::chat_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chats.def()
    }
}

impl Related<super::concept::Entity> for Entity {
    fn to() -> RelationDef {
        super::paper_concept::Relation::Concept.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::paper_concept::Relation::Paper.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Concept entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "concepts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Trimmed, lowercased canonical name
    #[sea_orm(column_type = "Text", unique)]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::paper_concept::Entity")]
    PaperConcepts,

    #[sea_orm(has_one = "super::user_knowledge::Entity")]
    Knowledge,
}

impl Related<super::paper_concept::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaperConcepts.def()
    }
}

impl Related<super::user_knowledge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Knowledge.def()
    }
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        super::paper_concept::Relation::Paper.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::paper_concept::Relation::Concept.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Undirected concept relationship entity
//!
//! Rows are stored with `concept_a <= concept_b` so each unordered pair has
//! exactly one row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "concept_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub concept_a: i64,

    #[sea_orm(primary_key, auto_increment = false)]
    pub concept_b: i64,

    #[sea_orm(column_type = "Text")]
    pub relationship: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::concept::Entity",
        from = "Column::ConceptA",
        to = "super::concept::Column::Id",
        on_delete = "Cascade"
    )]
    ConceptA,

    #[sea_orm(
        belongs_to = "super::concept::Entity",
        from = "Column::ConceptB",
        to = "super::concept::Column::Id",
        on_delete = "Cascade"
    )]
    ConceptB,
}

impl ActiveModelBehavior for ActiveModel {}

//! SeaORM entity models
//!
//! Database entities for the PaperMind library

mod chat_history;
mod concept;
mod concept_link;
mod paper;
mod paper_concept;
mod user_knowledge;
mod user_note;

pub use paper::{
    Entity as PaperEntity,
    Model as Paper,
    ActiveModel as PaperActiveModel,
    Column as PaperColumn,
};

pub use concept::{
    Entity as ConceptEntity,
    Model as Concept,
    ActiveModel as ConceptActiveModel,
    Column as ConceptColumn,
};

pub use paper_concept::{
    Entity as PaperConceptEntity,
    Model as PaperConcept,
    ActiveModel as PaperConceptActiveModel,
    Column as PaperConceptColumn,
    Relation as PaperConceptRelation,
};

pub use concept_link::{
    Entity as ConceptLinkEntity,
    Model as ConceptLink,
    ActiveModel as ConceptLinkActiveModel,
    Column as ConceptLinkColumn,
};

pub use user_knowledge::{
    Entity as UserKnowledgeEntity,
    Model as UserKnowledge,
    ActiveModel as UserKnowledgeActiveModel,
    Column as UserKnowledgeColumn,
};

pub use user_note::{
    Entity as UserNoteEntity,
    Model as UserNote,
    ActiveModel as UserNoteActiveModel,
    Column as UserNoteColumn,
};

pub use chat_history::{
    Entity as ChatEntity,
    Model as Chat,
    ActiveModel as ChatActiveModel,
    Column as ChatColumn,
    AgentKind,
    ChatMessage,
    ChatRole,
};

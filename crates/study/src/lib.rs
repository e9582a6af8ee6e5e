//! PaperMind study engine
//!
//! Everything that happens after a paper is in the library:
//! - tutoring and examiner chat sessions with streamed replies
//! - knowledge assessment from examiner transcripts
//! - dashboard, paper detail and knowledge graph read models
//! - self-rating scale

pub mod assessment;
pub mod context;
pub mod dashboard;
pub mod graph;
pub mod rating;
pub mod session;

pub use assessment::{AssessmentOutcome, AssessmentTrigger, ConceptScore, KnowledgeAssessor};
pub use dashboard::{Dashboard, PaperDetail, PaperSummary};
pub use graph::{ConfidenceBand, GraphEdge, GraphNode, KnowledgeGraph};
pub use session::{AssessmentStatus, Reply, StudyService, StudySession};

//! Overview and paper detail read models

use crate::rating::{rating_label, step_from_rating};
use chrono::{DateTime, Utc};
use papermind_common::db::models::{Concept, Paper, UserNote};
use papermind_common::db::{ChatSummary, KnowledgeView, Stats};
use papermind_common::errors::Result;
use papermind_common::Repository;
use serde::Serialize;

/// Authors listed before collapsing the rest into "et al."
const AUTHORS_SHOWN: usize = 3;

/// "A, B, C et al." for long author lists
pub fn short_authors(authors: &[String]) -> String {
    let mut shown = authors
        .iter()
        .take(AUTHORS_SHOWN)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if authors.len() > AUTHORS_SHOWN {
        shown.push_str(" et al.");
    }
    shown
}

#[derive(Debug, Clone, Serialize)]
pub struct PaperSummary {
    pub id: i64,
    pub title: String,
    pub authors: String,
    pub added_at: DateTime<Utc>,
    pub self_rating: Option<f64>,
}

impl PaperSummary {
    pub fn rating_label(&self) -> &'static str {
        rating_label(self.self_rating)
    }
}

impl From<Paper> for PaperSummary {
    fn from(paper: Paper) -> Self {
        Self {
            authors: short_authors(&paper.author_list()),
            id: paper.id,
            title: paper.title,
            added_at: paper.added_at,
            self_rating: paper.self_rating,
        }
    }
}

/// Library overview: counters, papers, weakest concepts first, recent chats
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub stats: Stats,
    pub papers: Vec<PaperSummary>,
    pub knowledge: Vec<KnowledgeView>,
    pub recent_chats: Vec<ChatSummary>,
}

impl Dashboard {
    pub async fn load(repository: &Repository, recent_chats: u64) -> Result<Self> {
        Ok(Self {
            stats: repository.stats().await?,
            papers: repository
                .list_papers()
                .await?
                .into_iter()
                .map(PaperSummary::from)
                .collect(),
            knowledge: repository.list_user_knowledge().await?,
            recent_chats: repository.list_chats(None, recent_chats).await?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}

/// Everything shown for one paper
#[derive(Debug, Clone, Serialize)]
pub struct PaperDetail {
    pub paper: Paper,
    pub authors: Vec<String>,
    pub concepts: Vec<Concept>,
    pub notes: Vec<UserNote>,
    pub chats: Vec<ChatSummary>,
}

impl PaperDetail {
    pub async fn load(repository: &Repository, paper_id: i64, chat_limit: u64) -> Result<Self> {
        let paper = repository.get_paper(paper_id).await?;
        Ok(Self {
            authors: paper.author_list(),
            concepts: repository.concepts_for_paper(paper_id).await?,
            notes: repository.notes_for_paper(paper_id).await?,
            chats: repository.list_chats(Some(paper_id), chat_limit).await?,
            paper,
        })
    }

    pub fn rating_step(&self) -> u8 {
        step_from_rating(self.paper.self_rating)
    }

    pub fn rating_label(&self) -> &'static str {
        rating_label(self.paper.self_rating)
    }
}

//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbBackend, EntityTrait, FromQueryResult, NotSet, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Canonical concept name: trimmed and lowercased
pub fn normalize_concept_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Order an undirected concept pair so that `a <= b`
pub fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Clamp a score into [0, 1]; NaN becomes 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Paper fields as extracted at ingestion time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPaper {
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub summary: String,
    pub source_url: String,
    pub raw_text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewConcept {
    pub name: String,
    pub description: String,
}

/// Relationship between two concepts, referenced by (unnormalized) name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewConceptLink {
    pub from: String,
    pub to: String,
    pub relationship: String,
}

/// Everything written for one ingested paper
#[derive(Debug, Clone, Default)]
pub struct PaperRecord {
    pub paper: NewPaper,
    pub concepts: Vec<NewConcept>,
    pub links: Vec<NewConceptLink>,
}

/// Outcome of [`Repository::record_paper`]
#[derive(Debug, Clone)]
pub struct RecordedPaper {
    pub paper: Paper,
    /// Normalized concept name to id, for every concept linked to the paper
    pub concept_ids: HashMap<String, i64>,
    pub links_recorded: usize,
}

/// Concept link joined with both endpoint names
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize, Deserialize)]
pub struct ConceptLinkView {
    pub concept_a: i64,
    pub name_a: String,
    pub concept_b: i64,
    pub name_b: String,
    pub relationship: String,
}

/// Concept with the number of papers mentioning it and its confidence, if assessed
#[derive(Debug, Clone, PartialEq, FromQueryResult, Serialize, Deserialize)]
pub struct ConceptUsage {
    pub concept_id: i64,
    pub name: String,
    pub description: String,
    pub paper_count: i64,
    pub confidence: Option<f64>,
}

/// Knowledge row joined with its concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeView {
    pub concept_id: i64,
    pub name: String,
    pub description: String,
    pub confidence: f64,
    pub last_tested: Option<DateTime<Utc>>,
}

/// Chat listing entry joined with the paper title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: i64,
    pub paper_id: i64,
    pub paper_title: String,
    pub agent_type: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Library-wide counters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub paper_count: u64,
    pub concept_count: u64,
    pub chat_count: u64,
    pub avg_confidence: f64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Paper Operations
    // ========================================================================

    /// Write a paper with its concepts and concept links in one transaction.
    ///
    /// Concepts are upserted by normalized name; empty names are skipped.
    /// A link is recorded only when both endpoints are concepts of this batch
    /// and resolve to different concepts.
    pub async fn record_paper(&self, record: PaperRecord) -> Result<RecordedPaper> {
        let PaperRecord {
            paper,
            concepts,
            links,
        } = record;

        if paper.title.trim().is_empty() {
            return Err(AppError::validation("title", "Paper title must not be empty"));
        }

        let txn = self.conn().begin().await?;

        let model = PaperActiveModel {
            id: NotSet,
            title: Set(paper.title.trim().to_string()),
            authors: Set(serde_json::to_string(&paper.authors)?),
            abstract_text: Set(paper.abstract_text),
            summary: Set(paper.summary),
            source_url: Set(paper.source_url),
            raw_text: Set(paper.raw_text),
            added_at: Set(Utc::now()),
            self_rating: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut concept_ids = HashMap::new();
        for concept in &concepts {
            if let Some((name, id)) =
                upsert_concept_on(&txn, &concept.name, &concept.description).await?
            {
                link_paper_concept_on(&txn, model.id, id).await?;
                concept_ids.insert(name, id);
            }
        }

        let mut links_recorded = 0;
        for link in &links {
            let from = concept_ids.get(&normalize_concept_name(&link.from));
            let to = concept_ids.get(&normalize_concept_name(&link.to));
            if let (Some(&a), Some(&b)) = (from, to) {
                if upsert_concept_link_on(&txn, a, b, &link.relationship).await? {
                    links_recorded += 1;
                }
            } else {
                debug!(from = %link.from, to = %link.to, "Skipping link with unknown endpoint");
            }
        }

        txn.commit().await?;

        info!(
            paper_id = model.id,
            concepts = concept_ids.len(),
            links = links_recorded,
            "Recorded paper"
        );

        Ok(RecordedPaper {
            paper: model,
            concept_ids,
            links_recorded,
        })
    }

    /// Find paper by ID
    pub async fn find_paper_by_id(&self, id: i64) -> Result<Option<Paper>> {
        PaperEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find paper by ID, failing when absent
    pub async fn get_paper(&self, id: i64) -> Result<Paper> {
        self.find_paper_by_id(id)
            .await?
            .ok_or(AppError::PaperNotFound { id })
    }

    /// Find paper by its original upload file name
    pub async fn find_paper_by_filename(&self, filename: &str) -> Result<Option<Paper>> {
        PaperEntity::find()
            .filter(PaperColumn::SourceUrl.eq(filename))
            .order_by_desc(PaperColumn::Id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Case-insensitive exact title lookup
    pub async fn find_paper_by_title(&self, title: &str) -> Result<Option<Paper>> {
        PaperEntity::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Sqlite,
                "SELECT * FROM papers WHERE LOWER(title) = LOWER(?) ORDER BY id DESC LIMIT 1",
                [title.trim().into()],
            ))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List all papers, newest first
    pub async fn list_papers(&self) -> Result<Vec<Paper>> {
        PaperEntity::find()
            .order_by_desc(PaperColumn::AddedAt)
            .order_by_desc(PaperColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn update_paper_title(&self, id: i64, title: &str) -> Result<Paper> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("title", "Paper title must not be empty"));
        }

        let mut paper: PaperActiveModel = self.get_paper(id).await?.into();
        paper.title = Set(title.to_string());
        paper.update(self.conn()).await.map_err(Into::into)
    }

    pub async fn update_paper_summary(&self, id: i64, summary: &str) -> Result<Paper> {
        let mut paper: PaperActiveModel = self.get_paper(id).await?.into();
        paper.summary = Set(summary.to_string());
        paper.update(self.conn()).await.map_err(Into::into)
    }

    /// Store the user's self-rating, clamped into [0, 1]
    pub async fn update_self_rating(&self, id: i64, rating: f64) -> Result<f64> {
        let rating = clamp_unit(rating);
        let result = PaperEntity::update_many()
            .col_expr(PaperColumn::SelfRating, Expr::value(rating))
            .filter(PaperColumn::Id.eq(id))
            .exec(self.conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::PaperNotFound { id });
        }
        Ok(rating)
    }

    /// Delete a paper with its links, notes and chats, then prune orphaned concepts.
    ///
    /// Returns false when no such paper exists.
    pub async fn delete_paper(&self, id: i64) -> Result<bool> {
        let txn = self.conn().begin().await?;

        let deleted = delete_papers_on(&txn, &[id]).await?;
        let pruned = if deleted > 0 {
            prune_orphans_on(&txn).await?
        } else {
            0
        };

        txn.commit().await?;

        if deleted > 0 {
            info!(paper_id = id, orphans_pruned = pruned, "Deleted paper");
        }
        Ok(deleted > 0)
    }

    /// Delete older papers sharing a non-empty source file name, keeping the
    /// highest id of each group. Returns the number of removed papers.
    pub async fn prune_duplicate_papers(&self) -> Result<u64> {
        let txn = self.conn().begin().await?;

        let rows = txn
            .query_all(Statement::from_string(
                DbBackend::Sqlite,
                r#"
                SELECT id FROM papers
                WHERE source_url != ''
                  AND id NOT IN (
                    SELECT MAX(id) FROM papers
                    WHERE source_url != ''
                    GROUP BY source_url
                  )
                "#,
            ))
            .await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(row.try_get::<i64>("", "id")?);
        }

        if ids.is_empty() {
            txn.commit().await?;
            return Ok(0);
        }

        let deleted = delete_papers_on(&txn, &ids).await?;
        prune_orphans_on(&txn).await?;
        txn.commit().await?;

        info!(removed = deleted, "Pruned duplicate papers");
        Ok(deleted)
    }

    // ========================================================================
    // Concept Operations
    // ========================================================================

    /// Insert or update a concept by normalized name; returns its id.
    ///
    /// The description is replaced only when the new one is non-empty.
    pub async fn upsert_concept(&self, name: &str, description: &str) -> Result<i64> {
        upsert_concept_on(self.conn(), name, description)
            .await?
            .map(|(_, id)| id)
            .ok_or_else(|| AppError::validation("name", "Concept name must not be empty"))
    }

    pub async fn link_paper_concept(&self, paper_id: i64, concept_id: i64) -> Result<()> {
        link_paper_concept_on(self.conn(), paper_id, concept_id).await
    }

    /// Insert or update the undirected link between two concepts.
    ///
    /// Returns false for a self-link, which is never stored.
    pub async fn upsert_concept_link(
        &self,
        concept_a: i64,
        concept_b: i64,
        relationship: &str,
    ) -> Result<bool> {
        upsert_concept_link_on(self.conn(), concept_a, concept_b, relationship).await
    }

    pub async fn find_concept_by_id(&self, id: i64) -> Result<Option<Concept>> {
        ConceptEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_concept_by_name(&self, name: &str) -> Result<Option<Concept>> {
        ConceptEntity::find()
            .filter(ConceptColumn::Name.eq(normalize_concept_name(name)))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// All concepts ordered by name
    pub async fn list_concepts(&self) -> Result<Vec<Concept>> {
        ConceptEntity::find()
            .order_by_asc(ConceptColumn::Name)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Concepts linked to a paper, ordered by name
    pub async fn concepts_for_paper(&self, paper_id: i64) -> Result<Vec<Concept>> {
        ConceptEntity::find()
            .inner_join(PaperConceptEntity)
            .filter(PaperConceptColumn::PaperId.eq(paper_id))
            .order_by_asc(ConceptColumn::Name)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Every stored concept link with endpoint names
    pub async fn all_concept_links(&self) -> Result<Vec<ConceptLinkView>> {
        ConceptLinkView::find_by_statement(Statement::from_string(
            DbBackend::Sqlite,
            r#"
            SELECT cl.concept_a, ca.name AS name_a, cl.concept_b, cb.name AS name_b,
                   cl.relationship
            FROM concept_links cl
            JOIN concepts ca ON cl.concept_a = ca.id
            JOIN concepts cb ON cl.concept_b = cb.id
            ORDER BY ca.name, cb.name
            "#,
        ))
        .all(self.conn())
        .await
        .map_err(Into::into)
    }

    /// Every concept with its paper count and confidence
    pub async fn concept_usage(&self) -> Result<Vec<ConceptUsage>> {
        ConceptUsage::find_by_statement(Statement::from_string(
            DbBackend::Sqlite,
            r#"
            SELECT c.id AS concept_id, c.name, c.description,
                   (SELECT COUNT(*) FROM paper_concepts pc WHERE pc.concept_id = c.id)
                       AS paper_count,
                   uk.confidence AS confidence
            FROM concepts c
            LEFT JOIN user_knowledge uk ON uk.concept_id = c.id
            ORDER BY c.name
            "#,
        ))
        .all(self.conn())
        .await
        .map_err(Into::into)
    }

    // ========================================================================
    // Knowledge Operations
    // ========================================================================

    /// Record a confidence estimate for a concept, clamped and timestamped
    pub async fn upsert_user_knowledge(&self, concept_id: i64, confidence: f64) -> Result<f64> {
        let confidence = clamp_unit(confidence);
        self.conn()
            .execute(Statement::from_sql_and_values(
                DbBackend::Sqlite,
                r#"
                INSERT INTO user_knowledge (concept_id, confidence, last_tested)
                VALUES (?, ?, ?)
                ON CONFLICT(concept_id) DO UPDATE SET
                    confidence = excluded.confidence,
                    last_tested = excluded.last_tested
                "#,
                [concept_id.into(), confidence.into(), Utc::now().into()],
            ))
            .await?;

        debug!(concept_id, confidence, "Updated knowledge");
        Ok(confidence)
    }

    /// Knowledge rows joined with concepts, weakest first
    pub async fn list_user_knowledge(&self) -> Result<Vec<KnowledgeView>> {
        let rows = UserKnowledgeEntity::find()
            .find_also_related(ConceptEntity)
            .order_by_asc(UserKnowledgeColumn::Confidence)
            .all(self.conn())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(knowledge, concept)| {
                concept.map(|concept| KnowledgeView {
                    concept_id: knowledge.concept_id,
                    name: concept.name,
                    description: concept.description,
                    confidence: knowledge.confidence,
                    last_tested: knowledge.last_tested,
                })
            })
            .collect())
    }

    // ========================================================================
    // Note Operations
    // ========================================================================

    /// Append a takeaway to a paper
    pub async fn add_note(&self, paper_id: i64, takeaway: &str) -> Result<UserNote> {
        let takeaway = takeaway.trim();
        if takeaway.is_empty() {
            return Err(AppError::validation("takeaway", "Note must not be empty"));
        }
        self.get_paper(paper_id).await?;

        UserNoteActiveModel {
            id: NotSet,
            paper_id: Set(paper_id),
            takeaway: Set(takeaway.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.conn())
        .await
        .map_err(Into::into)
    }

    /// Notes for a paper, newest first
    pub async fn notes_for_paper(&self, paper_id: i64) -> Result<Vec<UserNote>> {
        UserNoteEntity::find()
            .filter(UserNoteColumn::PaperId.eq(paper_id))
            .order_by_desc(UserNoteColumn::CreatedAt)
            .order_by_desc(UserNoteColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Chat Operations
    // ========================================================================

    /// Start an empty chat for a paper
    pub async fn create_chat(&self, paper_id: i64, agent: AgentKind) -> Result<Chat> {
        self.get_paper(paper_id).await?;

        ChatActiveModel {
            id: NotSet,
            paper_id: Set(paper_id),
            agent_type: Set(agent.as_str().to_string()),
            messages_json: Set("[]".to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.conn())
        .await
        .map_err(Into::into)
    }

    pub async fn find_chat(&self, id: i64) -> Result<Option<Chat>> {
        ChatEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn get_chat(&self, id: i64) -> Result<Chat> {
        self.find_chat(id).await?.ok_or(AppError::ChatNotFound { id })
    }

    /// Most recently started chat for a paper
    pub async fn latest_chat_for_paper(&self, paper_id: i64) -> Result<Option<Chat>> {
        ChatEntity::find()
            .filter(ChatColumn::PaperId.eq(paper_id))
            .order_by_desc(ChatColumn::CreatedAt)
            .order_by_desc(ChatColumn::Id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Reuse the paper's latest chat or start a new one
    pub async fn get_or_create_chat_for_paper(
        &self,
        paper_id: i64,
        agent: AgentKind,
    ) -> Result<Chat> {
        match self.latest_chat_for_paper(paper_id).await? {
            Some(chat) => Ok(chat),
            None => self.create_chat(paper_id, agent).await,
        }
    }

    /// Replace a chat's transcript and record the persona of its latest reply
    pub async fn update_chat_messages(
        &self,
        chat_id: i64,
        messages: &[ChatMessage],
        agent: AgentKind,
    ) -> Result<Chat> {
        let mut chat: ChatActiveModel = self.get_chat(chat_id).await?.into();
        chat.messages_json = Set(serde_json::to_string(messages)?);
        chat.agent_type = Set(agent.as_str().to_string());
        chat.update(self.conn()).await.map_err(Into::into)
    }

    /// Recent chats with their paper titles, newest first
    pub async fn list_chats(&self, paper_id: Option<i64>, limit: u64) -> Result<Vec<ChatSummary>> {
        let mut query = ChatEntity::find().find_also_related(PaperEntity);
        if let Some(paper_id) = paper_id {
            query = query.filter(ChatColumn::PaperId.eq(paper_id));
        }

        let rows = query
            .order_by_desc(ChatColumn::CreatedAt)
            .order_by_desc(ChatColumn::Id)
            .limit(limit)
            .all(self.conn())
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(chat, paper)| {
                paper.map(|paper| ChatSummary {
                    message_count: chat.messages().map(|m| m.len()).unwrap_or(0),
                    id: chat.id,
                    paper_id: chat.paper_id,
                    paper_title: paper.title,
                    agent_type: chat.agent_type,
                    created_at: chat.created_at,
                })
            })
            .collect())
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub async fn stats(&self) -> Result<Stats> {
        let conn = self.conn();
        let paper_count = PaperEntity::find().count(conn).await?;
        let concept_count = ConceptEntity::find().count(conn).await?;
        let chat_count = ChatEntity::find().count(conn).await?;

        let avg_confidence = match conn
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                "SELECT COALESCE(AVG(confidence), 0.0) AS avg FROM user_knowledge",
            ))
            .await?
        {
            Some(row) => row.try_get::<f64>("", "avg")?,
            None => 0.0,
        };

        Ok(Stats {
            paper_count,
            concept_count,
            chat_count,
            avg_confidence,
        })
    }
}

// ============================================================================
// Statement helpers shared by pooled and transactional callers
// ============================================================================

async fn upsert_concept_on<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    description: &str,
) -> Result<Option<(String, i64)>> {
    let name = normalize_concept_name(name);
    if name.is_empty() {
        return Ok(None);
    }

    conn.execute(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        r#"
        INSERT INTO concepts (name, description) VALUES (?, ?)
        ON CONFLICT(name) DO UPDATE SET description = CASE
            WHEN excluded.description != '' THEN excluded.description
            ELSE concepts.description
        END
        "#,
        [name.as_str().into(), description.trim().into()],
    ))
    .await?;

    let row = conn
        .query_one(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "SELECT id FROM concepts WHERE name = ?",
            [name.as_str().into()],
        ))
        .await?
        .ok_or_else(|| AppError::ConceptNotFound { name: name.clone() })?;

    let id = row.try_get::<i64>("", "id")?;
    Ok(Some((name, id)))
}

async fn link_paper_concept_on<C: ConnectionTrait>(
    conn: &C,
    paper_id: i64,
    concept_id: i64,
) -> Result<()> {
    conn.execute(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        "INSERT OR IGNORE INTO paper_concepts (paper_id, concept_id) VALUES (?, ?)",
        [paper_id.into(), concept_id.into()],
    ))
    .await?;
    Ok(())
}

async fn upsert_concept_link_on<C: ConnectionTrait>(
    conn: &C,
    concept_a: i64,
    concept_b: i64,
    relationship: &str,
) -> Result<bool> {
    if concept_a == concept_b {
        return Ok(false);
    }

    let (a, b) = canonical_pair(concept_a, concept_b);
    conn.execute(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        r#"
        INSERT INTO concept_links (concept_a, concept_b, relationship) VALUES (?, ?, ?)
        ON CONFLICT(concept_a, concept_b) DO UPDATE SET relationship = excluded.relationship
        "#,
        [a.into(), b.into(), relationship.trim().into()],
    ))
    .await?;
    Ok(true)
}

/// Delete papers and every row that hangs off them; returns papers removed
async fn delete_papers_on<C: ConnectionTrait>(conn: &C, ids: &[i64]) -> Result<u64> {
    let ids = ids.to_vec();

    PaperConceptEntity::delete_many()
        .filter(PaperConceptColumn::PaperId.is_in(ids.clone()))
        .exec(conn)
        .await?;
    UserNoteEntity::delete_many()
        .filter(UserNoteColumn::PaperId.is_in(ids.clone()))
        .exec(conn)
        .await?;
    ChatEntity::delete_many()
        .filter(ChatColumn::PaperId.is_in(ids.clone()))
        .exec(conn)
        .await?;
    let result = PaperEntity::delete_many()
        .filter(PaperColumn::Id.is_in(ids))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

/// Remove concepts no paper references, with their links and knowledge
async fn prune_orphans_on<C: ConnectionTrait>(conn: &C) -> Result<u64> {
    conn.execute_unprepared(
        r#"
        DELETE FROM concept_links
        WHERE concept_a NOT IN (SELECT DISTINCT concept_id FROM paper_concepts)
           OR concept_b NOT IN (SELECT DISTINCT concept_id FROM paper_concepts)
        "#,
    )
    .await?;
    conn.execute_unprepared(
        "DELETE FROM user_knowledge \
         WHERE concept_id NOT IN (SELECT DISTINCT concept_id FROM paper_concepts)",
    )
    .await?;
    let result = conn
        .execute_unprepared(
            "DELETE FROM concepts WHERE id NOT IN (SELECT DISTINCT concept_id FROM paper_concepts)",
        )
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use tokio_test::{assert_err, assert_ok};

    async fn repo() -> Repository {
        let pool = DbPool::new(&DatabaseConfig::in_memory()).await.unwrap();
        Repository::new(pool)
    }

    fn record(filename: &str, concepts: &[(&str, &str)], links: &[(&str, &str, &str)]) -> PaperRecord {
        PaperRecord {
            paper: NewPaper {
                title: format!("Paper from {}", filename),
                authors: vec!["Ada Lovelace".into(), "Alan Turing".into()],
                abstract_text: "An abstract.".into(),
                summary: "A summary.".into(),
                source_url: filename.into(),
                raw_text: String::new(),
            },
            concepts: concepts
                .iter()
                .map(|(name, description)| NewConcept {
                    name: name.to_string(),
                    description: description.to_string(),
                })
                .collect(),
            links: links
                .iter()
                .map(|(from, to, relationship)| NewConceptLink {
                    from: from.to_string(),
                    to: to.to_string(),
                    relationship: relationship.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_pure_helpers() {
        assert_eq!(normalize_concept_name("  Self-Attention "), "self-attention");
        assert_eq!(canonical_pair(9, 3), (3, 9));
        assert_eq!(canonical_pair(3, 9), (3, 9));
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
    }

    #[tokio::test]
    async fn test_ping() {
        assert_ok!(repo().await.ping().await);
    }

    #[tokio::test]
    async fn test_record_paper_links_batch_concepts() {
        let repo = repo().await;
        let recorded = repo
            .record_paper(record(
                "attention.pdf",
                &[("Attention", "weights tokens"), ("Transformer", ""), ("  ", "blank")],
                &[
                    ("attention", "TRANSFORMER", "core of"),
                    ("attention", "recurrence", "replaces"),
                    ("Attention", "attention ", "self"),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(recorded.concept_ids.len(), 2);
        assert_eq!(recorded.links_recorded, 1);
        assert_eq!(
            recorded.paper.author_list(),
            vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()]
        );

        let concepts = repo.concepts_for_paper(recorded.paper.id).await.unwrap();
        let names: Vec<_> = concepts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["attention", "transformer"]);

        let links = repo.all_concept_links().await.unwrap();
        assert_eq!(links.len(), 1);
        assert!(links[0].concept_a <= links[0].concept_b);
        assert_eq!(links[0].relationship, "core of");
    }

    #[tokio::test]
    async fn test_record_paper_rejects_blank_title() {
        let repo = repo().await;
        let mut rec = record("blank.pdf", &[], &[]);
        rec.paper.title = "   ".into();

        let err = repo.record_paper(rec).await.unwrap_err();
        assert!(err.is_user_error());
        assert_eq!(repo.stats().await.unwrap().paper_count, 0);
    }

    #[tokio::test]
    async fn test_concept_upsert_is_case_insensitive() {
        let repo = repo().await;
        let first = repo.upsert_concept("Gradient Descent", "an optimizer").await.unwrap();
        let second = repo.upsert_concept("  gradient descent", "").await.unwrap();
        let third = repo.upsert_concept("GRADIENT DESCENT", "first-order method").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);

        let concepts = repo.list_concepts().await.unwrap();
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].description, "first-order method");

        let found = repo.find_concept_by_name("Gradient descent").await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(first));

        assert_err!(repo.upsert_concept("   ", "nothing").await);
    }

    #[tokio::test]
    async fn test_description_kept_when_new_one_is_empty() {
        let repo = repo().await;
        repo.upsert_concept("entropy", "expected surprise").await.unwrap();
        repo.upsert_concept("Entropy", "").await.unwrap();

        let concept = repo.find_concept_by_name("entropy").await.unwrap().unwrap();
        assert_eq!(concept.description, "expected surprise");
    }

    #[tokio::test]
    async fn test_reversed_links_collapse() {
        let repo = repo().await;
        let a = repo.upsert_concept("encoder", "").await.unwrap();
        let b = repo.upsert_concept("decoder", "").await.unwrap();

        assert!(repo.upsert_concept_link(b, a, "feeds").await.unwrap());
        assert!(repo.upsert_concept_link(a, b, "paired with").await.unwrap());
        assert!(!repo.upsert_concept_link(a, a, "itself").await.unwrap());

        let links = repo.all_concept_links().await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].relationship, "paired with");
        assert_eq!((links[0].concept_a, links[0].concept_b), canonical_pair(a, b));
    }

    #[tokio::test]
    async fn test_scores_are_clamped() {
        let repo = repo().await;
        let recorded = repo
            .record_paper(record("clamp.pdf", &[("bayes", "")], &[]))
            .await
            .unwrap();
        let concept_id = recorded.concept_ids["bayes"];

        assert_eq!(repo.upsert_user_knowledge(concept_id, 1.4).await.unwrap(), 1.0);
        assert_eq!(repo.update_self_rating(recorded.paper.id, -3.0).await.unwrap(), 0.0);

        let knowledge = repo.list_user_knowledge().await.unwrap();
        assert_eq!(knowledge.len(), 1);
        assert_eq!(knowledge[0].confidence, 1.0);
        assert!(knowledge[0].last_tested.is_some());

        let paper = repo.get_paper(recorded.paper.id).await.unwrap();
        assert_eq!(paper.self_rating, Some(0.0));

        let missing = repo.update_self_rating(999, 0.5).await.unwrap_err();
        assert_eq!(missing.code(), crate::errors::ErrorCode::PaperNotFound);
    }

    #[tokio::test]
    async fn test_knowledge_lists_weakest_first() {
        let repo = repo().await;
        let recorded = repo
            .record_paper(record("order.pdf", &[("a", ""), ("b", ""), ("c", "")], &[]))
            .await
            .unwrap();
        repo.upsert_user_knowledge(recorded.concept_ids["a"], 0.9).await.unwrap();
        repo.upsert_user_knowledge(recorded.concept_ids["b"], 0.1).await.unwrap();
        repo.upsert_user_knowledge(recorded.concept_ids["c"], 0.5).await.unwrap();

        let names: Vec<_> = repo
            .list_user_knowledge()
            .await
            .unwrap()
            .into_iter()
            .map(|k| k.name)
            .collect();
        assert_eq!(names, vec!["b", "c", "a"]);

        let stats = repo.stats().await.unwrap();
        assert!((stats.avg_confidence - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_delete_paper_cascades_and_prunes_orphans() {
        let repo = repo().await;
        let keep = repo
            .record_paper(record("keep.pdf", &[("shared", "")], &[]))
            .await
            .unwrap();
        let gone = repo
            .record_paper(record(
                "gone.pdf",
                &[("shared", ""), ("lonely", "")],
                &[("shared", "lonely", "relates")],
            ))
            .await
            .unwrap();
        repo.upsert_user_knowledge(gone.concept_ids["lonely"], 0.4).await.unwrap();
        repo.add_note(gone.paper.id, "remember this").await.unwrap();
        repo.create_chat(gone.paper.id, AgentKind::Teach).await.unwrap();

        assert!(repo.delete_paper(gone.paper.id).await.unwrap());
        assert!(!repo.delete_paper(gone.paper.id).await.unwrap());

        let names: Vec<_> = repo
            .list_concepts()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["shared"]);
        assert!(repo.all_concept_links().await.unwrap().is_empty());
        assert!(repo.list_user_knowledge().await.unwrap().is_empty());
        assert!(repo.notes_for_paper(gone.paper.id).await.unwrap().is_empty());
        assert!(repo.list_chats(Some(gone.paper.id), 20).await.unwrap().is_empty());

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.paper_count, 1);
        assert_eq!(stats.chat_count, 0);
        assert_eq!(repo.concepts_for_paper(keep.paper.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_prune_duplicates_keeps_newest() {
        let repo = repo().await;
        let old = repo.record_paper(record("dup.pdf", &[("old-only", "")], &[])).await.unwrap();
        let new = repo.record_paper(record("dup.pdf", &[("fresh", "")], &[])).await.unwrap();
        let mut unnamed = record("", &[], &[]);
        unnamed.paper.title = "No source".into();
        repo.record_paper(unnamed.clone()).await.unwrap();
        repo.record_paper(unnamed).await.unwrap();

        assert_eq!(repo.prune_duplicate_papers().await.unwrap(), 1);
        assert_eq!(repo.prune_duplicate_papers().await.unwrap(), 0);

        assert!(repo.find_paper_by_id(old.paper.id).await.unwrap().is_none());
        let survivor = repo.find_paper_by_filename("dup.pdf").await.unwrap().unwrap();
        assert_eq!(survivor.id, new.paper.id);
        assert!(repo.find_concept_by_name("old-only").await.unwrap().is_none());
        assert_eq!(repo.stats().await.unwrap().paper_count, 3);
    }

    #[tokio::test]
    async fn test_title_lookup_and_rename() {
        let repo = repo().await;
        let recorded = repo.record_paper(record("t.pdf", &[], &[])).await.unwrap();

        let found = repo.find_paper_by_title("paper FROM t.pdf").await.unwrap();
        assert_eq!(found.map(|p| p.id), Some(recorded.paper.id));

        let renamed = repo
            .update_paper_title(recorded.paper.id, "  Attention Is All You Need ")
            .await
            .unwrap();
        assert_eq!(renamed.title, "Attention Is All You Need");
        assert_err!(repo.update_paper_title(recorded.paper.id, " ").await);
        assert!(repo.find_paper_by_title("paper from t.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_chats_reuse_latest_and_list_titles() {
        let repo = repo().await;
        let paper = repo.record_paper(record("chat.pdf", &[], &[])).await.unwrap().paper;

        let first = repo
            .get_or_create_chat_for_paper(paper.id, AgentKind::Teach)
            .await
            .unwrap();
        let again = repo
            .get_or_create_chat_for_paper(paper.id, AgentKind::Zealot)
            .await
            .unwrap();
        assert_eq!(first.id, again.id);

        let fresh = repo.create_chat(paper.id, AgentKind::Zealot).await.unwrap();
        let latest = repo.latest_chat_for_paper(paper.id).await.unwrap().unwrap();
        assert_eq!(latest.id, fresh.id);

        let messages = vec![
            ChatMessage::user("quiz me"),
            ChatMessage::assistant("What is a residual connection?", AgentKind::Zealot),
        ];
        let updated = repo
            .update_chat_messages(fresh.id, &messages, AgentKind::Zealot)
            .await
            .unwrap();
        assert_eq!(updated.messages().unwrap(), messages);
        assert_eq!(updated.agent(), AgentKind::Zealot);

        let chats = repo.list_chats(None, 20).await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].id, fresh.id);
        assert_eq!(chats[0].message_count, 2);
        assert_eq!(chats[0].paper_title, paper.title);
        assert_eq!(repo.list_chats(None, 1).await.unwrap().len(), 1);

        assert_err!(repo.create_chat(4242, AgentKind::Teach).await);
    }

    #[tokio::test]
    async fn test_notes_newest_first() {
        let repo = repo().await;
        let paper = repo.record_paper(record("notes.pdf", &[], &[])).await.unwrap().paper;

        repo.add_note(paper.id, "first").await.unwrap();
        repo.add_note(paper.id, "second").await.unwrap();
        assert_err!(repo.add_note(paper.id, "   ").await);
        assert_err!(repo.add_note(777, "orphan").await);

        let notes: Vec<_> = repo
            .notes_for_paper(paper.id)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.takeaway)
            .collect();
        assert_eq!(notes, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_concept_usage_counts_papers() {
        let repo = repo().await;
        let one = repo
            .record_paper(record("u1.pdf", &[("shared", ""), ("solo", "")], &[]))
            .await
            .unwrap();
        repo.record_paper(record("u2.pdf", &[("Shared", "")], &[])).await.unwrap();
        repo.upsert_user_knowledge(one.concept_ids["solo"], 0.25).await.unwrap();

        let usage = repo.concept_usage().await.unwrap();
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].name, "shared");
        assert_eq!(usage[0].paper_count, 2);
        assert_eq!(usage[0].confidence, None);
        assert_eq!(usage[1].paper_count, 1);
        assert_eq!(usage[1].confidence, Some(0.25));
    }
}

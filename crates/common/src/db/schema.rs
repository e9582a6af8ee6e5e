//! Schema bootstrap
//!
//! Tables are created idempotently on every start. Columns added after the
//! first release are patched in by [`migrate`] so older database files keep
//! working.

use crate::errors::Result;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS papers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        authors TEXT NOT NULL DEFAULT '[]',
        abstract TEXT NOT NULL DEFAULT '',
        summary TEXT NOT NULL DEFAULT '',
        source_url TEXT NOT NULL DEFAULT '',
        raw_text TEXT NOT NULL DEFAULT '',
        added_at TEXT NOT NULL,
        self_rating REAL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS concepts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS paper_concepts (
        paper_id INTEGER NOT NULL REFERENCES papers(id) ON DELETE CASCADE,
        concept_id INTEGER NOT NULL REFERENCES concepts(id) ON DELETE CASCADE,
        PRIMARY KEY (paper_id, concept_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS concept_links (
        concept_a INTEGER NOT NULL REFERENCES concepts(id) ON DELETE CASCADE,
        concept_b INTEGER NOT NULL REFERENCES concepts(id) ON DELETE CASCADE,
        relationship TEXT NOT NULL DEFAULT '',
        PRIMARY KEY (concept_a, concept_b),
        CHECK (concept_a <= concept_b)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_knowledge (
        concept_id INTEGER PRIMARY KEY REFERENCES concepts(id) ON DELETE CASCADE,
        confidence REAL NOT NULL DEFAULT 0.0,
        last_tested TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        paper_id INTEGER NOT NULL REFERENCES papers(id) ON DELETE CASCADE,
        takeaway TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chat_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        paper_id INTEGER NOT NULL REFERENCES papers(id) ON DELETE CASCADE,
        agent_type TEXT NOT NULL CHECK(agent_type IN ('teach', 'zealot')),
        messages_json TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_papers_source_url ON papers(source_url)",
    "CREATE INDEX IF NOT EXISTS idx_paper_concepts_concept ON paper_concepts(concept_id)",
    "CREATE INDEX IF NOT EXISTS idx_user_notes_paper ON user_notes(paper_id)",
    "CREATE INDEX IF NOT EXISTS idx_chat_history_paper ON chat_history(paper_id, created_at)",
];

/// Create missing tables and apply additive column migrations
pub(crate) async fn migrate(conn: &DatabaseConnection) -> Result<()> {
    for statement in SCHEMA {
        conn.execute_unprepared(statement).await?;
    }

    let columns = table_columns(conn, "papers").await?;
    if !columns.iter().any(|c| c == "self_rating") {
        info!("Adding papers.self_rating column");
        conn.execute_unprepared("ALTER TABLE papers ADD COLUMN self_rating REAL")
            .await?;
    }

    Ok(())
}

async fn table_columns(conn: &DatabaseConnection, table: &str) -> Result<Vec<String>> {
    let rows = conn
        .query_all(Statement::from_string(
            DbBackend::Sqlite,
            format!("PRAGMA table_info({})", table),
        ))
        .await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        columns.push(row.try_get::<String>("", "name")?);
    }
    Ok(columns)
}

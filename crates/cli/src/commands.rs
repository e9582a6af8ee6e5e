//! Library commands

use crate::render;
use anyhow::{bail, Context, Result};
use papermind_common::config::AppConfig;
use papermind_common::{LlmService, Repository};
use papermind_ingestion::{IngestOutcome, IngestionProcessor};
use papermind_study::rating::{rating_from_step, step_label};
use papermind_study::{Dashboard, KnowledgeGraph, PaperDetail, PaperSummary, StudyService};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Shared state for every command
pub struct App {
    config: AppConfig,
    repository: Repository,
}

impl App {
    pub fn new(config: AppConfig, repository: Repository) -> Self {
        Self { config, repository }
    }

    /// LLM access is only set up for commands that talk to the model
    fn llm(&self) -> Result<LlmService> {
        LlmService::from_config(&self.config.llm).context("Failed to set up the LLM client")
    }

    fn processor(&self) -> Result<IngestionProcessor> {
        let upload_dir = self
            .config
            .storage
            .ensure_upload_dir()
            .context("Failed to create upload directory")?;
        Ok(IngestionProcessor::new(
            self.repository.clone(),
            self.llm()?,
            upload_dir,
        ))
    }

    pub fn study(&self) -> Result<StudyService> {
        Ok(StudyService::new(
            self.repository.clone(),
            self.llm()?,
            self.config.study.clone(),
        ))
    }

    pub async fn ingest(&self, path: &Path) -> Result<()> {
        let processor = self.processor()?;

        if path.is_dir() {
            let entries = processor.process_directory(path).await?;
            if entries.is_empty() {
                println!("No PDFs found in {}", path.display());
            }
            for entry in &entries {
                let name = entry.path.display();
                match &entry.outcome {
                    IngestOutcome::Created(paper) => {
                        println!("+ {} -> paper {} \"{}\"", name, paper.paper_id, paper.title)
                    }
                    IngestOutcome::Duplicate { paper_id } => {
                        println!("= {} already in library as paper {}", name, paper_id)
                    }
                    IngestOutcome::Failed(e) => println!("! {} failed: {}", name, e),
                }
            }
            return Ok(());
        }

        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Not a file: {}", path.display()))?;

        match processor.process_pdf(path, &original_name).await {
            Ok(paper) => {
                println!(
                    "Added paper {} \"{}\" ({} concepts, {} links)",
                    paper.paper_id, paper.title, paper.concepts, paper.links
                );
                Ok(())
            }
            Err(e) => match e.duplicate_of() {
                Some(paper_id) => {
                    println!("Already in library as paper {}", paper_id);
                    self.show(paper_id, false).await
                }
                None => Err(e.into()),
            },
        }
    }

    pub async fn papers(&self, json: bool) -> Result<()> {
        let papers: Vec<PaperSummary> = self
            .repository
            .list_papers()
            .await?
            .into_iter()
            .map(PaperSummary::from)
            .collect();

        if json {
            return print_json(&papers);
        }
        print!("{}", render::paper_list(&papers));
        Ok(())
    }

    pub async fn show(&self, id: i64, json: bool) -> Result<()> {
        let detail = PaperDetail::load(&self.repository, id, self.config.study.recent_chats_limit).await?;
        if json {
            return print_json(&detail);
        }
        print!("{}", render::paper_detail(&detail));
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.repository.delete_paper(id).await? {
            bail!("Paper {} not found", id);
        }
        println!("Deleted paper {}", id);
        Ok(())
    }

    pub async fn rate(&self, id: i64, step: u8) -> Result<()> {
        let stored = self
            .repository
            .update_self_rating(id, rating_from_step(step)?)
            .await?;
        info!(paper_id = id, rating = stored, "Updated self-rating");
        println!("Paper {}: {}", id, step_label(step));
        Ok(())
    }

    pub async fn note(&self, id: i64, text: &str) -> Result<()> {
        let note = self.repository.add_note(id, text).await?;
        println!("Saved takeaway {} for paper {}", note.id, id);
        Ok(())
    }

    pub async fn rename(&self, id: i64, title: &str) -> Result<()> {
        let paper = self.repository.update_paper_title(id, title).await?;
        println!("Paper {} is now \"{}\"", paper.id, paper.title);
        Ok(())
    }

    pub async fn regenerate(&self, id: i64) -> Result<()> {
        match self.processor()?.regenerate_summary(id).await? {
            Some(summary) => println!("New summary:\n{}", summary),
            None => {
                warn!(paper_id = id, "Extraction returned no summary");
                println!("The model returned no summary; kept the existing one.");
            }
        }
        Ok(())
    }

    pub async fn dashboard(&self, json: bool) -> Result<()> {
        let dashboard = Dashboard::load(&self.repository, self.config.study.recent_chats_limit).await?;
        if json {
            return print_json(&dashboard);
        }
        print!("{}", render::dashboard(&dashboard));
        Ok(())
    }

    pub async fn graph(&self, json: bool) -> Result<()> {
        let graph = KnowledgeGraph::load(&self.repository).await?;
        if json {
            return print_json(&graph);
        }
        print!("{}", render::knowledge_graph(&graph));
        Ok(())
    }

    pub async fn prune_duplicates(&self) -> Result<()> {
        let removed = self.repository.prune_duplicate_papers().await?;
        println!("Removed {} duplicate paper(s)", removed);
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

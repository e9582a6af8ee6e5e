//! Ingestion processor
//!
//! Core logic for taking a PDF into the library: duplicate check, storage in
//! the upload directory, LLM extraction and transactional persistence.

use crate::errors::IngestionError;
use crate::pdf::{encode_base64, extract_text, has_pdf_signature};
use papermind_common::db::Repository;
use papermind_common::errors::AppError;
use papermind_common::llm::LlmService;
use papermind_common::metrics::record_ingestion;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// A paper written by [`IngestionProcessor::process_pdf`]
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedPaper {
    pub paper_id: i64,
    pub title: String,
    pub concepts: usize,
    pub links: usize,
    pub stored_at: PathBuf,
}

/// Per-file result of a directory run
#[derive(Debug)]
pub enum IngestOutcome {
    Created(IngestedPaper),
    Duplicate { paper_id: i64 },
    Failed(IngestionError),
}

#[derive(Debug)]
pub struct DirectoryEntry {
    pub path: PathBuf,
    pub outcome: IngestOutcome,
}

/// Ingestion processor
pub struct IngestionProcessor {
    repository: Repository,
    llm: LlmService,
    upload_dir: PathBuf,
}

impl IngestionProcessor {
    pub fn new(repository: Repository, llm: LlmService, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            repository,
            llm,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Ingest one PDF under its original file name.
    ///
    /// Fails with a duplicate error carrying the existing paper id when a
    /// paper with the same file name is already stored.
    #[instrument(skip(self), fields(path = %file_path.display()))]
    pub async fn process_pdf(
        &self,
        file_path: &Path,
        original_name: &str,
    ) -> Result<IngestedPaper, IngestionError> {
        let start = Instant::now();

        let result = self.ingest(file_path, original_name).await;

        let elapsed = start.elapsed().as_secs_f64();
        match &result {
            Ok(paper) => record_ingestion(elapsed, "created", paper.concepts),
            Err(e) => record_ingestion(elapsed, e.outcome(), 0),
        }

        result
    }

    async fn ingest(
        &self,
        file_path: &Path,
        original_name: &str,
    ) -> Result<IngestedPaper, IngestionError> {
        let name = safe_file_name(original_name).ok_or_else(|| {
            AppError::validation("filename", format!("Unusable file name: {:?}", original_name))
        })?;

        if let Some(existing) = self.repository.find_paper_by_filename(&name).await? {
            info!(paper_id = existing.id, filename = %name, "Paper already uploaded");
            return Err(AppError::DuplicatePaper {
                paper_id: existing.id,
                filename: name,
            }
            .into());
        }

        if !file_path.exists() {
            return Err(IngestionError::FileNotFound(file_path.display().to_string()));
        }

        let bytes = tokio::fs::read(file_path).await?;
        if !has_pdf_signature(&bytes) {
            return Err(IngestionError::NotAPdf {
                path: file_path.display().to_string(),
            });
        }

        let stored_at = self.store(file_path, &name, &bytes).await?;

        let raw_text = match extract_text(&bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Text extraction failed, continuing without raw text");
                String::new()
            }
        };

        info!(filename = %name, size = bytes.len(), "Sending PDF for extraction");
        let extracted = self.llm.parse_paper(&encode_base64(&bytes), &name).await?;

        let record = extracted.into_record(&name, raw_text, &name);
        let recorded = self.repository.record_paper(record).await?;

        info!(
            paper_id = recorded.paper.id,
            title = %recorded.paper.title,
            concepts = recorded.concept_ids.len(),
            links = recorded.links_recorded,
            "PDF ingested"
        );

        Ok(IngestedPaper {
            paper_id: recorded.paper.id,
            title: recorded.paper.title,
            concepts: recorded.concept_ids.len(),
            links: recorded.links_recorded,
            stored_at,
        })
    }

    /// Write the upload into the upload directory unless it already lives there
    async fn store(&self, source: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, IngestionError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let dest = self.upload_dir.join(name);

        let same_file = match (
            tokio::fs::canonicalize(source).await,
            tokio::fs::canonicalize(&dest).await,
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };

        if same_file {
            debug!(dest = %dest.display(), "Upload already in place");
        } else {
            tokio::fs::write(&dest, bytes).await?;
            debug!(dest = %dest.display(), "Stored upload");
        }

        Ok(dest)
    }

    /// Re-run extraction on the stored PDF and replace the summary.
    ///
    /// Returns `None`, leaving the paper untouched, when the new summary is empty.
    #[instrument(skip(self))]
    pub async fn regenerate_summary(&self, paper_id: i64) -> Result<Option<String>, IngestionError> {
        let paper = self.repository.get_paper(paper_id).await?;

        let path = safe_file_name(&paper.source_url)
            .map(|name| self.upload_dir.join(name))
            .filter(|path| path.exists())
            .ok_or_else(|| {
                IngestionError::FileNotFound(
                    self.upload_dir.join(&paper.source_url).display().to_string(),
                )
            })?;

        let bytes = tokio::fs::read(&path).await?;
        let extracted = self
            .llm
            .parse_paper(&encode_base64(&bytes), &paper.source_url)
            .await?;

        let summary = extracted.summary.trim();
        if summary.is_empty() {
            warn!("Regenerated summary was empty, keeping the old one");
            return Ok(None);
        }

        self.repository.update_paper_summary(paper_id, summary).await?;
        info!(chars = summary.len(), "Summary regenerated");

        Ok(Some(summary.to_string()))
    }

    /// Ingest every `*.pdf` in a directory, in file-name order.
    ///
    /// Duplicates and failures are recorded per file and do not stop the run.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn process_directory(&self, dir: &Path) -> Result<Vec<DirectoryEntry>, IngestionError> {
        info!("Processing directory of PDFs");

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_pdf = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false);
            if is_pdf && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            let outcome = match self.process_pdf(&path, &name).await {
                Ok(paper) => IngestOutcome::Created(paper),
                Err(e) => match e.duplicate_of() {
                    Some(paper_id) => IngestOutcome::Duplicate { paper_id },
                    None => {
                        error!(path = %path.display(), error = %e, "Failed to process PDF");
                        IngestOutcome::Failed(e)
                    }
                },
            };
            results.push(DirectoryEntry { path, outcome });
        }

        let created = results
            .iter()
            .filter(|r| matches!(r.outcome, IngestOutcome::Created(_)))
            .count();
        info!(total = results.len(), created, "Directory processing complete");

        Ok(results)
    }
}

/// Final path component of an uploaded name, if it is a usable file name
fn safe_file_name(original_name: &str) -> Option<String> {
    let name = Path::new(original_name.trim()).file_name()?.to_string_lossy().trim().to_string();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}

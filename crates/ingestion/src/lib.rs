//! PaperMind ingestion pipeline
//!
//! Takes a PDF into the library:
//! 1. Rejects re-uploads of a known file name
//! 2. Stores the file in the upload directory
//! 3. Extracts raw text locally and structured metadata through the LLM
//! 4. Records paper, concepts and concept links in one transaction

pub mod errors;
pub mod pdf;
pub mod processor;

pub use errors::IngestionError;
pub use processor::{DirectoryEntry, IngestOutcome, IngestedPaper, IngestionProcessor};

//! Ingestion pipelines
//!
//! Fetch external metadata, dedupe against existing records, resolve
//! taxonomy terms, fetch images, persist. Primary-path failures abort
//! with the stage they died in; secondary-path failures (credits, images,
//! individual terms) degrade to warnings and the entity is persisted
//! anyway.

pub mod article;
pub mod movie;

pub use article::ArticleIngestor;
pub use movie::MovieIngestor;

use thiserror::Error;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Dedupe,
    FetchDetails,
    FetchCredits,
    ResolveTaxonomy,
    FetchImages,
    Persist,
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IngestStage::Dedupe => "dedupe",
            IngestStage::FetchDetails => "fetch-details",
            IngestStage::FetchCredits => "fetch-credits",
            IngestStage::ResolveTaxonomy => "resolve-taxonomy",
            IngestStage::FetchImages => "fetch-images",
            IngestStage::Persist => "persist",
        };

        write!(f, "{}", name)
    }
}

/// Fatal pipeline failure, tagged with the stage it happened in
#[derive(Debug, Error)]
#[error("Ingestion failed at {stage} stage: {message}")]
pub struct IngestError {
    pub stage: IngestStage,
    pub message: String,
}

impl IngestError {
    pub fn new(stage: IngestStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Successful pipeline result
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Content-store ID of the persisted entity
    pub entity_id: i64,
    /// False when an existing entity was updated in place
    pub created: bool,
    /// Non-fatal degradations (missing credits, failed image fetch, ...)
    pub warnings: Vec<String>,
}

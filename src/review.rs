//! High-level pipeline: locate → extract → generate → publish for one run.
//!
//! The stages run strictly in sequence and each hands an immutable snapshot to
//! the next. Fatal errors from locating, generating or publishing abort the
//! run before anything is written to the destination folder; per-document
//! extraction failures only accumulate as warnings, summarized at the end.
//!
//! # Callable From
//! - The CLI entrypoint and integration tests, with any [`DocumentStore`] /
//!   [`Completer`] implementation (real clients or mocks).

use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::contract::{
    Completer, ConfigError, ContentReadError, DocumentStore, GenerationError, PublishError,
    PublishedReport, StoreAccessError,
};
use crate::extract::{self, DEFAULT_CONCURRENT_FETCHES};
use crate::generate::{self, GenerateConfig};
use crate::locate;
use crate::publish;

/// Pipeline stage, used to name where a run failed and to trace progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuring,
    Locating,
    Extracting,
    Generating,
    Publishing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configuring => "configuring",
            Stage::Locating => "locating",
            Stage::Extracting => "extracting",
            Stage::Generating => "generating",
            Stage::Publishing => "publishing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Fatal pipeline failure, tagged with the stage it came from.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("configuration failed: {0}")]
    Config(#[from] ConfigError),
    #[error("locating documents failed: {0}")]
    Locate(#[from] StoreAccessError),
    #[error("report generation failed: {0}")]
    Generate(#[from] GenerationError),
    #[error("report publication failed: {0}")]
    Publish(#[from] PublishError),
}

impl ReviewError {
    pub fn stage(&self) -> Stage {
        match self {
            ReviewError::Config(_) => Stage::Configuring,
            ReviewError::Locate(_) => Stage::Locating,
            ReviewError::Generate(_) => Stage::Generating,
            ReviewError::Publish(_) => Stage::Publishing,
        }
    }
}

/// What a completed run did: the published report (absent when there was
/// nothing to review), how many documents were located, and the per-document
/// warnings collected along the way.
#[derive(Debug)]
pub struct ReviewOutcome {
    pub published: Option<PublishedReport>,
    pub located: usize,
    pub skipped: Vec<ContentReadError>,
}

/// Run the full pipeline once.
pub async fn review<S, C>(
    config: &RunConfig,
    store: &S,
    completer: &C,
) -> Result<ReviewOutcome, ReviewError>
where
    S: DocumentStore,
    C: Completer,
{
    info!(stage = %Stage::Locating, "Starting review pipeline");
    let located = locate::find(store, config).await?;
    if located.is_empty() {
        info!("No documents in the requested date range; nothing to review");
        return Ok(ReviewOutcome {
            published: None,
            located: 0,
            skipped: Vec::new(),
        });
    }
    let located_count = located.len();

    info!(stage = %Stage::Extracting, documents = located_count, "Extracting document bodies");
    let extracted = extract::extract_all(store, located, DEFAULT_CONCURRENT_FETCHES).await;
    if extracted.documents.is_empty() {
        warn!(
            skipped = extracted.warnings.len(),
            "Every located document failed extraction; nothing to review"
        );
        return Ok(ReviewOutcome {
            published: None,
            located: located_count,
            skipped: extracted.warnings,
        });
    }

    info!(stage = %Stage::Generating, documents = extracted.documents.len(), "Generating report");
    let draft = generate::generate(completer, &extracted.documents, &GenerateConfig::default()).await?;

    info!(stage = %Stage::Publishing, "Publishing report");
    let published = publish::publish(store, &draft, config).await?;

    if !extracted.warnings.is_empty() {
        warn!(
            count = extracted.warnings.len(),
            "Some documents were skipped and are not part of the report"
        );
        for warning in &extracted.warnings {
            warn!(document_id = %warning.document_id, reason = %warning.reason, "Skipped document");
        }
    }
    info!(
        stage = %Stage::Done,
        document_id = %published.document_id,
        sources = draft.source_document_ids.len(),
        skipped = extracted.warnings.len(),
        "Review complete"
    );

    Ok(ReviewOutcome {
        published: Some(published),
        located: located_count,
        skipped: extracted.warnings,
    })
}

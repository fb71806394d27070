//! Report Publisher: one deterministic document create, never retried.

use chrono::NaiveDate;
use tracing::info;

use crate::config::RunConfig;
use crate::contract::{DocumentStore, PublishError, PublishedReport, ReportDraft};

/// Deterministic report name derived from the run's date range, so re-runs
/// over the same range produce a discoverable sibling rather than an opaque
/// duplicate.
pub fn report_name(start: NaiveDate, end: NaiveDate) -> String {
    format!("Report_{start}_{end}")
}

/// Create the report document under the destination folder. A failed create is
/// not retried: the request may have succeeded server-side, and repeating it
/// could orphan a duplicate report.
pub async fn publish<S: DocumentStore>(
    store: &S,
    draft: &ReportDraft,
    config: &RunConfig,
) -> Result<PublishedReport, PublishError> {
    let name = report_name(config.start, config.end);
    info!(
        folder_id = %config.destination_folder_id,
        name = %name,
        sources = draft.source_document_ids.len(),
        "Publishing report document"
    );

    let document_id = store
        .create_document(&config.destination_folder_id, &name, &draft.generated_text)
        .await?;

    info!(document_id = %document_id, "Report document created");
    Ok(PublishedReport {
        document_id,
        folder_id: config.destination_folder_id.clone(),
    })
}

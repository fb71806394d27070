//! Document Locator: folder listing filtered to the requested date range.
//!
//! The store listing already restricts by parent folder and document type; this
//! module resolves a date per entry (name token first, modification time as the
//! fallback) and keeps the ones inside `[start, end]`. An empty result is a
//! valid outcome, not an error.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::contract::{DocumentStore, SourceDocument, StoreAccessError};
use crate::retry::{retry_with_backoff, RetryPolicy};

// Journal names in the wild: "2024-01-03 Wednesday" or the original Japanese
// diary form "2024年1月3日木曜日".
fn iso_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("date pattern compiles"))
}

fn kanji_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4})年(\d{1,2})月(\d{1,2})日").expect("date pattern compiles")
    })
}

/// Parse a date token out of a document name. Returns `None` when no token
/// matches or the matched digits are not a real calendar date.
pub fn date_from_name(name: &str) -> Option<NaiveDate> {
    let captures = kanji_pattern()
        .captures(name)
        .or_else(|| iso_pattern().captures(name))?;
    let year = captures.get(1)?.as_str().parse().ok()?;
    let month = captures.get(2)?.as_str().parse().ok()?;
    let day = captures.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Date used for range filtering: the name token when present, otherwise the
/// modification timestamp's date.
pub fn resolve_date(name: &str, modified_at: DateTime<Utc>) -> NaiveDate {
    match date_from_name(name) {
        Some(date) => date,
        None => {
            debug!(name, "No date token in document name, falling back to modification time");
            modified_at.date_naive()
        }
    }
}

/// List the source folder and keep documents dated inside the configured
/// range. The listing call is retried with bounded backoff for transient
/// store failures.
pub async fn find<S: DocumentStore>(
    store: &S,
    config: &RunConfig,
) -> Result<Vec<SourceDocument>, StoreAccessError> {
    info!(
        folder_id = %config.source_folder_id,
        start = %config.start,
        end = %config.end,
        "Locating documents in date range"
    );

    let entries = retry_with_backoff(RetryPolicy::default(), StoreAccessError::is_transient, || {
        store.list_folder(&config.source_folder_id)
    })
    .await?;

    let mut documents = Vec::new();
    for entry in entries {
        let resolved_date = resolve_date(&entry.name, entry.modified_at);
        if resolved_date >= config.start && resolved_date <= config.end {
            documents.push(SourceDocument {
                id: entry.id,
                name: entry.name,
                resolved_date,
                modified_at: entry.modified_at,
            });
        } else {
            debug!(name = %entry.name, date = %resolved_date, "Document outside requested range");
        }
    }

    info!(count = documents.len(), "Found documents in the requested date range");
    Ok(documents)
}

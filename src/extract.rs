//! Content Extractor: concurrent body fetches with the locator's order restored.
//!
//! Body reads run through a bounded ordered stream, so a slow document does not
//! serialize the run and the output order stays identical to discovery order
//! (chunk boundaries downstream depend on it). A failed read removes only that
//! document: the error is kept as a warning and the run continues.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::contract::{ContentReadError, DocumentStore, ExtractedDocument, SourceDocument};

/// Bounded fan-out for body fetches, within the store API's comfort zone.
pub const DEFAULT_CONCURRENT_FETCHES: usize = 4;

/// Extraction result: surviving documents in discovery order, plus one warning
/// per skipped document.
#[derive(Debug, Default)]
pub struct ExtractOutcome {
    pub documents: Vec<ExtractedDocument>,
    pub warnings: Vec<ContentReadError>,
}

pub async fn extract_all<S: DocumentStore>(
    store: &S,
    documents: Vec<SourceDocument>,
    concurrency: usize,
) -> ExtractOutcome {
    let total = documents.len();
    let fetches = documents.into_iter().map(|document| async move {
        match store.read_body(&document.id).await {
            Ok(body_text) => Ok(ExtractedDocument {
                document,
                body_text,
            }),
            Err(error) => Err((document, error)),
        }
    });

    // `buffered` (not `buffer_unordered`) keeps completion order aligned with
    // input order while still overlapping the fetches.
    let results: Vec<_> = stream::iter(fetches)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut outcome = ExtractOutcome::default();
    for result in results {
        match result {
            Ok(extracted) => outcome.documents.push(extracted),
            Err((document, error)) => {
                warn!(
                    document_id = %document.id,
                    name = %document.name,
                    error = %error,
                    "Skipping unreadable document"
                );
                outcome.warnings.push(error);
            }
        }
    }

    info!(
        requested = total,
        extracted = outcome.documents.len(),
        skipped = outcome.warnings.len(),
        "Content extraction complete"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockDocumentStore;
    use chrono::{DateTime, Utc};

    fn doc(id: &str) -> SourceDocument {
        SourceDocument {
            id: id.into(),
            name: format!("2024-01-0{} journal", id),
            resolved_date: format!("2024-01-0{id}").parse().unwrap(),
            modified_at: "2024-01-05T00:00:00Z".parse::<DateTime<Utc>>().unwrap(),
        }
    }

    #[tokio::test]
    async fn preserves_discovery_order() {
        let mut store = MockDocumentStore::new();
        store
            .expect_read_body()
            .times(3)
            .returning(|id| Ok(format!("body of {id}")));

        let outcome = extract_all(&store, vec![doc("1"), doc("2"), doc("3")], 2).await;
        let ids: Vec<_> = outcome
            .documents
            .iter()
            .map(|d| d.document.id.as_str())
            .collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(outcome.documents[0].body_text, "body of 1");
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn one_unreadable_document_does_not_abort_the_rest() {
        let mut store = MockDocumentStore::new();
        store.expect_read_body().times(3).returning(|id| {
            if id == "2" {
                Err(ContentReadError {
                    document_id: id.to_string(),
                    reason: "permission revoked".into(),
                })
            } else {
                Ok(format!("body of {id}"))
            }
        });

        let outcome = extract_all(&store, vec![doc("1"), doc("2"), doc("3")], 4).await;
        let ids: Vec<_> = outcome
            .documents
            .iter()
            .map(|d| d.document.id.as_str())
            .collect();
        assert_eq!(ids, ["1", "3"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].document_id, "2");
    }

    #[tokio::test]
    async fn zero_concurrency_is_clamped() {
        let mut store = MockDocumentStore::new();
        store.expect_read_body().returning(|_| Ok(String::new()));
        let outcome = extract_all(&store, vec![doc("1")], 0).await;
        assert_eq!(outcome.documents.len(), 1);
    }
}

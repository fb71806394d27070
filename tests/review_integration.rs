//! End-to-end pipeline tests against mock store and completer implementations.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use auto_reviewer::config::{Credentials, RunConfig};
use auto_reviewer::contract::{
    CompletionRequest, ContentReadError, GenerationError, MockCompleter, MockDocumentStore,
    StoreEntry,
};
use auto_reviewer::review::{review, ReviewError, Stage};

fn test_config() -> RunConfig {
    RunConfig {
        start: "2024-01-01".parse().unwrap(),
        end: "2024-01-07".parse().unwrap(),
        source_folder_id: "src-folder".into(),
        destination_folder_id: "dst-folder".into(),
        token_cache_path: "token.json".into(),
        credentials: Credentials {
            google_client_id: "client-id".into(),
            google_client_secret: "client-secret".into(),
            google_api_key: None,
            openai_api_key: "sk-test".into(),
        },
    }
}

fn entry(id: &str, name: &str, modified: &str) -> StoreEntry {
    StoreEntry {
        id: id.into(),
        name: name.into(),
        modified_at: modified.parse::<DateTime<Utc>>().unwrap(),
    }
}

fn three_entries() -> Vec<StoreEntry> {
    vec![
        entry("doc-1", "2024-01-02 Tuesday", "2024-01-02T21:00:00Z"),
        entry("doc-2", "2024-01-04 Thursday", "2024-01-04T21:00:00Z"),
        entry("doc-3", "2024-01-06 Saturday", "2024-01-06T21:00:00Z"),
    ]
}

#[tokio::test]
async fn publishes_echoed_chunks_in_discovery_order() {
    let mut store = MockDocumentStore::new();
    store
        .expect_list_folder()
        .withf(|folder_id| folder_id == "src-folder")
        .return_once(|_| Ok(three_entries()));
    // Large bodies force one chunk per document, so the echo stub fires once
    // per document and ordering is observable in the published body.
    store
        .expect_read_body()
        .times(3)
        .returning(|id| Ok(format!("entry {id} ").repeat(1400)));

    let prompts = Arc::new(Mutex::new(Vec::new()));
    let seen = prompts.clone();
    let mut completer = MockCompleter::new();
    let mut call = 0;
    completer
        .expect_complete()
        .times(3)
        .returning(move |req: CompletionRequest<'_>| {
            call += 1;
            seen.lock().unwrap().push(req.user_prompt.to_string());
            Ok(format!("ECHO-{call}"))
        });

    store
        .expect_create_document()
        .times(1)
        .withf(|folder, name, body| {
            folder == "dst-folder"
                && name == "Report_2024-01-01_2024-01-07"
                && body == "ECHO-1\n\nECHO-2\n\nECHO-3"
        })
        .returning(|_, _, _| Ok("report-doc".to_string()));

    let outcome = review(&test_config(), &store, &completer)
        .await
        .expect("pipeline succeeds");

    let published = outcome.published.expect("a report was published");
    assert_eq!(published.document_id, "report-doc");
    assert_eq!(published.folder_id, "dst-folder");
    assert_eq!(outcome.located, 3);
    assert!(outcome.skipped.is_empty());

    // Chunks were requested in discovery order.
    let prompts = prompts.lock().unwrap();
    assert!(prompts[0].contains("doc-1"));
    assert!(prompts[1].contains("doc-2"));
    assert!(prompts[2].contains("doc-3"));
}

#[tokio::test]
async fn unreadable_document_is_skipped_but_the_run_publishes() {
    let mut store = MockDocumentStore::new();
    store
        .expect_list_folder()
        .return_once(|_| Ok(three_entries()));
    store.expect_read_body().times(3).returning(|id| {
        if id == "doc-2" {
            Err(ContentReadError {
                document_id: id.to_string(),
                reason: "permission revoked".into(),
            })
        } else {
            Ok(format!("short entry from {id}"))
        }
    });

    let mut completer = MockCompleter::new();
    completer
        .expect_complete()
        .times(1)
        .returning(|req: CompletionRequest<'_>| {
            assert!(req.user_prompt.contains("doc-1"));
            assert!(
                !req.user_prompt.contains("short entry from doc-2"),
                "skipped document must not reach the model"
            );
            assert!(req.user_prompt.contains("doc-3"));
            Ok("partial-coverage review".to_string())
        });

    store
        .expect_create_document()
        .times(1)
        .withf(|_, _, body| body == "partial-coverage review")
        .returning(|_, _, _| Ok("report-doc".to_string()));

    let outcome = review(&test_config(), &store, &completer)
        .await
        .expect("pipeline tolerates one unreadable document");

    assert!(outcome.published.is_some());
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].document_id, "doc-2");
}

#[tokio::test]
async fn publisher_is_never_called_when_generation_fails() {
    let mut store = MockDocumentStore::new();
    store
        .expect_list_folder()
        .return_once(|_| Ok(three_entries()));
    store
        .expect_read_body()
        .times(3)
        .returning(|id| Ok(format!("entry {id}")));
    store.expect_create_document().times(0);

    let mut completer = MockCompleter::new();
    completer
        .expect_complete()
        .times(1)
        .returning(|_req: CompletionRequest<'_>| {
            Err(GenerationError::Rejected("content policy".into()))
        });

    let err = review(&test_config(), &store, &completer)
        .await
        .expect_err("generation failure is fatal");
    assert_eq!(err.stage(), Stage::Generating);
    assert!(matches!(err, ReviewError::Generate(_)));
}

#[tokio::test]
async fn empty_folder_is_a_successful_noop() {
    let mut store = MockDocumentStore::new();
    store.expect_list_folder().return_once(|_| Ok(vec![]));
    store.expect_read_body().times(0);
    store.expect_create_document().times(0);

    let completer = MockCompleter::new();

    let outcome = review(&test_config(), &store, &completer)
        .await
        .expect("empty range is not an error");
    assert!(outcome.published.is_none());
    assert_eq!(outcome.located, 0);
}

#[tokio::test]
async fn run_does_not_publish_when_every_extraction_fails() {
    let mut store = MockDocumentStore::new();
    store
        .expect_list_folder()
        .return_once(|_| Ok(three_entries()));
    store.expect_read_body().times(3).returning(|id| {
        Err(ContentReadError {
            document_id: id.to_string(),
            reason: "gone".into(),
        })
    });
    store.expect_create_document().times(0);

    let completer = MockCompleter::new();

    let outcome = review(&test_config(), &store, &completer)
        .await
        .expect("still not fatal");
    assert!(outcome.published.is_none());
    assert_eq!(outcome.located, 3);
    assert_eq!(outcome.skipped.len(), 3);
}

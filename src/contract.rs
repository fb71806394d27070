//! # contract: shared data model, store/completer interfaces and error taxonomy
//!
//! This module defines the types flowing through the review pipeline and the two
//! traits the pipeline depends on:
//!
//! - [`DocumentStore`]: list a folder, read a document body, create a document.
//!   Implemented by the real Drive/Docs client and by test mocks.
//! - [`Completer`]: one language-model completion request.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests (exported behind the
//!   `test-export-mocks` feature, which is on by default).
//!
//! ## Error taxonomy
//! Each pipeline stage has its own error type with a fixed retry policy:
//! - [`ConfigError`]: bad or missing input, fatal, never retried.
//! - [`StoreAccessError`]: listing/auth/transport failure; transient variants are
//!   retried with bounded backoff, then fatal.
//! - [`ContentReadError`]: per-document read failure; skip-and-warn, never fatal.
//! - [`GenerationError`]: completion failure; transient variants retried, then fatal.
//! - [`PublishError`]: document creation failure; fatal and never retried, since a
//!   repeated create could leave an orphan duplicate document behind.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// A folder listing entry as returned by the store, before date filtering.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    pub id: String,
    pub name: String,
    pub modified_at: DateTime<Utc>,
}

/// A document selected by the locator. Metadata only; the body is attached by the
/// extractor as a transition to [`ExtractedDocument`].
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub id: String,
    pub name: String,
    /// Date parsed from the document name, or the modification date when the
    /// name carries no date token.
    pub resolved_date: NaiveDate,
    pub modified_at: DateTime<Utc>,
}

/// A located document with its full text body.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub document: SourceDocument,
    pub body_text: String,
}

/// The assembled report before publication. Owned by the generator until it is
/// handed to the publisher; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ReportDraft {
    /// Ids of the documents that contributed to the report, in discovery order.
    pub source_document_ids: Vec<String>,
    pub generated_text: String,
}

/// Terminal artifact of a successful run.
#[derive(Debug, Clone)]
pub struct PublishedReport {
    pub document_id: String,
    pub folder_id: String,
}

/// One completion request: a fixed system prompt plus the rendered user prompt.
pub struct CompletionRequest<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid date `{value}` for {flag}: expected YYYY-MM-DD")]
    InvalidDate { flag: &'static str, value: String },
    #[error("date range start {start} is after end {end}")]
    ReversedRange { start: NaiveDate, end: NaiveDate },
    #[error("missing required configuration `{key}` (flag or environment)")]
    Missing { key: &'static str },
    #[error("token cache `{path}` not found; complete the OAuth consent flow first to create it")]
    TokenCacheMissing { path: String },
    #[error("token cache `{path}` unreadable: {reason}")]
    TokenCacheInvalid { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreAccessError {
    #[error("store authentication failed: {0}")]
    Auth(String),
    #[error("store request failed with status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("store unreachable: {0}")]
    Network(String),
}

impl StoreAccessError {
    /// Rate limits, server errors and transport failures may heal on retry;
    /// rejected credentials will not.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreAccessError::Auth(_) => false,
            StoreAccessError::Http { status, .. } => *status == 429 || *status >= 500,
            StoreAccessError::Network(_) => true,
        }
    }
}

/// Failure to read one document's body. Scoped to that document: the run
/// continues without it.
#[derive(Debug, Error)]
#[error("document {document_id} unreadable: {reason}")]
pub struct ContentReadError {
    pub document_id: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("completion endpoint unavailable: {0}")]
    Transient(String),
    #[error("completion request rejected: {0}")]
    Rejected(String),
    #[error("completion response contained no content")]
    EmptyResponse,
}

impl GenerationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transient(_))
    }
}

/// Failure to create the report document. Never retried: the create may have
/// succeeded server-side, and repeating it could orphan a duplicate report.
#[derive(Debug, Error)]
#[error("failed to create report document in folder {folder_id}: {reason}")]
pub struct PublishError {
    pub folder_id: String,
    pub reason: String,
}

/// Interface to the document store (folder listing, body reads, document
/// creation). Implemented by the Drive/Docs client and by test mocks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List all candidate documents directly under `folder_id` (metadata only).
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<StoreEntry>, StoreAccessError>;

    /// Read the full text body of one document.
    async fn read_body(&self, document_id: &str) -> Result<String, ContentReadError>;

    /// Create a new document under `folder_id` with the given name and body,
    /// returning the new document's id.
    async fn create_document(
        &self,
        folder_id: &str,
        name: &str,
        body: &str,
    ) -> Result<String, PublishError>;
}

/// Interface to the language-model completion endpoint.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Completer: Send + Sync {
    /// Issue one completion request and return the generated text.
    async fn complete<'a>(&self, req: CompletionRequest<'a>) -> Result<String, GenerationError>;
}

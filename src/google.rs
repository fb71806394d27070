//! Drive/Docs implementation of [`DocumentStore`] over the REST APIs.
//!
//! Listing goes through Drive v3 `files.list` with a parent-folder query and
//! `pageToken` pagination; bodies come from Docs v1 `documents.get`, walking
//! the paragraph text runs; publication is a Drive `files.create` followed by
//! a Docs `batchUpdate` with a single `insertText` request.
//!
//! The OAuth token comes from the injected [`TokenProvider`]. A 401 response
//! triggers one token refresh and one resend; a second rejection surfaces as
//! an authentication error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::auth::TokenProvider;
use crate::contract::{
    ContentReadError, DocumentStore, PublishError, StoreAccessError, StoreEntry,
};

const DRIVE_FILES_ENDPOINT: &str = "https://www.googleapis.com/drive/v3/files";
const DOCS_ENDPOINT: &str = "https://docs.googleapis.com/v1/documents";
const DOCS_MIME_TYPE: &str = "application/vnd.google-apps.document";
const PAGE_SIZE: &str = "100";

pub struct GoogleDriveStore {
    http: Client,
    auth: TokenProvider,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
    name: String,
    #[serde(rename = "modifiedTime")]
    modified_time: Option<String>,
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
}

impl GoogleDriveStore {
    pub fn new(auth: TokenProvider, api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            auth,
            api_key,
        }
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    /// Send a request built against the current access token; on 401, refresh
    /// the token once and resend.
    async fn execute<F>(&self, build: F) -> Result<Response, StoreAccessError>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let token = self.auth.access_token().await?;
        let response = build(&self.http, &token)
            .send()
            .await
            .map_err(|e| StoreAccessError::Network(e.to_string()))?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("Store rejected the access token; refreshing and retrying once");
        let token = self.auth.invalidate().await?;
        build(&self.http, &token)
            .send()
            .await
            .map_err(|e| StoreAccessError::Network(e.to_string()))
    }
}

async fn failure_message(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<unreadable body>"))
}

fn store_error(status: StatusCode, message: String) -> StoreAccessError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        StoreAccessError::Auth(format!("{status}: {message}"))
    } else {
        StoreAccessError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

/// Concatenate the paragraph text runs of a Docs body, in document order.
/// Non-text structural elements (tables of contents, images, section breaks)
/// are skipped rather than erroring.
pub(crate) fn document_text(document: &Value) -> String {
    let mut text = String::new();
    let content = document
        .get("body")
        .and_then(|body| body.get("content"))
        .and_then(|content| content.as_array());
    let Some(elements) = content else {
        return text;
    };
    for element in elements {
        let runs = element
            .get("paragraph")
            .and_then(|p| p.get("elements"))
            .and_then(|e| e.as_array());
        let Some(runs) = runs else { continue };
        for run in runs {
            if let Some(fragment) = run
                .get("textRun")
                .and_then(|t| t.get("content"))
                .and_then(|c| c.as_str())
            {
                text.push_str(fragment);
            }
        }
    }
    text
}

fn parse_modified_time(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        // Epoch keeps an undated file out of any realistic range.
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[async_trait]
impl DocumentStore for GoogleDriveStore {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<StoreEntry>, StoreAccessError> {
        let query = format!(
            "'{folder_id}' in parents and mimeType='{DOCS_MIME_TYPE}' and trashed=false"
        );
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self
                .execute(|http, token| {
                    let mut request = http
                        .get(DRIVE_FILES_ENDPOINT)
                        .bearer_auth(token)
                        .query(&[
                            ("q", query.as_str()),
                            ("fields", "nextPageToken, files(id, name, modifiedTime)"),
                            ("pageSize", PAGE_SIZE),
                        ]);
                    if let Some(cursor) = page_token.as_deref() {
                        request = request.query(&[("pageToken", cursor)]);
                    }
                    self.with_key(request)
                })
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(store_error(status, failure_message(response).await));
            }
            let page: FileList = response
                .json()
                .await
                .map_err(|e| StoreAccessError::Network(e.to_string()))?;

            for file in page.files {
                entries.push(StoreEntry {
                    modified_at: parse_modified_time(file.modified_time.as_deref()),
                    id: file.id,
                    name: file.name,
                });
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        info!(count = entries.len(), folder_id, "Listed candidate documents");
        Ok(entries)
    }

    async fn read_body(&self, document_id: &str) -> Result<String, ContentReadError> {
        let read_error = |reason: String| ContentReadError {
            document_id: document_id.to_string(),
            reason,
        };

        let url = format!("{DOCS_ENDPOINT}/{document_id}");
        let response = self
            .execute(|http, token| self.with_key(http.get(&url).bearer_auth(token)))
            .await
            .map_err(|e| read_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = failure_message(response).await;
            return Err(read_error(format!("{status}: {message}")));
        }

        let document: Value = response
            .json()
            .await
            .map_err(|e| read_error(e.to_string()))?;
        Ok(document_text(&document))
    }

    async fn create_document(
        &self,
        folder_id: &str,
        name: &str,
        body: &str,
    ) -> Result<String, PublishError> {
        let publish_error = |reason: String| PublishError {
            folder_id: folder_id.to_string(),
            reason,
        };

        let metadata = json!({
            "name": name,
            "mimeType": DOCS_MIME_TYPE,
            "parents": [folder_id],
        });
        let response = self
            .execute(|http, token| {
                self.with_key(
                    http.post(DRIVE_FILES_ENDPOINT)
                        .bearer_auth(token)
                        .query(&[("fields", "id")])
                        .json(&metadata),
                )
            })
            .await
            .map_err(|e| publish_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = failure_message(response).await;
            return Err(publish_error(format!("create failed, {status}: {message}")));
        }
        let created: CreatedFile = response
            .json()
            .await
            .map_err(|e| publish_error(e.to_string()))?;

        if !body.is_empty() {
            let update = json!({
                "requests": [
                    { "insertText": { "location": { "index": 1 }, "text": body } }
                ]
            });
            let url = format!("{DOCS_ENDPOINT}/{}:batchUpdate", created.id);
            let response = self
                .execute(|http, token| {
                    self.with_key(http.post(&url).bearer_auth(token).json(&update))
                })
                .await
                .map_err(|e| publish_error(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let message = failure_message(response).await;
                return Err(publish_error(format!(
                    "created document {} but writing the body failed, {status}: {message}",
                    created.id
                )));
            }
        }

        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_text_concatenates_runs_in_order() {
        let document = json!({
            "body": {
                "content": [
                    { "paragraph": { "elements": [
                        { "textRun": { "content": "Hello " } },
                        { "textRun": { "content": "World" } }
                    ] } },
                    { "paragraph": { "elements": [
                        { "textRun": { "content": "\nAnother line" } }
                    ] } }
                ]
            }
        });
        assert_eq!(document_text(&document), "Hello World\nAnother line");
    }

    #[test]
    fn document_text_skips_non_text_elements() {
        let document = json!({
            "body": {
                "content": [
                    { "sectionBreak": {} },
                    { "table": { "rows": 2 } },
                    { "paragraph": { "elements": [
                        { "inlineObjectElement": { "inlineObjectId": "img1" } },
                        { "textRun": { "content": "text survives" } }
                    ] } }
                ]
            }
        });
        assert_eq!(document_text(&document), "text survives");
    }

    #[test]
    fn document_text_of_empty_document_is_empty() {
        assert_eq!(document_text(&json!({})), "");
    }

    #[test]
    fn modified_time_parses_rfc3339() {
        let parsed = parse_modified_time(Some("2024-01-03T08:15:00.000Z"));
        assert_eq!(parsed.date_naive(), "2024-01-03".parse().unwrap());
    }

    #[test]
    fn missing_modified_time_falls_back_to_epoch() {
        assert_eq!(parse_modified_time(None), DateTime::UNIX_EPOCH);
        assert_eq!(parse_modified_time(Some("garbage")), DateTime::UNIX_EPOCH);
    }
}

//! Transcript Storage
//!
//! Defines the storage contract used by the quota guard and the transcript
//! uploader, and a Dropbox implementation of it over the HTTP API.

use crate::token::TokenProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};

pub const DEFAULT_API_URL: &str = "https://api.dropboxapi.com";
pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com";

/// A non-success answer from the storage service.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{operation} returned status {status}: {body}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },
}

/// The remote folder transcripts are written to.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Names of every file (not folder) currently in the transcript folder.
    async fn list_files(&self) -> Result<Vec<String>>;

    /// Writes `bytes` as `name` inside the folder. `Ok(false)` means the
    /// service answered but did not accept the upload.
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<bool>;
}

#[derive(Serialize)]
struct ListFolderArgs<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct ListFolderContinueArgs<'a> {
    cursor: &'a str,
}

#[derive(Deserialize, Debug)]
struct FolderEntry {
    #[serde(rename = ".tag")]
    tag: String,
    name: String,
}

#[derive(Deserialize, Debug)]
struct ListFolderResponse {
    entries: Vec<FolderEntry>,
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Serialize)]
struct UploadArgs<'a> {
    path: &'a str,
    mode: &'a str,
    autorename: bool,
    mute: bool,
}

/// Dropbox-backed transcript folder.
pub struct DropboxStore {
    http: Client,
    tokens: Arc<dyn TokenProvider>,
    api_url: String,
    content_url: String,
    folder: String,
}

impl DropboxStore {
    /// Creates a store for `folder` (e.g. `/interview_transcripts`).
    pub fn new(
        http: Client,
        tokens: Arc<dyn TokenProvider>,
        api_url: impl Into<String>,
        content_url: impl Into<String>,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            content_url: content_url.into().trim_end_matches('/').to_string(),
            folder: folder.into().trim_end_matches('/').to_string(),
        }
    }

    async fn list_page<T: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        endpoint: &str,
        token: &str,
        body: &T,
    ) -> Result<ListFolderResponse> {
        let url = format!("{}/2/files/{}", self.api_url, endpoint);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", operation))?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, operation, "Storage listing failed");
            return Err(StorageError::Status {
                operation,
                status,
                body,
            }
            .into());
        }

        response
            .json::<ListFolderResponse>()
            .await
            .with_context(|| format!("Failed to parse {} response", operation))
    }
}

#[async_trait]
impl TranscriptStore for DropboxStore {
    #[instrument(skip(self), fields(folder = %self.folder))]
    async fn list_files(&self) -> Result<Vec<String>> {
        let token = self.tokens.access_token().await?;
        let mut page = self
            .list_page(
                "list_folder",
                "list_folder",
                &token,
                &ListFolderArgs { path: &self.folder },
            )
            .await?;

        let mut names = Vec::new();
        loop {
            names.extend(
                page.entries
                    .into_iter()
                    .filter(|e| e.tag == "file")
                    .map(|e| e.name),
            );
            match (page.has_more, page.cursor) {
                (true, Some(cursor)) => {
                    page = self
                        .list_page(
                            "list_folder/continue",
                            "list_folder/continue",
                            &token,
                            &ListFolderContinueArgs { cursor: &cursor },
                        )
                        .await?;
                }
                _ => break,
            }
        }

        debug!(count = names.len(), "Listed transcript folder");
        Ok(names)
    }

    #[instrument(skip(self, bytes), fields(folder = %self.folder, size = bytes.len()))]
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<bool> {
        let token = self.tokens.access_token().await?;
        let path = format!("{}/{}", self.folder, name);
        let api_arg = serde_json::to_string(&UploadArgs {
            path: &path,
            mode: "add",
            autorename: true,
            mute: false,
        })?;

        let response = self
            .http
            .post(format!("{}/2/files/upload", self.content_url))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header("Dropbox-API-Arg", api_arg)
            .body(bytes)
            .send()
            .await
            .context("Failed to send upload request")?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, %path, "Upload rejected by storage service");
            return Ok(false);
        }
        debug!(%path, "Upload accepted");
        Ok(true)
    }
}

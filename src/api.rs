//! HTTP client for the backend's REST endpoints: collections, documents and
//! the application log store.

use std::path::Path;

use reqwest::multipart;
use serde::de::DeserializeOwned;

use crate::error::ChatError;
use crate::history::LogStore;
use crate::protocol::{ApplicationLog, DeleteFileRequest, DeleteResponse, DocumentInfo, UploadResponse};

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path (which may already carry a query string).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `POST /upload-doc` with the file as multipart field `file`.
    pub async fn upload_document(&self, path: &Path) -> Result<UploadResponse, ChatError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        tracing::info!(file = %file_name, size = bytes.len(), "uploading document");
        let form = multipart::Form::new().part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let url = self.url("/upload-doc");
        let request = self.client.post(&url).multipart(form);
        self.send_json(&url, request).await
    }

    /// `GET /list-collections`
    pub async fn list_collections(&self) -> Result<Vec<String>, ChatError> {
        self.get_json("/list-collections").await
    }

    /// `GET /list-docs`
    pub async fn list_documents(&self) -> Result<Vec<DocumentInfo>, ChatError> {
        self.get_json("/list-docs").await
    }

    /// `POST /delete-doc`
    pub async fn delete_document(&self, file_id: &str) -> Result<DeleteResponse, ChatError> {
        let url = self.url("/delete-doc");
        let request = self.client.post(&url).json(&DeleteFileRequest {
            file_id: file_id.to_string(),
        });
        self.send_json(&url, request).await
    }

    /// `GET /get-application-logs?session_id=...`
    pub async fn application_logs_for(&self, session_id: &str) -> Result<Vec<ApplicationLog>, ChatError> {
        let url = self.url("/get-application-logs");
        let request = self.client.get(&url).query(&session_query(session_id));
        self.send_json(&url, request).await
    }

    /// `GET /get-latest-application-logs`: the newest turn of each session.
    pub async fn latest_application_logs(&self) -> Result<Vec<ApplicationLog>, ChatError> {
        self.get_json("/get-latest-application-logs").await
    }

    /// `POST /delete-application-logs?session_id=...`
    pub async fn delete_application_logs(&self, session_id: &str) -> Result<Vec<ApplicationLog>, ChatError> {
        let url = self.url("/delete-application-logs");
        let request = self.client.post(&url).query(&session_query(session_id));
        self.send_json(&url, request).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ChatError> {
        let url = self.url(path);
        let request = self.client.get(&url);
        self.send_json(&url, request).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ChatError> {
        tracing::debug!(url, "request");
        let resp = request.send().await.map_err(|e| ChatError::request(url, e))?;
        if !resp.status().is_success() {
            return Err(ChatError::Http {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = resp.bytes().await.map_err(|e| ChatError::request(url, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// `session_id` query pair; an empty id sends no parameter at all.
fn session_query(session_id: &str) -> Vec<(&'static str, &str)> {
    if session_id.is_empty() {
        Vec::new()
    } else {
        vec![("session_id", session_id)]
    }
}

impl LogStore for ApiClient {
    async fn application_logs(&self, session_id: &str) -> Result<Vec<ApplicationLog>, ChatError> {
        self.application_logs_for(session_id).await
    }
}

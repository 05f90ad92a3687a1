//! HTTP client for the workbench backend.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{
    ConnectionPayload, ConversationSummary, FileItem, FileListRequest, FileListResponse,
    ModelInfo, ModelsRequest, ModelsResponse, TestConnectionRequest, TestConnectionResult,
    CONVERSATIONS_ENDPOINT, FILES_LIST_ENDPOINT, MODELS_ENDPOINT, TEST_CONNECTION_ENDPOINT,
};
use crate::core::stream::{ByteStream, Transport, TransportError};
use crate::utils::url::construct_api_url;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend returned {status}: {detail}")]
    Status { status: u16, detail: String },
}

#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        construct_api_url(&self.base_url, endpoint)
    }

    async fn send_json<B, R>(&self, endpoint: &str, body: Option<&B>) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(endpoint);
        let request = match body {
            Some(body) => self.client.post(&url).json(body),
            None => self.client.get(&url),
        };
        debug!(%url, "backend request");

        let response = request.send().await.map_err(|source| ApiError::Request {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: summarize_error_body(&text),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|source| ApiError::Request { url, source })
    }

    pub async fn list_models(&self, request: &ModelsRequest) -> Result<Vec<ModelInfo>, ApiError> {
        let response: ModelsResponse = self.send_json(MODELS_ENDPOINT, Some(request)).await?;
        Ok(response.models)
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ApiError> {
        self.send_json::<(), _>(CONVERSATIONS_ENDPOINT, None).await
    }

    pub async fn test_connection(
        &self,
        connection: ConnectionPayload,
    ) -> Result<TestConnectionResult, ApiError> {
        let request = TestConnectionRequest {
            connection,
            path: "/".to_string(),
            timeout_seconds: 5,
        };
        self.send_json(TEST_CONNECTION_ENDPOINT, Some(&request))
            .await
    }

    pub async fn list_files(
        &self,
        connection: ConnectionPayload,
        path: impl Into<String>,
    ) -> Result<Vec<FileItem>, ApiError> {
        let request = FileListRequest {
            connection,
            path: path.into(),
            depth: 1,
        };
        let response: FileListResponse =
            self.send_json(FILES_LIST_ENDPOINT, Some(&request)).await?;
        Ok(response.items)
    }
}

#[async_trait]
impl Transport for BackendClient {
    async fn open(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<ByteStream, TransportError> {
        let url = self.url(endpoint);
        debug!(%url, "opening event stream");

        let response = self
            .client
            .post(&url)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // The body of a failed response has no agreed format; it is only
            // summarised for the error message, never decoded as frames.
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                detail: summarize_error_body(&text),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed())
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .or_else(|| value.get("detail").and_then(|v| v.as_str()))
        .or_else(|| value.get("message").and_then(|v| v.as_str()))
        .map(collapse_whitespace)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One-line description of an error response body.
pub(crate) fn summarize_error_body(body: &str) -> String {
    const MAX_CHARS: usize = 200;

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json).filter(|s| !s.is_empty()) {
            return summary;
        }
    }

    let collapsed = collapse_whitespace(trimmed);
    if collapsed.chars().count() > MAX_CHARS {
        let cut: String = collapsed.chars().take(MAX_CHARS).collect();
        format!("{cut}…")
    } else {
        collapsed
    }
}

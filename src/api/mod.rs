use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod client;

pub use client::{ApiError, BackendClient};

pub const CHAT_STREAM_ENDPOINT: &str = "api/chat/stream";
pub const EXEC_STREAM_ENDPOINT: &str = "api/private-server/exec/stream";
pub const MODELS_ENDPOINT: &str = "api/providers/models";
pub const CONVERSATIONS_ENDPOINT: &str = "api/conversations";
pub const TEST_CONNECTION_ENDPOINT: &str = "api/private-server/test-connection";
pub const FILES_LIST_ENDPOINT: &str = "api/private-server/files/list";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub provider: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Transport mode of the private development server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[default]
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "HTTPS")]
    Https,
    #[serde(rename = "SSE")]
    Sse,
    #[serde(rename = "WebSocket")]
    WebSocket,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [
        Protocol::Http,
        Protocol::Https,
        Protocol::Sse,
        Protocol::WebSocket,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
            Protocol::Sse => "SSE",
            Protocol::WebSocket => "WebSocket",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|protocol| protocol.as_str().eq_ignore_ascii_case(value))
    }
}

/// Connection block sent with every private-server request. Blank settings
/// travel as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionPayload {
    pub enabled: bool,
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub token: Option<String>,
    pub protocol: Protocol,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecRequest {
    pub connection: ConnectionPayload,
    pub command: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestConnectionRequest {
    #[serde(flatten)]
    pub connection: ConnectionPayload,
    pub path: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestConnectionResult {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileListRequest {
    pub connection: ConnectionPayload,
    pub path: String,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileItem {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct FileListResponse {
    #[serde(default)]
    pub items: Vec<FileItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsRequest {
    pub provider: String,
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

/// Entry of the read-only conversation history.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationSummary {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConversationSummary {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or("Untitled")
    }
}

/// RFC 3339, or a naive ISO timestamp read as UTC. Anything else reads as
/// missing.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let serde_json::Value::String(raw) = serde_json::Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok());
    Ok(naive.map(|naive| naive.and_utc()))
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

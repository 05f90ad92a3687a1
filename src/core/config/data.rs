use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::Protocol;
use crate::core::agents::AgentRoster;
use crate::core::providers::{DEFAULT_MODEL, DEFAULT_PROVIDER, DEFAULT_PROVIDER_BASE_URL};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Upstream LLM provider used for chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub provider: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Private development server used by the terminal and file browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivateServer {
    pub enabled: bool,
    pub name: String,
    pub host: String,
    pub port: Option<u16>,
    pub username: String,
    pub token: String,
    pub protocol: Protocol,
    pub base_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Fail a stream when no bytes arrive for this many seconds.
    pub idle_timeout_secs: Option<u64>,
    /// Treat an undelimited remainder at end of stream as a final frame.
    pub flush_trailing_frame: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL (e.g., "http://localhost:8000")
    pub backend_url: Option<String>,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub private_server: PrivateServer,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub agents: AgentRoster,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.config/flames/config.toml` → `~/.config/flames/config.toml`
/// - macOS: `/Users/user/Library/Application Support/...` → `~/Library/Application Support/...`
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

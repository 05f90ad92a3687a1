use std::time::Duration;

use crate::api::{ConnectionPayload, Protocol};
use crate::core::config::data::{Config, PrivateServer, StreamSettings, DEFAULT_BACKEND_URL};
use crate::core::config::io::ConfigError;
use crate::core::stream::{SessionOptions, TrailingFrame};

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl Config {
    /// Backend URL with precedence: explicit override, then config, then the
    /// built-in default.
    pub fn resolve_backend_url(&self, override_url: Option<&str>) -> String {
        override_url
            .and_then(non_blank)
            .or_else(|| self.backend_url.as_deref().and_then(non_blank))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
    }

    /// Update a single setting addressed by its dotted key.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        match key {
            "backend-url" => self.backend_url = non_blank(value),
            "provider" => self.provider.provider = value.trim().to_lowercase(),
            "model" => self.provider.model = value.trim().to_string(),
            "provider.base-url" => self.provider.base_url = value.trim().to_string(),
            "provider.api-key" => self.provider.api_key = value.trim().to_string(),
            "server.enabled" => {
                self.private_server.enabled =
                    parse_bool(value).ok_or_else(|| invalid("expected on/off"))?
            }
            "server.name" => self.private_server.name = value.trim().to_string(),
            "server.host" => self.private_server.host = value.trim().to_string(),
            "server.port" => {
                self.private_server.port = match non_blank(value) {
                    None => None,
                    Some(port) => Some(
                        port.parse()
                            .map_err(|_| invalid("expected a port number"))?,
                    ),
                }
            }
            "server.username" => self.private_server.username = value.trim().to_string(),
            "server.token" => self.private_server.token = value.trim().to_string(),
            "server.protocol" => {
                self.private_server.protocol = Protocol::parse(value.trim())
                    .ok_or_else(|| invalid("expected HTTP, HTTPS, SSE or WebSocket"))?
            }
            "server.base-url" => self.private_server.base_url = value.trim().to_string(),
            "stream.idle-timeout" => {
                self.stream.idle_timeout_secs = match non_blank(value) {
                    None => None,
                    Some(secs) => match secs.parse::<u64>() {
                        Ok(0) => None,
                        Ok(secs) => Some(secs),
                        Err(_) => return Err(invalid("expected whole seconds")),
                    },
                }
            }
            "stream.flush-trailing-frame" => {
                self.stream.flush_trailing_frame =
                    parse_bool(value).ok_or_else(|| invalid("expected on/off"))?
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

impl PrivateServer {
    /// Wire form: blank settings become `null`.
    pub fn to_payload(&self) -> ConnectionPayload {
        ConnectionPayload {
            enabled: self.enabled,
            name: non_blank(&self.name),
            host: non_blank(&self.host),
            port: self.port,
            username: non_blank(&self.username),
            token: non_blank(&self.token),
            protocol: self.protocol,
            base_url: non_blank(&self.base_url),
        }
    }
}

impl StreamSettings {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            idle_timeout: self.idle_timeout_secs.map(Duration::from_secs),
            trailing: if self.flush_trailing_frame {
                TrailingFrame::Flush
            } else {
                TrailingFrame::Discard
            },
        }
    }
}

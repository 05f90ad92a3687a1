use crate::core::config::data::Config;

fn masked(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(unset)"
    } else {
        "********"
    }
}

fn or_unset(value: &str) -> &str {
    if value.trim().is_empty() {
        "(unset)"
    } else {
        value
    }
}

impl Config {
    pub fn render_all(&self, backend_url: &str) -> String {
        let server = &self.private_server;
        let mut lines = vec![
            "Current configuration:".to_string(),
            format!("  backend-url: {backend_url}"),
            format!("  provider: {}", self.provider.provider),
            format!("  model: {}", self.provider.model),
            format!("  provider.base-url: {}", or_unset(&self.provider.base_url)),
            format!("  provider.api-key: {}", masked(&self.provider.api_key)),
            format!(
                "  server.enabled: {}",
                if server.enabled { "on" } else { "off" }
            ),
            format!("  server.name: {}", or_unset(&server.name)),
            format!("  server.host: {}", or_unset(&server.host)),
            match server.port {
                Some(port) => format!("  server.port: {port}"),
                None => "  server.port: (unset)".to_string(),
            },
            format!("  server.username: {}", or_unset(&server.username)),
            format!("  server.token: {}", masked(&server.token)),
            format!("  server.protocol: {}", server.protocol.as_str()),
            format!("  server.base-url: {}", or_unset(&server.base_url)),
        ];

        lines.push(match self.stream.idle_timeout_secs {
            Some(secs) => format!("  stream.idle-timeout: {secs}s"),
            None => "  stream.idle-timeout: (none)".to_string(),
        });
        lines.push(format!(
            "  stream.flush-trailing-frame: {}",
            if self.stream.flush_trailing_frame {
                "on"
            } else {
                "off"
            }
        ));
        lines.push(format!(
            "  agents: {} ({} mode)",
            self.agents.agents.len(),
            self.agents.mode.as_str()
        ));
        lines.join("\n")
    }

    pub fn print_all(&self, backend_url: &str) {
        println!("{}", self.render_all(backend_url));
    }
}

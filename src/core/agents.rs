//! Multi-agent roster persisted alongside the rest of the configuration.

use serde::{Deserialize, Serialize};

use crate::core::providers::{DEFAULT_MODEL, DEFAULT_PROVIDER};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const MAX_TEMPERATURE: f32 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Parallel,
    Sequential,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Parallel => "parallel",
            RunMode::Sequential => "sequential",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "parallel" => Some(RunMode::Parallel),
            "sequential" => Some(RunMode::Sequential),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub system: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Whether the agent may run concurrently with others.
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_true() -> bool {
    true
}

impl Agent {
    fn with_defaults(id: String, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            parallel: true,
            active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentRoster {
    pub mode: RunMode,
    pub agents: Vec<Agent>,
}

impl Default for AgentRoster {
    fn default() -> Self {
        let mut roster = Self {
            mode: RunMode::default(),
            agents: Vec::new(),
        };
        roster.add("Agent");
        roster.add("Reviewer");
        roster
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "agent".to_string()
    } else {
        slug.to_string()
    }
}

impl AgentRoster {
    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    pub fn active(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().filter(|agent| agent.active)
    }

    /// Append an agent with default settings. Blank names fall back to "Agent".
    pub fn add(&mut self, name: &str) -> &mut Agent {
        let name = match name.trim() {
            "" => "Agent",
            trimmed => trimmed,
        };
        let id = self.unique_id(&slugify(name));
        self.agents.push(Agent::with_defaults(id, name));
        let last = self.agents.len() - 1;
        &mut self.agents[last]
    }

    pub fn remove(&mut self, id: &str) -> Option<Agent> {
        let index = self.agents.iter().position(|agent| agent.id == id)?;
        Some(self.agents.remove(index))
    }

    /// Apply `patch` to the agent with `id`. The temperature is clamped to
    /// `0.0..=2.0` afterwards and the id cannot be changed.
    pub fn update(&mut self, id: &str, patch: impl FnOnce(&mut Agent)) -> bool {
        let Some(agent) = self.agents.iter_mut().find(|agent| agent.id == id) else {
            return false;
        };
        let id = agent.id.clone();
        patch(agent);
        agent.id = id;
        agent.temperature = clamp_temperature(agent.temperature);
        true
    }

    fn unique_id(&self, base: &str) -> String {
        if self.get(base).is_none() {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| self.get(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }
}

fn clamp_temperature(value: f32) -> f32 {
    if value.is_nan() {
        DEFAULT_TEMPERATURE
    } else {
        value.clamp(0.0, MAX_TEMPERATURE)
    }
}

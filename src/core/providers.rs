//! Catalogue of upstream providers the backend can relay chat to.

use crate::api::ModelInfo;

pub const DEFAULT_PROVIDER: &str = "openrouter";
pub const DEFAULT_MODEL: &str = "openrouter/openai/gpt-4o";
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub display_name: &'static str,
}

pub const PROVIDERS: &[ProviderInfo] = &[
    ProviderInfo {
        id: "openrouter",
        display_name: "OpenRouter",
    },
    ProviderInfo {
        id: "openai",
        display_name: "OpenAI",
    },
    ProviderInfo {
        id: "gemini",
        display_name: "Gemini",
    },
    ProviderInfo {
        id: "claude",
        display_name: "Claude",
    },
    ProviderInfo {
        id: "grok",
        display_name: "Grok",
    },
    ProviderInfo {
        id: "minimax",
        display_name: "Minimax",
    },
    ProviderInfo {
        id: "custom",
        display_name: "Custom (OpenAI-compatible)",
    },
];

/// Find a provider by id (case-insensitive)
pub fn find_provider(id: &str) -> Option<&'static ProviderInfo> {
    PROVIDERS
        .iter()
        .find(|provider| provider.id.eq_ignore_ascii_case(id.trim()))
}

/// Human-readable name, falling back to the raw id for unknown providers.
pub fn display_name(id: &str) -> String {
    find_provider(id)
        .map(|provider| provider.display_name.to_string())
        .unwrap_or_else(|| id.to_string())
}

/// Model to use after a listing: the current one if the backend still offers
/// it, otherwise the first listed model. `None` keeps the current selection.
pub fn select_model(current: &str, models: &[ModelInfo]) -> Option<String> {
    let first = models.first()?;
    if models.iter().any(|model| model.id == current) {
        return None;
    }
    Some(first.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str) -> ModelInfo {
        ModelInfo {
            id: id.to_string(),
            name: None,
        }
    }

    #[test]
    fn test_find_provider() {
        let provider = find_provider("OpenAI").expect("openai is listed");
        assert_eq!(provider.id, "openai");
        assert_eq!(
            find_provider("custom").map(|p| p.display_name),
            Some("Custom (OpenAI-compatible)")
        );
        assert!(find_provider("nonexistent").is_none());
    }

    #[test]
    fn default_provider_is_listed() {
        assert!(find_provider(DEFAULT_PROVIDER).is_some());
        assert_eq!(display_name("minimax"), "Minimax");
        assert_eq!(display_name("local-llm"), "local-llm");
    }

    #[test]
    fn select_model_keeps_current_when_listed() {
        let models = [model("a"), model("b")];
        assert_eq!(select_model("b", &models), None);
    }

    #[test]
    fn select_model_picks_first_when_current_missing() {
        let models = [model("a"), model("b")];
        assert_eq!(select_model("gone", &models), Some("a".to_string()));
        assert_eq!(select_model("gone", &[]), None);
    }
}

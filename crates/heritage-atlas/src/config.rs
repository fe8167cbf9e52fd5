use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AtlasConfig {
    pub genai: GenAiConfig,
    pub transitions: TransitionConfig,
}

/// Generation endpoint credentials plus the queue's timing/retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenAiConfig {
    /// Explicit API key; falls back to `GEMINI_API_KEY` when absent. No key
    /// at all disables generation and every request resolves its fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    /// Minimum spacing between consecutive generation calls.
    pub throttle_ms: u64,
    /// Total attempts for a rate-limited request, first call included.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_jitter_ms: u64,
}

/// Timing of the selection machine's choreographed transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Window during which a popup-close signal is ignored after the detail
    /// overlay replaces the popup.
    pub popup_guard_ms: u64,
    /// Overlay close animation; selections clear only after it has played.
    pub close_delay_ms: u64,
    pub search_debounce_ms: u64,
}

impl TransitionConfig {
    pub fn popup_guard(&self) -> Duration {
        Duration::from_millis(self.popup_guard_ms)
    }

    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl AtlasConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.genai.model.is_empty() {
            return Err("genai.model must not be empty".into());
        }
        if self.genai.max_attempts == 0 {
            return Err("genai.max_attempts must be >= 1".into());
        }
        if self.genai.initial_backoff_ms == 0 {
            return Err("genai.initial_backoff_ms must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            throttle_ms: 1_500,
            max_attempts: 5,
            initial_backoff_ms: 10_000,
            max_jitter_ms: 1_000,
        }
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            popup_guard_ms: 100,
            close_delay_ms: 300,
            search_debounce_ms: 300,
        }
    }
}

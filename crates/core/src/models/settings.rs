use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Runtime configuration for the core: where the backend lives and how
/// market data is fetched and cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the backend serving `/api/...` (e.g., "http://localhost:5000").
    pub backend_url: String,

    /// History span requested for return statistics (Yahoo period syntax).
    pub history_period: String,

    /// Bar size of that history (Yahoo interval syntax).
    pub history_interval: String,

    /// How long a fetched history is reused, in seconds.
    pub cache_ttl_secs: u64,

    /// Per-request HTTP timeout in seconds (ignored on WASM).
    pub request_timeout_secs: u64,

    /// Register the direct Yahoo Finance provider after the backend proxy.
    /// Native targets only.
    pub yahoo_fallback: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000".to_string(),
            history_period: "10y".to_string(),
            history_interval: "1mo".to_string(),
            cache_ttl_secs: 300,
            request_timeout_secs: 30,
            yahoo_fallback: true,
        }
    }
}

impl Settings {
    /// Load settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let url = self.backend_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CoreError::ValidationError(format!(
                "backend_url must start with http:// or https://, got '{}'",
                self.backend_url
            )));
        }
        if self.history_period.trim().is_empty() || self.history_interval.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "history_period and history_interval must not be empty".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::ValidationError(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// `backend_url` without a trailing slash, ready for path joining.
    pub fn base_url(&self) -> &str {
        self.backend_url.trim().trim_end_matches('/')
    }
}

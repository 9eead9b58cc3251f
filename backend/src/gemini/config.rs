//! Gemini configuration
//!
//! Settings for the direct Gemini API client.

use std::env;

/// Default Gemini model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini REST endpoint
pub const DEFAULT_GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API configuration
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key, `None` when the key is not configured
    pub api_key: Option<String>,
    /// Gemini model name
    pub model: String,
    /// Gemini API base URL
    pub api_base_url: String,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_base_url: DEFAULT_GEMINI_API_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

// Keeps the API key out of logs
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GeminiConfig {
    /// Load Gemini settings from `GEMINI_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env::var("GEMINI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: env::var("GEMINI_MODEL")
                .ok()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.model),
            api_base_url: env::var("GEMINI_API_BASE_URL")
                .ok()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or(defaults.api_base_url),
            timeout_secs: env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .filter(|t| *t > 0)
                .unwrap_or(defaults.timeout_secs),
        }
    }

    /// True when an API key is available
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the shared HTTP client with the configured timeout
    pub fn build_http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build HTTP client, using defaults");
                reqwest::Client::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeminiConfig::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert!(!config.is_configured());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = GeminiConfig {
            api_key: Some("secret-key".to_string()),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret-key"));
        assert!(printed.contains("<redacted>"));
    }
}

//! Request-time settings resolved from an environment source.
//!
//! Credentials are looked up on every request, never cached at process
//! start, so an operator can rotate or add a key without a restart. Blank
//! values count as unset.

use std::collections::HashMap;

use crate::redact::redact_secret;

pub const MODEL_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const MODEL_BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const VISION_MODEL_VAR: &str = "VINOSCOPE_VISION_MODEL";
pub const GROUNDING_MODEL_VAR: &str = "VINOSCOPE_GROUNDING_MODEL";
pub const SEARCH_API_KEY_VAR: &str = "TAVILY_API_KEY";
pub const SEARCH_BASE_URL_VAR: &str = "TAVILY_BASE_URL";

pub const DEFAULT_MODEL_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GROUNDING_MODEL: &str = "gpt-4o";
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://api.tavily.com";

/// Where settings are read from.
pub trait EnvSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Like [`EnvSource::get`], but blank values are treated as unset.
    fn non_blank(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A fixed map of variables (useful for testing).
#[derive(Debug, Clone, Default)]
pub struct MapEnv(HashMap<String, String>);

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

impl FromIterator<(String, String)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl EnvSource for MapEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// Settings for one analysis request.
#[derive(Clone, Default)]
pub struct Settings {
    /// Model credential. `None` is a server misconfiguration.
    pub model_api_key: Option<String>,
    pub model_base_url: String,
    pub vision_model: String,
    pub grounding_model: String,
    /// Search credential. `None` disables evidence grounding.
    pub search_api_key: Option<String>,
    pub search_base_url: String,
}

impl Settings {
    /// Read settings from `env`, applying defaults.
    pub fn resolve(env: &dyn EnvSource) -> Self {
        Self {
            model_api_key: env.non_blank(MODEL_API_KEY_VAR),
            model_base_url: env
                .non_blank(MODEL_BASE_URL_VAR)
                .unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string()),
            vision_model: env
                .non_blank(VISION_MODEL_VAR)
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            grounding_model: env
                .non_blank(GROUNDING_MODEL_VAR)
                .unwrap_or_else(|| DEFAULT_GROUNDING_MODEL.to_string()),
            search_api_key: env.non_blank(SEARCH_API_KEY_VAR),
            search_base_url: env
                .non_blank(SEARCH_BASE_URL_VAR)
                .unwrap_or_else(|| DEFAULT_SEARCH_BASE_URL.to_string()),
        }
    }

    pub fn grounding_enabled(&self) -> bool {
        self.search_api_key.is_some()
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("model_api_key", &self.model_api_key.as_deref().map(redact_secret))
            .field("model_base_url", &self.model_base_url)
            .field("vision_model", &self.vision_model)
            .field("grounding_model", &self.grounding_model)
            .field("search_api_key", &self.search_api_key.as_deref().map(redact_secret))
            .field("search_base_url", &self.search_base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let settings = Settings::resolve(&MapEnv::new());
        assert!(settings.model_api_key.is_none());
        assert!(!settings.grounding_enabled());
        assert_eq!(settings.model_base_url, DEFAULT_MODEL_BASE_URL);
        assert_eq!(settings.vision_model, DEFAULT_VISION_MODEL);
        assert_eq!(settings.grounding_model, DEFAULT_GROUNDING_MODEL);
        assert_eq!(settings.search_base_url, DEFAULT_SEARCH_BASE_URL);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let env = MapEnv::new()
            .with(MODEL_API_KEY_VAR, "   ")
            .with(SEARCH_API_KEY_VAR, "");
        let settings = Settings::resolve(&env);
        assert!(settings.model_api_key.is_none());
        assert!(settings.search_api_key.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let env = MapEnv::new()
            .with(MODEL_API_KEY_VAR, "sk-test-123456")
            .with(MODEL_BASE_URL_VAR, "http://127.0.0.1:9000/v1")
            .with(GROUNDING_MODEL_VAR, "gpt-4.1")
            .with(SEARCH_API_KEY_VAR, "tvly-abc");
        let settings = Settings::resolve(&env);
        assert_eq!(settings.model_api_key.as_deref(), Some("sk-test-123456"));
        assert_eq!(settings.model_base_url, "http://127.0.0.1:9000/v1");
        assert_eq!(settings.grounding_model, "gpt-4.1");
        assert!(settings.grounding_enabled());
    }

    #[test]
    fn debug_output_hides_credentials() {
        let env = MapEnv::new().with(MODEL_API_KEY_VAR, "sk-supersecretvalue");
        let debug = format!("{:?}", Settings::resolve(&env));
        assert!(!debug.contains("supersecretvalue"));
        assert!(debug.contains("sk-s***"));
    }
}

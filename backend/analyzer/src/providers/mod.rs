pub mod mock;
pub mod openai;

use std::sync::Arc;

use reqwest::Client;
use tracing::debug;

use vinoscope_config::Settings;
use vinoscope_core::{AnalyzeError, LlmProvider, SearchProvider};
use vinoscope_tools::TavilySearch;

use crate::MODEL_API_KEY_VAR;
use openai::OpenAiCompatProvider;

/// Providers wired up for one request.
pub struct Backends {
    pub model: Arc<dyn LlmProvider>,
    /// `None` when no search credential is configured.
    pub search: Option<Arc<dyn SearchProvider>>,
}

impl Backends {
    /// Build providers from request-time settings.
    ///
    /// A missing model credential is a server misconfiguration; a missing
    /// search credential just disables grounding.
    pub fn from_settings(settings: &Settings, client: &Client) -> Result<Self, AnalyzeError> {
        let api_key = settings
            .model_api_key
            .as_deref()
            .ok_or_else(|| AnalyzeError::MissingCredential {
                var: MODEL_API_KEY_VAR.to_string(),
            })?;

        let model: Arc<dyn LlmProvider> = Arc::new(
            OpenAiCompatProvider::new(client.clone(), api_key)
                .with_base_url(&settings.model_base_url),
        );

        let search = settings.search_api_key.as_deref().map(|key| {
            Arc::new(
                TavilySearch::new(client.clone(), key).with_base_url(&settings.search_base_url),
            ) as Arc<dyn SearchProvider>
        });

        debug!(
            model_base_url = %settings.model_base_url,
            grounding = search.is_some(),
            "Providers configured"
        );

        Ok(Self { model, search })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vinoscope_config::{MapEnv, SEARCH_API_KEY_VAR};

    #[test]
    fn missing_model_key_is_a_misconfiguration() {
        let settings = Settings::resolve(&MapEnv::new().with(SEARCH_API_KEY_VAR, "tvly-x"));
        match Backends::from_settings(&settings, &Client::new()) {
            Err(AnalyzeError::MissingCredential { var }) => assert_eq!(var, "OPENAI_API_KEY"),
            other => panic!("expected MissingCredential, got {:?}", other.err()),
        }
    }

    #[test]
    fn search_is_optional() {
        let settings = Settings::resolve(&MapEnv::new().with(MODEL_API_KEY_VAR, "sk-x"));
        let backends = Backends::from_settings(&settings, &Client::new()).unwrap();
        assert!(backends.search.is_none());
        assert_eq!(backends.model.name(), "openai");

        let settings = Settings::resolve(
            &MapEnv::new()
                .with(MODEL_API_KEY_VAR, "sk-x")
                .with(SEARCH_API_KEY_VAR, "tvly-x"),
        );
        let backends = Backends::from_settings(&settings, &Client::new()).unwrap();
        assert_eq!(backends.search.unwrap().name(), "tavily");
    }
}

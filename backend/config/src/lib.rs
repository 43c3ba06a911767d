//! `vinoscope-config`: settings for the analysis pipeline.
//!
//! Provides:
//! - Request-time credential and model resolution from an [`EnvSource`]
//! - Secret masking for safe logging

pub mod env;
pub mod redact;

pub use env::{
    EnvSource, MapEnv, ProcessEnv, Settings, GROUNDING_MODEL_VAR, MODEL_API_KEY_VAR,
    MODEL_BASE_URL_VAR, SEARCH_API_KEY_VAR, SEARCH_BASE_URL_VAR, VISION_MODEL_VAR,
};
pub use redact::redact_secret;

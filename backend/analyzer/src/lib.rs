//! Label analysis pipeline for Vinoscope.
//!
//! One request runs strictly in order: validate the upload, read the label
//! with a vision model, optionally search the web for pricing evidence, and
//! optionally re-ask a text model to ground price and drink window in that
//! evidence. Each stage declares whether its failures abort the request or
//! merely reduce what is returned.

pub mod pipeline;
pub mod prompts;
pub mod providers;

pub use pipeline::{
    analyze_upload, AnalysisReport, Analyzer, Grounding, ImageUpload, Stage,
    GROUNDING_DEGRADED_NOTE, TEMPERATURE,
};
pub use providers::Backends;
pub use vinoscope_config::MODEL_API_KEY_VAR;

//! Structured logging for Vinoscope.
//!
//! Console + optional rolling JSON file output, and scrubbing of credentials
//! from text that reaches logs or clients.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_sensitive_data;

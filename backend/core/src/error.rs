use thiserror::Error;

/// Failure reported by a model or search provider.
///
/// `status` carries the provider's HTTP status when there was one, so
/// callers can tell quota and credential problems apart without parsing
/// `message`.
#[derive(Debug, Clone, Error)]
#[error("{provider} returned {}: {message}", status_label(.status))]
pub struct UpstreamError {
    pub provider: String,
    pub status: Option<u16>,
    pub message: String,
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no response".to_string(),
    }
}

impl UpstreamError {
    pub fn http(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            status: None,
            message: message.into(),
        }
    }
}

/// Top-level error type for one label analysis.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("No image supplied")]
    NoImage,

    #[error("Server misconfiguration: {var} credential is not set")]
    MissingCredential { var: String },

    #[error("Model returned non-JSON")]
    NonJson { raw: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl AnalyzeError {
    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            AnalyzeError::NoImage => 400,
            AnalyzeError::NonJson { .. } => 502,
            AnalyzeError::MissingCredential { .. }
            | AnalyzeError::Upstream(_)
            | AnalyzeError::Internal(_) => 500,
        }
    }

    /// Upstream provider status, when the failure came from one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AnalyzeError::Upstream(e) => e.status,
            _ => None,
        }
    }
}

impl From<anyhow::Error> for AnalyzeError {
    /// Providers report through `anyhow`; recover the structured error
    /// when one is inside.
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<UpstreamError>() {
            Ok(upstream) => AnalyzeError::Upstream(upstream),
            Err(other) => AnalyzeError::Internal(other),
        }
    }
}

/// What a pipeline stage's failure does to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePolicy {
    /// Abort the request and report the error.
    Fatal,
    /// Log, continue with reduced information.
    Degrade,
}

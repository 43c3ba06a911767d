//! Submission client for `POST /api/analyze`.
//!
//! Every call starts from a fresh request with no cached result and no
//! retries. Failures are reduced to an [`ErrorCategory`] with a
//! user-facing message.

use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use vinoscope_core::WineAnalysisRecord;

use crate::api::IMAGE_FIELD;
use crate::mime::image_mime_for_path;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Picker(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Server {
        status: u16,
        message: String,
        upstream_status: Option<u16>,
    },
}

impl ClientError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Picker(_) => ErrorCategory::MissingImage,
            ClientError::Transport(e) => classify(e.status().map(|s| s.as_u16()), None, &e.to_string()),
            ClientError::Server {
                status,
                message,
                upstream_status,
            } => classify(Some(*status), *upstream_status, message),
        }
    }
}

/// User-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RateLimited,
    Unauthorized,
    MissingImage,
    Other,
}

impl ErrorCategory {
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorCategory::RateLimited => {
                "Model credits exhausted or rate limited. Please try again later."
            }
            ErrorCategory::Unauthorized => {
                "The server's model credential is misconfigured. Contact the operator."
            }
            ErrorCategory::MissingImage => "Please upload an image of a wine label.",
            ErrorCategory::Other => "Analysis failed. Please try again.",
        }
    }
}

const RATE_LIMIT_MARKERS: &[&str] = &["429", "quota", "rate limit", "resource_exhausted"];
const UNAUTHORIZED_MARKERS: &[&str] = &["401", "unauthorized", "invalid api key"];
/// The server's own missing-credential report.
const MISCONFIGURATION_MARKERS: &[&str] = &["misconfiguration", "credential"];
const MISSING_IMAGE_MARKERS: &[&str] = &["no image"];

/// Classify a failure.
///
/// Structured status codes decide whenever they say something: a provider
/// status that is neither quota nor auth is [`ErrorCategory::Other`]
/// regardless of the message. Message markers only apply when no provider
/// status came back.
pub fn classify(status: Option<u16>, upstream_status: Option<u16>, message: &str) -> ErrorCategory {
    for code in [upstream_status, status].into_iter().flatten() {
        match code {
            429 => return ErrorCategory::RateLimited,
            401 | 403 => return ErrorCategory::Unauthorized,
            _ => {}
        }
    }
    if upstream_status.is_some() {
        return ErrorCategory::Other;
    }
    if status == Some(400) {
        return ErrorCategory::MissingImage;
    }

    let text = message.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| text.contains(m));
    if has(MISCONFIGURATION_MARKERS) || has(UNAUTHORIZED_MARKERS) {
        ErrorCategory::Unauthorized
    } else if has(RATE_LIMIT_MARKERS) {
        ErrorCategory::RateLimited
    } else if has(MISSING_IMAGE_MARKERS) {
        ErrorCategory::MissingImage
    } else {
        ErrorCategory::Other
    }
}

/// A picked image file, read into memory.
#[derive(Debug, Clone)]
pub struct Selection {
    pub path: PathBuf,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Selection {
    /// Read `path`, refusing anything that is not an image type.
    pub fn from_path(path: &Path) -> Result<Self, ClientError> {
        let mime_type = image_mime_for_path(path).ok_or_else(|| {
            ClientError::Picker(format!("{} is not an image file", path.display()))
        })?;
        let bytes = std::fs::read(path)
            .map_err(|e| ClientError::Picker(format!("cannot read {}: {e}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            mime_type,
            bytes,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string())
    }

    /// `name (mime, size)` line shown before upload.
    pub fn preview(&self) -> String {
        format!(
            "{} ({}, {})",
            self.file_name(),
            self.mime_type,
            human_size(self.bytes.len())
        )
    }
}

fn human_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "upstreamStatus")]
    upstream_status: Option<u16>,
}

pub struct SubmissionClient {
    http: reqwest::Client,
    base_url: String,
}

impl SubmissionClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Upload one image and decode the returned record.
    pub async fn submit(&self, selection: &Selection) -> Result<WineAnalysisRecord, ClientError> {
        let part = Part::bytes(selection.bytes.clone())
            .file_name(selection.file_name())
            .mime_str(selection.mime_type)?;
        let form = Form::new().part(IMAGE_FIELD, part);

        debug!(url = %self.base_url, file = %selection.file_name(), "Submitting image");
        let response = self
            .http
            .post(format!("{}/api/analyze", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let parsed: Option<ErrorBody> = serde_json::from_str(&text).ok();
            let (message, upstream_status) = match parsed {
                Some(ErrorBody {
                    error: Some(error),
                    upstream_status,
                }) => (error, upstream_status),
                Some(body) => (text.clone(), body.upstream_status),
                None => (text.clone(), None),
            };
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
                upstream_status,
            });
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| ClientError::Server {
            status: status.as_u16(),
            message: format!("malformed response: {e}"),
            upstream_status: None,
        })?;
        Ok(WineAnalysisRecord::from_value(
            body.get("data").cloned().unwrap_or(Value::Null),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{build_router, AppState};
    use crate::test_support::{mock_model, spawn};
    use std::sync::Arc;
    use vinoscope_config::{MapEnv, MODEL_API_KEY_VAR, MODEL_BASE_URL_VAR};

    #[test]
    fn structured_status_wins() {
        assert_eq!(classify(Some(500), Some(429), "boom"), ErrorCategory::RateLimited);
        assert_eq!(classify(Some(429), None, ""), ErrorCategory::RateLimited);
        assert_eq!(classify(Some(500), Some(401), "quota"), ErrorCategory::Unauthorized);
        assert_eq!(classify(Some(403), None, ""), ErrorCategory::Unauthorized);
    }

    #[test]
    fn text_markers_are_the_fallback() {
        assert_eq!(
            classify(Some(500), None, "RESOURCE_EXHAUSTED: try later"),
            ErrorCategory::RateLimited
        );
        assert_eq!(
            classify(Some(500), None, "Incorrect API key: Invalid API key provided"),
            ErrorCategory::Unauthorized
        );
        assert_eq!(
            classify(
                Some(500),
                None,
                "Server misconfiguration: OPENAI_API_KEY credential is not set"
            ),
            ErrorCategory::Unauthorized
        );
        assert_eq!(classify(Some(400), None, "No image supplied"), ErrorCategory::MissingImage);
        assert_eq!(classify(Some(502), None, "Model returned non-JSON"), ErrorCategory::Other);
        assert_eq!(classify(None, None, "connection refused"), ErrorCategory::Other);
    }

    #[test]
    fn uninformative_provider_status_skips_text_markers() {
        assert_eq!(
            classify(Some(500), Some(500), "openai returned 500: request id req_4291abc"),
            ErrorCategory::Other
        );
        assert_eq!(
            classify(Some(500), Some(503), "quota service unavailable"),
            ErrorCategory::Other
        );
        assert_eq!(
            classify(Some(400), None, "request 429 malformed"),
            ErrorCategory::MissingImage
        );
    }

    #[test]
    fn messages_per_category() {
        assert_eq!(
            ErrorCategory::MissingImage.user_message(),
            "Please upload an image of a wine label."
        );
        assert_eq!(ErrorCategory::Other.user_message(), "Analysis failed. Please try again.");
    }

    #[test]
    fn picker_refuses_non_images() {
        let err = Selection::from_path(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, ClientError::Picker(_)));
        assert_eq!(err.category(), ErrorCategory::MissingImage);
    }

    #[test]
    fn preview_shows_name_type_and_size() {
        let selection = Selection {
            path: PathBuf::from("/tmp/label.png"),
            mime_type: "image/png",
            bytes: vec![0; 2048],
        };
        assert_eq!(selection.preview(), "label.png (image/png, 2.0 KiB)");
    }

    fn selection() -> Selection {
        Selection {
            path: PathBuf::from("label.jpg"),
            mime_type: "image/jpeg",
            bytes: vec![0xFF, 0xD8, 0xFF],
        }
    }

    async fn server(env: MapEnv) -> String {
        let state = Arc::new(AppState {
            env: Arc::new(env),
            http: reqwest::Client::new(),
        });
        spawn(build_router(state, 1024 * 1024)).await
    }

    #[tokio::test]
    async fn submits_and_decodes_the_record() {
        let model = mock_model(vec![(
            200,
            r#"{"recognizedLabel": {"producer": "Ridge", "wine": "Lytton Springs"}, "grapes": ["Zinfandel"]}"#,
        )])
        .await;
        let env = MapEnv::new()
            .with(MODEL_API_KEY_VAR, "sk-test")
            .with(MODEL_BASE_URL_VAR, model);
        let client = SubmissionClient::new(reqwest::Client::new(), server(env).await);

        let record = client.submit(&selection()).await.unwrap();
        let label = record.recognized_label.unwrap();
        assert_eq!(label.producer.as_deref(), Some("Ridge"));
        assert_eq!(record.grapes[0].variety, "Zinfandel");
    }

    #[tokio::test]
    async fn server_errors_are_classified() {
        let client = SubmissionClient::new(reqwest::Client::new(), server(MapEnv::new()).await);
        let err = client.submit(&selection()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Unauthorized);

        let model = mock_model(vec![(429, "rate limit reached")]).await;
        let env = MapEnv::new()
            .with(MODEL_API_KEY_VAR, "sk-test")
            .with(MODEL_BASE_URL_VAR, model);
        let client = SubmissionClient::new(reqwest::Client::new(), server(env).await);
        match client.submit(&selection()).await.unwrap_err() {
            e @ ClientError::Server { .. } => {
                assert!(matches!(e, ClientError::Server { upstream_status: Some(429), .. }));
                assert_eq!(e.category(), ErrorCategory::RateLimited);
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }
}

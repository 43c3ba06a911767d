use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use vinoscope_analyzer::{analyze_upload, ImageUpload};
use vinoscope_config::{EnvSource, Settings};
use vinoscope_core::AnalyzeError;
use vinoscope_logging::redact_sensitive_data;

use crate::mime::{image_mime_for_path, is_image, DEFAULT_IMAGE_MIME};

/// Multipart field carrying the photograph.
pub const IMAGE_FIELD: &str = "image";

/// Shared application state for API handlers.
pub struct AppState {
    /// Where credentials and model names are looked up on every request.
    pub env: Arc<dyn EnvSource>,
    pub http: reqwest::Client,
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "vinoscope",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Analyze one label photograph.
async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let upload = match multipart {
        Ok(multipart) => match read_image_field(multipart).await {
            Ok(upload) => upload,
            Err(e) => return multipart_error_response(e),
        },
        Err(rejection) => {
            debug!(%rejection, "Request body is not multipart");
            None
        }
    };

    let settings = Settings::resolve(state.env.as_ref());
    match analyze_upload(upload, &settings, &state.http).await {
        Ok(report) => {
            info!(
                evidence = report.evidence_count,
                grounding = ?report.grounding,
                sources = report.record.sources.len(),
                "Analysis complete"
            );
            Json(json!({ "ok": true, "data": report.record.to_value() })).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Pull the first `image` field out of the form. Other fields are skipped.
async fn read_image_field(mut multipart: Multipart) -> Result<Option<ImageUpload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let mime_type = field_mime(field.content_type(), field.file_name());
        let bytes = field.bytes().await?;
        debug!(size = bytes.len(), mime = %mime_type, "Received image");
        return Ok(Some(ImageUpload {
            bytes: bytes.to_vec(),
            mime_type,
        }));
    }
    Ok(None)
}

/// Declared content type when it names an image, else guessed from the
/// file name, else the default.
fn field_mime(content_type: Option<&str>, file_name: Option<&str>) -> String {
    content_type
        .filter(|ct| is_image(ct))
        .or_else(|| file_name.and_then(|name| image_mime_for_path(Path::new(name))))
        .unwrap_or(DEFAULT_IMAGE_MIME)
        .to_string()
}

/// Map an analysis failure to its status and JSON body.
pub fn error_response(err: &AnalyzeError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = redact_sensitive_data(&err.to_string());

    let mut body = json!({ "error": message });
    if let AnalyzeError::NonJson { raw } = err {
        body["raw"] = json!(raw);
    }
    if let Some(upstream) = err.upstream_status() {
        body["upstreamStatus"] = json!(upstream);
    }

    if status.is_server_error() {
        error!(status = status.as_u16(), error = %message, "Analysis failed");
    } else {
        warn!(status = status.as_u16(), error = %message, "Analysis rejected");
    }

    (status, Json(body)).into_response()
}

fn multipart_error_response(err: MultipartError) -> Response {
    warn!(error = %err, "Malformed multipart body");
    (err.status(), Json(json!({ "error": err.body_text() }))).into_response()
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };
    error!(panic = %message, "Handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}

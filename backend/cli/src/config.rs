use std::path::PathBuf;

/// Process configuration, read once at startup.
///
/// Model and search credentials are not here; they are read
/// per request (see `vinoscope_config::Settings`).
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Log level
    pub log_level: String,
    /// Directory for rolling JSON logs; console only when unset
    pub log_dir: Option<PathBuf>,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
    /// Server the `analyze` subcommand submits to
    pub server_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_dir: None,
            max_upload_bytes: 20 * 1024 * 1024,
            server_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: std::env::var("VINOSCOPE_BIND").unwrap_or(defaults.bind_address),
            port: std::env::var("VINOSCOPE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_dir: std::env::var("VINOSCOPE_LOG_DIR").ok().map(PathBuf::from),
            max_upload_bytes: std::env::var("VINOSCOPE_MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            server_url: std::env::var("VINOSCOPE_SERVER").unwrap_or(defaults.server_url),
        }
    }
}

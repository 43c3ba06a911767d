mod api;
mod client;
mod config;
mod mime;
mod render;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use vinoscope_config::{redact_secret, ProcessEnv, Settings};
use vinoscope_logging::init_logger;

use api::AppState;
use client::{Selection, SubmissionClient};
use config::Config;

#[derive(Parser)]
#[command(name = "vinoscope")]
#[command(about = "Vinoscope: wine label photo analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Submit a label photo to a running server and print the result
    Analyze {
        /// Image file to upload
        path: PathBuf,
        /// Server base URL
        #[arg(short, long)]
        server: Option<String>,
        /// Print the record as JSON instead of the formatted view
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let config = Config::from_env();
    init_logger(&config.log_level, config.log_dir.as_deref());

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await.map(|()| ExitCode::SUCCESS)
        }
        Commands::Analyze { path, server, json } => {
            let server = server.unwrap_or(config.server_url);
            run_analyze(&path, &server, json).await
        }
    };

    outcome.unwrap_or_else(|e| {
        error!(error = %e, "Fatal error");
        render::note_error(&e.to_string());
        ExitCode::FAILURE
    })
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        max_upload_bytes = config.max_upload_bytes,
        "Starting Vinoscope server"
    );

    // Credentials are re-read per request; this is only a startup hint.
    let settings = Settings::resolve(&ProcessEnv);
    match &settings.model_api_key {
        Some(key) => info!(
            key = %redact_secret(key),
            vision = %settings.vision_model,
            grounding = %settings.grounding_model,
            "Model credential found"
        ),
        None => error!("OPENAI_API_KEY is not set; analyses will fail until it is"),
    }
    if !settings.grounding_enabled() {
        info!("TAVILY_API_KEY is not set; price grounding disabled");
    }

    let app_state = Arc::new(AppState {
        env: Arc::new(ProcessEnv),
        http: reqwest::Client::new(),
    });

    let app = api::build_router(app_state, config.max_upload_bytes).layer(CorsLayer::permissive());
    let addr = format!("{}:{}", config.bind_address, config.port);

    info!(addr = %addr, "HTTP API listening");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_analyze(path: &std::path::Path, server: &str, json: bool) -> Result<ExitCode> {
    let selection = match Selection::from_path(path) {
        Ok(selection) => selection,
        Err(e) => {
            render::note_error(&e.to_string());
            render::note_warn(e.category().user_message());
            return Ok(ExitCode::FAILURE);
        }
    };
    render::note_info(&format!("Uploading {}", selection.preview()));

    let client = SubmissionClient::new(reqwest::Client::new(), server);
    match client.submit(&selection).await {
        Ok(record) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&record).context("serializing record")?
                );
            } else {
                render::note_success("Analysis complete");
                print!("{}", render::render_safely(&record, render::supports_color()));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "Submission failed");
            render::note_error(e.category().user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

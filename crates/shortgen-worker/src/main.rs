//! Content generation worker binary. Processes one work item and exits.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shortgen_sheets::SheetsClient;
use shortgen_worker::{HttpGeminiTransport, Pipeline, PipelineConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shortgen=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting shortgen-worker");

    let config = match PipelineConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Pipeline config: {:?}", config);

    let store = match SheetsClient::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create Sheets client: {}", e);
            std::process::exit(1);
        }
    };

    let transport = match HttpGeminiTransport::new(&config.gemini) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to create Gemini transport: {}", e);
            std::process::exit(1);
        }
    };

    let pipeline = Pipeline::new(Arc::new(store), Arc::new(transport), config);

    // The pipeline logs the outcome; only the exit code is left to set.
    if pipeline.run_once().await.is_err() {
        std::process::exit(1);
    }
}

//! # Detector Server Entry Point
//!
//! Thin wrapper that composes and runs the deepfake detector HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin server -- --config config/detector.toml
//! ```
//!
//! The server will:
//! 1. Load configuration from the given TOML file (defaults if omitted)
//! 2. Open the record store and create its tables
//! 3. Build the remote inference client (one handle for the whole process;
//!    it contacts the endpoint on the first detection request)
//! 4. Serve the API until interrupted

use anyhow::Context;
use clap::Parser;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::io::Write;
use std::sync::Arc;

use deepfake_detector::common::config::{load_config, AppConfig};
use deepfake_detector::web::{self, AppState};
use deepfake_detector::{Classifier, GradioClient, RecordStore};

/// Command-line arguments for the server binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (TOML format)
    ///
    /// Example: config/detector.toml
    #[arg(short, long)]
    config: Option<String>,

    /// Override the listen address (e.g., 0.0.0.0:8000)
    #[arg(short, long)]
    address: Option<String>,

    /// Override the database file path
    #[arg(short, long)]
    database: Option<String>,
}

/// Initialize the logging system with timestamp, level, and message formatting.
///
/// Logs are printed with INFO level by default; `RUST_LOG` overrides it.
/// Format: `[HH:MM:SS] [LEVEL] message`
fn init_logger() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();

    let mut config: AppConfig = match &args.config {
        Some(path) => {
            load_config(path).with_context(|| format!("failed to load config from {path}"))?
        }
        None => AppConfig::default(),
    };
    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(database) = args.database {
        config.storage.database_path = database;
    }

    info!("🚀 Initializing deepfake detector API...");

    let store = Arc::new(RecordStore::open(&config.storage.database_path).await?);

    let gradio = GradioClient::new(&config.inference)?;
    let classifier = Classifier::with_max_in_flight(
        gradio,
        config.inference.retry.clone(),
        config.inference.max_in_flight,
    );

    let state = Arc::new(AppState::new(classifier, store, &config));
    let app = web::router(state)?;

    let listener = tokio::net::TcpListener::bind(&config.server.address).await?;
    info!("🌐 Web server running on http://{}", config.server.address);
    info!("📡 API endpoint: http://{}/detect", config.server.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

//! J-Jaga diagnostics gateway server

use clap::Parser;
use jaga_connector_fixed::FixedModel;
use jaga_connector_gemini::GeminiConnector;
use jaga_core::prelude::*;
use jaga_core::Orchestrator;
use jaga_http_api::HttpApi;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

use cli::Cli;
use config::{Backend, JagaConfig, ModelSection};

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // Initialize logging; RUST_LOG wins over -v
    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let config = match JagaConfig::load(&args.config) {
        Ok(config) => config.with_overrides(&args),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    let model = match build_model(&config.model) {
        Ok(model) => model,
        Err(e) => {
            error!("Failed to initialise {:?} backend: {}", config.model.backend, e);
            process::exit(1);
        }
    };

    info!("Starting jagad with {} backend on {}", model.name(), config.bind_address());

    let service: Arc<dyn DiagnosticsService> =
        Arc::new(Orchestrator::new(model, config.orchestrator_config()));
    let api = Arc::new(HttpApi::new(config.http_config()));

    let signal_api = api.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                if let Err(e) = signal_api.stop().await {
                    warn!("Failed to stop HTTP API cleanly: {}", e);
                }
            }
            Err(e) => warn!("Unable to listen for shutdown signal: {}", e),
        }
    });

    if let Err(e) = api.start(service).await {
        error!("Server failed: {}", e);
        process::exit(1);
    }
}

/// Instantiate the configured model backend
fn build_model(section: &ModelSection) -> Result<Arc<dyn DiagnosticModel>, ModelError> {
    match section.backend {
        Backend::Fixed => Ok(Arc::new(FixedModel::new())),
        Backend::Gemini => Ok(Arc::new(GeminiConnector::new(section.gemini.clone())?)),
    }
}

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use askdb::config::{AppConfig, CliArgs};
use askdb::llm::LlmManager;
use askdb::pipeline::QueryPipeline;
use askdb::session::Session;
use askdb::util::logging::init_tracing;
use askdb::web::{self, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = AppConfig::new(&args)?;

    // Initialize logging
    init_tracing(config.log_format);

    // Ensure data directory exists
    let data_dir = PathBuf::from(&config.data_dir);
    if !data_dir.exists() {
        info!("Creating data directory: {}", config.data_dir);
        std::fs::create_dir_all(&data_dir)?;
    }

    // Initialize the translation engine client
    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let llm_manager = match LlmManager::new(&config.llm) {
        Ok(manager) => manager,
        Err(e) => {
            error!("Failed to initialize LLM backend: {}", e);
            return Err(e.into());
        }
    };

    // Load saved connections and favorites; a bad file is reported in the UI
    let session = Session::from_config(&config);

    let app_state = Arc::new(AppState::new(session, QueryPipeline::new(llm_manager)));

    // Start the web server
    info!("Starting askdb server on {}:{}", config.web.host, config.web.port);
    match web::run_server(&config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

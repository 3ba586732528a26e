//! Balboa demo server.
//!
//! ```text
//!     Client ──HTTP / WS──▶ http::server ──Connection──▶ App::dispatch
//!                                                          │
//!                     static_files ◀── prefix match ───────┤
//!                     handlers     ◀── route table ────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use balboa::config::{load_config, validate_config, AppConfig, ConfigError};
use balboa::lifecycle::startup;
use balboa::observability::logging;
use balboa::showcase;

#[derive(Parser)]
#[command(name = "balboa")]
#[command(about = "Minimal HTTP, SSE and WebSocket dispatch server", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "balboa starting");

    tracing::info!(
        bind_address = %config.server.bind_address,
        static_prefix = %config.static_files.url_prefix,
        static_directory = %config.static_files.directory,
        repeat_interval_ms = config.streaming.repeat_interval_ms,
        "Configuration loaded"
    );

    let app = showcase::build(&config)?;
    startup::run(app, &config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Bind the listener and serve the application
//! - Wire OS signals to the shutdown handle
//!
//! # Design Decisions
//! - Fail fast: a bind error is fatal
//! - The listener starts last, so traffic only arrives once routes are fixed

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::app::App;
use crate::config::AppConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Serve `app` with the settings in `config` until a shutdown signal arrives.
pub async fn run(app: App, config: &AppConfig) -> Result<(), std::io::Error> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(
        app = %app.name(),
        address = %listener.local_addr()?,
        routes = app.table().total(),
        static_prefix = %app.static_files().url_prefix(),
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(Arc::new(app), &config.server, shutdown);
    server.run(listener).await
}

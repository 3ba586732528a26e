//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for a Balboa application.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and connection settings.
    pub server: ServerConfig,

    /// Static file mount.
    pub static_files: StaticFilesConfig,

    /// Page templates rendered by the demo routes.
    pub templates: TemplatesConfig,

    /// Server-Sent Event settings.
    pub streaming: StreamingConfig,

    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:9000").
    pub bind_address: String,

    /// Request bodies larger than this are rejected with 413.
    pub max_body_bytes: usize,

    /// Capacity of each per-connection event channel.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9000".to_string(),
            max_body_bytes: 1024 * 1024,
            channel_capacity: 32,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// URL prefix claimed by the mount (e.g., "/static").
    pub url_prefix: String,

    /// Directory files are served from.
    pub directory: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            url_prefix: "/static".to_string(),
            directory: "static".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory holding `.html` templates, read on every render.
    pub directory: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            directory: "templates".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Resend period for SSE routes bound to a fixed payload.
    pub repeat_interval_ms: u64,
}

impl StreamingConfig {
    pub fn repeat_interval(&self) -> Duration {
        Duration::from_millis(self.repeat_interval_ms)
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self { repeat_interval_ms: 1000 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default tracing filter, used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "balboa=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.streaming.repeat_interval(), Duration::from_secs(1));
        assert_eq!(config.static_files.url_prefix, "/static");
        assert_eq!(config.templates.directory, "templates");
    }

    #[test]
    fn test_partial_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            bind_address = "0.0.0.0:8000"

            [streaming]
            repeat_interval_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8000");
        assert_eq!(config.server.channel_capacity, 32);
        assert_eq!(config.streaming.repeat_interval(), Duration::from_millis(250));
    }
}

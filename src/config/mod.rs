//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! balboa.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → App, HttpServer, observability setup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, ObservabilityConfig, ServerConfig, StaticFilesConfig, StreamingConfig, TemplatesConfig};
pub use validation::{validate_config, ValidationError};

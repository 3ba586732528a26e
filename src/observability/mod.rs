//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatch, route table, registry, host adapter
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Metric updates are no-ops until an exporter is installed
//! - Log filtering follows `RUST_LOG` first, then the configured level

pub mod logging;
pub mod metrics;

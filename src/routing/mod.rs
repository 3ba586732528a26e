//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route declaration (at startup):
//!     App::get("/users/{id}") → RouteBuilder
//!     → builder.send(..) sets the handler
//!     → finish() / drop commits exactly once
//!     → pattern.rs compiles "{id}" into an anchored regex
//!     → table.rs appends to the protocol's collection
//!
//! Incoming connection:
//!     (method, path)
//!     → table.rs walks the collection in registration order
//!     → pattern.rs extracts named captures
//!     → params.rs merges captures with the query string
//! ```
//!
//! # Design Decisions
//! - Registration order is match order; nothing is sorted or deduplicated
//! - First match wins, even if a later route would also match
//! - Template metacharacters outside `{}` are passed to the regex unescaped

pub mod builder;
pub mod params;
pub mod pattern;
pub mod table;

pub use builder::RouteBuilder;
pub use params::{ParamValue, ParameterSet, LIST_SUFFIX};
pub use pattern::{RouteError, RoutePattern, Segment};
pub use table::{Protocol, RouteEntry, RouteId, RouteSummary, RouteTable};

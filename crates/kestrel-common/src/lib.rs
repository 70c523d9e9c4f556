//! Shared types for the Kestrel compiler front end.
//!
//! - [`diagnostic`]: severity-tagged diagnostics with source ranges
//! - [`module_graph`]: module dependency graph with cycle detection

pub mod diagnostic;
pub mod module_graph;

pub use rowan::{TextRange, TextSize};

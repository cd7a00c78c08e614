//! Synthetic painting sessions for the layer compositor.
//!
//! Drives a [`compositor::Compositor`] with repeatable strokes and visibility
//! toggles, and reports which strategies ran and how the caches behaved.

pub mod config;
pub mod workload;

pub use config::{load_settings, RunConfig};
pub use workload::{RunSummary, Workload};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

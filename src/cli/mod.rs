//! Command-line handlers
//!
//! Each command loads configuration, builds its pipeline and prints a
//! summary. Step failures never change the exit code; only configuration
//! and startup errors are returned.

pub mod commands;
pub mod ui;

pub use commands::ConfigOverrides;

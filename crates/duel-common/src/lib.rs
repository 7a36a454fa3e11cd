//! Shared utilities for Duelcast: configuration, logging, error types.
//!
//! This crate provides common infrastructure used across all Duelcast
//! components.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;

pub use config::{MatchConfig, DEFAULT_SYNC_DELAY};
pub use error::{Error, Result};

/// Initialize tracing with sensible defaults.
///
/// Log level is controlled by the `RUST_LOG` environment variable.
/// Defaults to `info` if not set.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

//! Shared library for the MAL client workspace.
//!
//! This crate provides common functionality used across the workspace:
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod logging;

// Re-export commonly used types
pub use config::Config;
pub use logging::LogConfig;

//! Loadbridge Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared configuration, logging, and error handling for the loadbridge
//! workspace.
//!
//! - **Error Handling**: [`LoadbridgeError`] and the [`Result`] alias
//! - **Configuration**: [`config::BulkConfig`], environment-driven endpoint and session settings
//! - **Logging**: [`logging::init_logging`] and its [`logging::LogConfig`]
//!
//! # Example
//!
//! ```no_run
//! use loadbridge_common::config::BulkConfig;
//! use loadbridge_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     let config = BulkConfig::from_env()?;
//!     tracing::info!(instance = %config.instance_url, "Loaded bulk configuration");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{LoadbridgeError, Result};

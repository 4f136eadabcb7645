//! # bleach-core
//!
//! Core types, errors, and utilities for the bleach dashboard.
//!
//! This crate provides:
//! - [`BleachError`] - Error types for every bleach component
//! - [`logging`] - Tracing setup
//! - [`config`] - The YAML configuration file
//! - [`catalog`] - The menu of operations
//!
//! ## Example
//!
//! ```no_run
//! use bleach_core::{Config, logging};
//!
//! fn main() -> bleach_core::Result<()> {
//!     let _guard = logging::init_logging(None, false)?;
//!     let config = Config::load(None)?;
//!     for entry in config.catalog().entries() {
//!         tracing::info!(title = %entry.title, "menu entry");
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;

pub use catalog::{Catalog, CatalogEntry, MenuAction, OperationDescriptor};
pub use config::{AuthConfig, Config};
pub use error::{BleachError, Result};
pub use logging::{LogGuard, init_logging};

/// Version shown in the dashboard's ready line.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

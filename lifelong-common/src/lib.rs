//! # Lifelong Common Library
//!
//! Shared code for the lifelong learning workspace including:
//! - Error and result types
//! - TOML configuration loading and file resolution
//! - Tracing subscriber initialisation
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use config::{LearnerConfig, LoggingConfig, RoleConfig, SplitConfig};
pub use error::{Error, Result};

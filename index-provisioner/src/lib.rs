//! # Index Provisioner
//!
//! Provisions the `todos` search index in OpenSearch and runs the todo flow
//! against it: store a todo, fetch it back, and search it by title.
//!
//! ## Modules
//!
//! - [`config`]: Environment settings and dependency initialization
//! - [`demo`]: The todo put/get/search flow

pub mod config;
pub mod demo;

pub use config::{ConnectionMode, Dependencies, Settings};
pub use demo::{run_todo_demo, DemoReport};

use index_provisioner_repository::ProvisionError;
use thiserror::Error;

/// Errors that can occur during startup or while running the flow.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Provisioning or document error.
    #[error("Provisioning error: {0}")]
    ProvisionError(#[from] ProvisionError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

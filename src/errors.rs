//! Error types for the crawler
//!
//! Only planning and configuration errors stop a run. Probe errors are
//! caught per probe and reported in the run summary.

use a11y_scheduler::PlanningError;
use element_identity::DriverError;
use thiserror::Error;

use crate::config::ConfigError;

/// Failure raised while building or running a single probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("document driver: {0}")]
    Driver(#[from] DriverError),

    #[error("probe '{0}' consumes the shared data bus but none was injected")]
    MissingBus(String),

    #[error("no probe registered under '{0}'")]
    NotRegistered(String),

    #[error("{0}")]
    Failed(String),
}

impl ProbeError {
    pub fn failed(message: impl Into<String>) -> Self {
        ProbeError::Failed(message.into())
    }
}

/// Failure that aborts a whole run before any probe executes.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

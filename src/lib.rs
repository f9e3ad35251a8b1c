//! Accessibility crawler core
//!
//! Runs independent accessibility probes against one live document:
//! - a phase scheduler orders probes by their declared dependencies
//! - a shared data bus carries per-element findings between phases
//! - an element resolver gives probes stable identifiers and locators

pub mod config;
pub mod crawler;
pub mod errors;
pub mod planning;
pub mod probe;
pub mod probes;
pub mod summary;
pub mod telemetry;

pub use a11y_core_types::{ElementId, FocusableEntry, Properties, RunId};
pub use a11y_data_bus::{InMemoryDataBus, SharedDataBus};
pub use a11y_scheduler::{ExecutionPlan, PhaseScheduler, PlanningError, ProbeDescriptor, ProbeTable};
pub use config::{load_config, ConfigError, CrawlerConfig, LoadedConfig, LoggingConfig};
pub use crawler::{CrawlOutcome, Crawler};
pub use element_identity::{DocumentDriver, DriverError, ElementResolver};
pub use errors::{CrawlError, ProbeError};
pub use planning::{resolve_plan, AutoEnabled, ResolvedPlan};
pub use probe::{Finding, Inventory, Probe, ProbeDeps, ProbeRegistry, ProbeReport, Severity};
pub use summary::{RunSummary, SkippedProbe};
pub use telemetry::init_logging;

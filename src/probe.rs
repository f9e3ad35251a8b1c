//! Probe contract and registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use a11y_core_types::{ElementId, Properties};
use a11y_data_bus::SharedDataBus;
use async_trait::async_trait;
use element_identity::{BatchOptions, DocumentDriver, ElementResolver};
use serde::{Deserialize, Serialize};

use crate::errors::ProbeError;

/// Per-element inventory a producing probe hands to the orchestrator.
pub type Inventory = BTreeMap<ElementId, Properties>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Notice,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub element: Option<ElementId>,
}

impl Finding {
    pub fn new(rule: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            severity,
            message: message.into(),
            element: None,
        }
    }

    pub fn on(mut self, element: ElementId) -> Self {
        self.element = Some(element);
        self
    }
}

/// What a probe returns from a successful run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub probe: String,
    /// Elements (or records) the probe looked at.
    pub examined: usize,
    pub findings: Vec<Finding>,
}

impl ProbeReport {
    pub fn new(probe: impl Into<String>) -> Self {
        Self {
            probe: probe.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|finding| finding.severity == severity)
            .count()
    }

    pub fn has_rule(&self, rule: &str) -> bool {
        self.findings.iter().any(|finding| finding.rule == rule)
    }
}

/// Independent unit analysing one accessibility concern.
#[async_trait]
pub trait Probe: Send {
    fn name(&self) -> &str;

    async fn run(&mut self) -> Result<ProbeReport, ProbeError>;

    /// Findings keyed by element identifier, for probes that produce them.
    fn inventory(&self) -> Option<&Inventory> {
        None
    }
}

/// Everything a probe factory may wire into a probe.
///
/// `bus` is only present for probes whose descriptor declares them a bus
/// consumer or an inventory producer.
#[derive(Clone)]
pub struct ProbeDeps {
    pub driver: Arc<dyn DocumentDriver>,
    pub resolver: Arc<ElementResolver>,
    pub bus: Option<Arc<dyn SharedDataBus>>,
    pub batch: BatchOptions,
}

impl ProbeDeps {
    pub fn require_bus(&self, probe: &str) -> Result<Arc<dyn SharedDataBus>, ProbeError> {
        self.bus
            .clone()
            .ok_or_else(|| ProbeError::MissingBus(probe.to_string()))
    }
}

pub type ProbeFactory =
    Arc<dyn Fn(ProbeDeps) -> Result<Box<dyn Probe>, ProbeError> + Send + Sync>;

/// Probe name to factory.
#[derive(Clone, Default)]
pub struct ProbeRegistry {
    factories: BTreeMap<String, ProbeFactory>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(ProbeDeps) -> Result<Box<dyn Probe>, ProbeError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.keys().map(String::as_str)
    }

    pub fn instantiate(&self, name: &str, deps: ProbeDeps) -> Result<Box<dyn Probe>, ProbeError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ProbeError::NotRegistered(name.to_string()))?;
        factory(deps)
    }
}

impl fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeRegistry")
            .field("probes", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

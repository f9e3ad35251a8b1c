//! Orchestrating crawler.
//!
//! Plans the enabled probes, runs phases in ascending order and merges every
//! producer's inventory into the shared data bus once the producer finishes.
//! A probe that fails is logged and skipped; only planning errors abort.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use a11y_core_types::{ElementId, FocusableEntry, Properties, RunId};
use a11y_data_bus::{InMemoryDataBus, SharedDataBus};
use a11y_scheduler::{Phase, PhaseScheduler, PlanningError};
use chrono::{DateTime, Utc};
use element_identity::{DocumentDriver, ElementResolver};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::CrawlerConfig;
use crate::errors::{CrawlError, ProbeError};
use crate::planning::{resolve_plan, ResolvedPlan};
use crate::probe::{Probe, ProbeDeps, ProbeRegistry, ProbeReport};
use crate::summary::{RunSummary, SkippedProbe};

/// Everything a run leaves behind for reporting.
#[derive(Clone, Debug, Serialize)]
pub struct CrawlOutcome {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub records: BTreeMap<ElementId, Properties>,
    pub focusables: Vec<FocusableEntry>,
    pub reports: Vec<ProbeReport>,
}

impl CrawlOutcome {
    pub fn record(&self, id: &ElementId) -> Option<&Properties> {
        self.records.get(id)
    }

    /// Records whose identifier matches `base` once position suffixes are ignored.
    pub fn records_for(&self, base: &str) -> Vec<(&ElementId, &Properties)> {
        let wanted = base.to_lowercase();
        self.records
            .iter()
            .filter(|(id, _)| id.normalized() == wanted)
            .collect()
    }

    pub fn report(&self, probe: &str) -> Option<&ProbeReport> {
        self.reports.iter().find(|report| report.probe == probe)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

type Running = (String, Box<dyn Probe>);

pub struct Crawler {
    config: CrawlerConfig,
    scheduler: PhaseScheduler,
    registry: ProbeRegistry,
    driver: Arc<dyn DocumentDriver>,
    resolver: Arc<ElementResolver>,
    bus: Arc<dyn SharedDataBus>,
}

impl Crawler {
    pub fn new(config: CrawlerConfig, driver: Arc<dyn DocumentDriver>) -> Result<Self, CrawlError> {
        config.validate()?;
        let scheduler = PhaseScheduler::new(config.probe_table())?;
        let resolver = Arc::new(ElementResolver::new(Arc::clone(&driver)));
        let bus: Arc<dyn SharedDataBus> = InMemoryDataBus::new();
        Ok(Self {
            config,
            scheduler,
            registry: ProbeRegistry::builtin(),
            driver,
            resolver,
            bus,
        })
    }

    pub fn with_registry(mut self, registry: ProbeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_bus(mut self, bus: Arc<dyn SharedDataBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn registry_mut(&mut self) -> &mut ProbeRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &PhaseScheduler {
        &self.scheduler
    }

    pub fn resolver(&self) -> &Arc<ElementResolver> {
        &self.resolver
    }

    pub fn bus(&self) -> Arc<dyn SharedDataBus> {
        Arc::clone(&self.bus)
    }

    /// The plan the next run would execute, after auto-repair.
    pub fn plan(&self) -> Result<ResolvedPlan, PlanningError> {
        let requested: BTreeSet<String> = self.config.enabled_probes.iter().cloned().collect();
        resolve_plan(
            &self.scheduler,
            &requested,
            self.config.auto_enable_dependencies,
        )
    }

    pub async fn run(&mut self) -> Result<CrawlOutcome, CrawlError> {
        let run_id = RunId::new();
        let started_at = Utc::now();
        self.bus.reset();
        self.resolver.reset();

        let resolved = self.plan()?;
        let plan = resolved.plan;
        info!(
            target: "crawler",
            run_id = %run_id.0,
            probes = plan.len(),
            phases = plan.phases.len(),
            estimated_cost_secs = plan.estimated_cost_secs,
            "run started"
        );

        let mut summary = RunSummary {
            auto_enabled: resolved.auto_enabled,
            estimated_cost_secs: plan.estimated_cost_secs,
            ..RunSummary::default()
        };
        let mut reports = Vec::new();

        for (&phase, names) in &plan.phases {
            info!(target: "crawler", phase, probes = ?names, "phase started");
            let mut parallel: Vec<Running> = Vec::new();
            let mut sequential: Vec<Running> = Vec::new();
            for name in names {
                match self.instantiate(name) {
                    Ok(probe) if self.config.parallel_probes && plan.is_parallel(phase, name) => {
                        parallel.push((name.clone(), probe))
                    }
                    Ok(probe) => sequential.push((name.clone(), probe)),
                    Err(err) => skip(&mut summary, name, phase, &err),
                }
            }

            if !parallel.is_empty() {
                let results = join_all(parallel.iter_mut().map(|(_, probe)| probe.run())).await;
                for ((name, probe), result) in parallel.iter().zip(results) {
                    self.finish(phase, name, &**probe, result, &mut summary, &mut reports);
                }
            }
            for (name, mut probe) in sequential {
                let result = probe.run().await;
                self.finish(phase, &name, &*probe, result, &mut summary, &mut reports);
            }
            info!(target: "crawler", phase, "phase finished");
        }

        summary.degraded = self.resolver.degraded_ids();
        summary.resolver = self.resolver.metrics();
        info!(
            target: "crawler",
            run_id = %run_id.0,
            executed = summary.executed_probes().count(),
            skipped = summary.skipped.len(),
            degraded = summary.degraded.len(),
            records = self.bus.len(),
            "run finished"
        );

        Ok(CrawlOutcome {
            run_id,
            started_at,
            finished_at: Utc::now(),
            summary,
            records: self.bus.records(),
            focusables: self.bus.focusables(),
            reports,
        })
    }

    fn instantiate(&self, name: &str) -> Result<Box<dyn Probe>, ProbeError> {
        let shares_state = self
            .scheduler
            .table()
            .get(name)
            .is_some_and(|descriptor| descriptor.consumes_bus || descriptor.produces_inventory);
        let deps = ProbeDeps {
            driver: Arc::clone(&self.driver),
            resolver: Arc::clone(&self.resolver),
            bus: shares_state.then(|| Arc::clone(&self.bus)),
            batch: self.config.batch,
        };
        self.registry.instantiate(name, deps)
    }

    fn finish(
        &self,
        phase: Phase,
        name: &str,
        probe: &dyn Probe,
        result: Result<ProbeReport, ProbeError>,
        summary: &mut RunSummary,
        reports: &mut Vec<ProbeReport>,
    ) {
        let report = match result {
            Ok(report) => report,
            Err(err) => return skip(summary, name, phase, &err),
        };

        let produces = self
            .scheduler
            .table()
            .get(name)
            .is_some_and(|descriptor| descriptor.produces_inventory);
        if produces {
            if let Some(inventory) = probe.inventory() {
                for (id, properties) in inventory {
                    self.bus.put(id.clone(), properties.clone());
                }
                debug!(target: "crawler", probe = %name, records = inventory.len(), "inventory merged");
            }
        }

        info!(
            target: "crawler",
            probe = %name,
            phase,
            examined = report.examined,
            findings = report.findings.len(),
            "probe finished"
        );
        summary.executed.entry(phase).or_default().push(name.to_string());
        reports.push(report);
    }
}

fn skip(summary: &mut RunSummary, name: &str, phase: Phase, err: &ProbeError) {
    warn!(target: "crawler", probe = %name, phase, error = %err, "probe failed, skipping");
    summary.skipped.push(SkippedProbe {
        probe: name.to_string(),
        phase,
        reason: err.to_string(),
    });
}

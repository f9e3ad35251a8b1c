//! Plan resolution with dependency auto-repair.

use std::collections::BTreeSet;

use a11y_scheduler::{ExecutionPlan, PhaseScheduler, PlanningError};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A dependency the orchestrator enabled on its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoEnabled {
    pub probe: String,
    pub required_by: String,
}

#[derive(Clone, Debug)]
pub struct ResolvedPlan {
    pub plan: ExecutionPlan,
    pub requested: BTreeSet<String>,
    pub auto_enabled: Vec<AutoEnabled>,
}

/// Validates `requested` and, when allowed, enables missing dependencies
/// that exist in the probe table until the set is closed.
///
/// Unknown probes and dependencies absent from the table are fatal.
pub fn resolve_plan(
    scheduler: &PhaseScheduler,
    requested: &BTreeSet<String>,
    auto_enable: bool,
) -> Result<ResolvedPlan, PlanningError> {
    let mut enabled = requested.clone();
    let mut auto_enabled = Vec::new();

    loop {
        let plan = scheduler.execution_plan(&enabled);
        if let Some(name) = plan.unknown.first() {
            return Err(PlanningError::UnknownProbe(name.clone()));
        }
        if let Some(missing) = plan.missing.iter().find(|m| !m.resolvable) {
            return Err(PlanningError::UnknownDependency {
                probe: missing.probe.clone(),
                dependency: missing.dependency.clone(),
            });
        }
        if plan.missing.is_empty() {
            return Ok(ResolvedPlan {
                plan,
                requested: requested.clone(),
                auto_enabled,
            });
        }
        if !auto_enable {
            plan.ensure_valid()?;
        }

        for missing in &plan.missing {
            if enabled.insert(missing.dependency.clone()) {
                info!(
                    target: "crawler",
                    probe = %missing.dependency,
                    required_by = %missing.probe,
                    "auto-enabled missing dependency"
                );
                auto_enabled.push(AutoEnabled {
                    probe: missing.dependency.clone(),
                    required_by: missing.probe.clone(),
                });
            }
        }
    }
}

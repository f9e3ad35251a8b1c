use thiserror::Error;

use crate::model::Phase;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("probe '{0}' is not declared in the probe table")]
    UnknownProbe(String),
    #[error("probe '{probe}' depends on '{dependency}', which is not declared in the probe table")]
    UnknownDependency { probe: String, dependency: String },
    #[error("probe '{probe}' requires '{dependency}', which is not enabled")]
    MissingDependency { probe: String, dependency: String },
    #[error(
        "probe '{probe}' (phase {phase}) depends on '{dependency}' (phase {dependency_phase}); dependencies must run in an earlier phase"
    )]
    PhaseInversion {
        probe: String,
        phase: Phase,
        dependency: String,
        dependency_phase: Phase,
    },
}

impl PlanningError {
    /// A resolvable error names a dependency the orchestrator may enable on its own.
    pub fn is_resolvable(&self) -> bool {
        matches!(self, PlanningError::MissingDependency { .. })
    }
}

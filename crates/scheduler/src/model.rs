use std::collections::{BTreeMap, BTreeSet};

/// Scheduling slot; lower phases run first.
pub type Phase = u32;

/// Phase number to probe names, ascending by phase.
pub type PhaseMap = BTreeMap<Phase, Vec<String>>;

/// Static description of one probe.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeDescriptor {
    pub name: String,
    pub phase: Phase,
    #[cfg_attr(feature = "serde", serde(default))]
    pub dependencies: BTreeSet<String>,
    /// Advisory cost in seconds.
    #[cfg_attr(feature = "serde", serde(default))]
    pub estimated_cost_secs: u64,
    /// Receives the shared data bus at construction.
    #[cfg_attr(feature = "serde", serde(default))]
    pub consumes_bus: bool,
    /// Exposes an inventory the orchestrator merges into the bus.
    #[cfg_attr(feature = "serde", serde(default))]
    pub produces_inventory: bool,
}

impl ProbeDescriptor {
    pub fn new(name: impl Into<String>, phase: Phase) -> Self {
        Self {
            name: name.into(),
            phase,
            dependencies: BTreeSet::new(),
            estimated_cost_secs: 0,
            consumes_bus: false,
            produces_inventory: false,
        }
    }

    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.insert(dependency.into());
        self
    }

    pub fn with_cost(mut self, secs: u64) -> Self {
        self.estimated_cost_secs = secs;
        self
    }

    pub fn consumer(mut self) -> Self {
        self.consumes_bus = true;
        self
    }

    pub fn producer(mut self) -> Self {
        self.produces_inventory = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingDependency {
    pub probe: String,
    pub dependency: String,
    /// The dependency exists in the probe table and could be enabled.
    pub resolvable: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Validation {
    pub ok: bool,
    pub missing: Vec<MissingDependency>,
}

impl Validation {
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.missing
            .iter()
            .map(|m| (m.probe.clone(), m.dependency.clone()))
            .collect()
    }
}

/// Phased execution plan for one run. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub phases: PhaseMap,
    pub parallel: PhaseMap,
    pub valid: bool,
    pub missing: Vec<MissingDependency>,
    pub unknown: Vec<String>,
    pub estimated_cost_secs: u64,
}

impl ExecutionPlan {
    pub fn probes(&self) -> impl Iterator<Item = (Phase, &str)> + '_ {
        self.phases
            .iter()
            .flat_map(|(phase, names)| names.iter().map(move |name| (*phase, name.as_str())))
    }

    pub fn phase_of(&self, probe: &str) -> Option<Phase> {
        self.probes()
            .find(|(_, name)| *name == probe)
            .map(|(phase, _)| phase)
    }

    pub fn is_parallel(&self, phase: Phase, probe: &str) -> bool {
        self.parallel
            .get(&phase)
            .map_or(false, |names| names.iter().any(|name| name == probe))
    }

    /// First blocking problem, unknown probes before missing dependencies.
    pub fn ensure_valid(&self) -> Result<&Self, crate::PlanningError> {
        if let Some(name) = self.unknown.first() {
            return Err(crate::PlanningError::UnknownProbe(name.clone()));
        }
        if let Some(missing) = self.missing.first() {
            return Err(if missing.resolvable {
                crate::PlanningError::MissingDependency {
                    probe: missing.probe.clone(),
                    dependency: missing.dependency.clone(),
                }
            } else {
                crate::PlanningError::UnknownDependency {
                    probe: missing.probe.clone(),
                    dependency: missing.dependency.clone(),
                }
            });
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.phases.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

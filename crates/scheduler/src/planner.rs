use std::collections::BTreeSet;

use tracing::debug;

use crate::error::PlanningError;
use crate::model::{ExecutionPlan, MissingDependency, PhaseMap, Validation};
use crate::table::ProbeTable;

/// Turns a set of enabled probe names into a phased plan.
///
/// Every operation is a pure function of the table and the input set.
#[derive(Clone, Debug)]
pub struct PhaseScheduler {
    table: ProbeTable,
}

impl PhaseScheduler {
    /// Rejects tables where a declared dependency does not run in a strictly
    /// earlier phase than its dependent.
    pub fn new(table: ProbeTable) -> Result<Self, PlanningError> {
        for descriptor in table.probes.values() {
            for dependency in &descriptor.dependencies {
                if let Some(dep) = table.get(dependency) {
                    if dep.phase >= descriptor.phase {
                        return Err(PlanningError::PhaseInversion {
                            probe: descriptor.name.clone(),
                            phase: descriptor.phase,
                            dependency: dependency.clone(),
                            dependency_phase: dep.phase,
                        });
                    }
                }
            }
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &ProbeTable {
        &self.table
    }

    pub fn validate(&self, enabled: &BTreeSet<String>) -> Validation {
        let mut missing = Vec::new();
        for name in enabled {
            let Some(descriptor) = self.table.get(name) else {
                continue;
            };
            for dependency in &descriptor.dependencies {
                if !enabled.contains(dependency) {
                    missing.push(MissingDependency {
                        probe: name.clone(),
                        dependency: dependency.clone(),
                        resolvable: self.table.contains(dependency),
                    });
                }
            }
        }
        Validation {
            ok: missing.is_empty(),
            missing,
        }
    }

    /// Enabled names absent from the table.
    pub fn unknown(&self, enabled: &BTreeSet<String>) -> Vec<String> {
        enabled
            .iter()
            .filter(|name| !self.table.contains(name))
            .cloned()
            .collect()
    }

    pub fn plan(&self, enabled: &BTreeSet<String>) -> PhaseMap {
        let mut phases = PhaseMap::new();
        for name in enabled {
            if let Some(descriptor) = self.table.get(name) {
                phases
                    .entry(descriptor.phase)
                    .or_default()
                    .push(name.clone());
            }
        }
        phases
    }

    /// Subset of [`plan`](Self::plan) restricted to the parallel-safe allow-list.
    pub fn parallel_groups(&self, enabled: &BTreeSet<String>) -> PhaseMap {
        self.plan(enabled)
            .into_iter()
            .filter_map(|(phase, names)| {
                let safe: Vec<String> = names
                    .into_iter()
                    .filter(|name| self.table.is_parallel_safe(phase, name))
                    .collect();
                (!safe.is_empty()).then_some((phase, safe))
            })
            .collect()
    }

    pub fn estimate(&self, enabled: &BTreeSet<String>) -> u64 {
        enabled
            .iter()
            .filter_map(|name| self.table.get(name))
            .map(|descriptor| descriptor.estimated_cost_secs)
            .sum()
    }

    pub fn execution_plan(&self, enabled: &BTreeSet<String>) -> ExecutionPlan {
        let validation = self.validate(enabled);
        let unknown = self.unknown(enabled);
        let plan = ExecutionPlan {
            phases: self.plan(enabled),
            parallel: self.parallel_groups(enabled),
            valid: validation.ok && unknown.is_empty(),
            missing: validation.missing,
            unknown,
            estimated_cost_secs: self.estimate(enabled),
        };
        debug!(
            target: "scheduler",
            probes = plan.len(),
            phases = plan.phases.len(),
            valid = plan.valid,
            estimated_cost_secs = plan.estimated_cost_secs,
            "execution plan built"
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProbeDescriptor;
    use crate::table::{HEADINGS, IMAGE_ALT, LINK_PURPOSE, SCREEN_READER, TAB_NAVIGATION};

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn scheduler() -> PhaseScheduler {
        PhaseScheduler::new(ProbeTable::builtin()).unwrap()
    }

    fn all_subsets(names: &[&str]) -> Vec<BTreeSet<String>> {
        (0..1u32 << names.len())
            .map(|mask| {
                names
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| mask & (1 << idx) != 0)
                    .map(|(_, name)| name.to_string())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn validate_reports_missing_screen_reader() {
        let validation = scheduler().validate(&set(&[TAB_NAVIGATION]));
        assert!(!validation.ok);
        assert_eq!(
            validation.pairs(),
            vec![(TAB_NAVIGATION.to_string(), SCREEN_READER.to_string())]
        );
        assert!(validation.missing[0].resolvable);
    }

    #[test]
    fn validate_ok_iff_dependencies_closed() {
        let scheduler = scheduler();
        let names: Vec<&str> = scheduler.table().names().collect();
        for subset in all_subsets(&names) {
            let closed = subset.iter().all(|name| {
                scheduler
                    .table()
                    .get(name)
                    .unwrap()
                    .dependencies
                    .iter()
                    .all(|dep| subset.contains(dep))
            });
            assert_eq!(scheduler.validate(&subset).ok, closed, "subset {subset:?}");
        }
    }

    #[test]
    fn plan_assigns_each_probe_once_in_table_phase() {
        let scheduler = scheduler();
        let names: Vec<&str> = scheduler.table().names().collect();
        for subset in all_subsets(&names) {
            let plan = scheduler.plan(&subset);
            let mut seen = BTreeSet::new();
            let mut last_phase = None;
            for (phase, probes) in &plan {
                if let Some(prev) = last_phase {
                    assert!(*phase > prev);
                }
                last_phase = Some(*phase);
                for probe in probes {
                    assert!(seen.insert(probe.clone()), "{probe} planned twice");
                    assert_eq!(scheduler.table().get(probe).unwrap().phase, *phase);
                }
            }
            assert_eq!(seen, subset);
        }
    }

    #[test]
    fn parallel_groups_are_subset_of_plan() {
        let enabled = set(&[SCREEN_READER, IMAGE_ALT, HEADINGS, TAB_NAVIGATION, LINK_PURPOSE]);
        let scheduler = scheduler();
        let plan = scheduler.plan(&enabled);
        let groups = scheduler.parallel_groups(&enabled);
        assert_eq!(groups.get(&1).unwrap().len(), 3);
        assert_eq!(groups.get(&2).unwrap(), &vec![LINK_PURPOSE.to_string()]);
        for (phase, names) in &groups {
            for name in names {
                assert!(plan.get(phase).unwrap().contains(name));
            }
        }
    }

    #[test]
    fn estimate_sums_costs() {
        assert_eq!(scheduler().estimate(&set(&[SCREEN_READER, TAB_NAVIGATION])), 50);
        assert_eq!(scheduler().estimate(&set(&["nope"])), 0);
    }

    #[test]
    fn unknown_dependency_is_not_resolvable() {
        let table = ProbeTable::new().with(ProbeDescriptor::new("orphan", 2).depends_on("ghost"));
        let scheduler = PhaseScheduler::new(table).unwrap();
        let plan = scheduler.execution_plan(&set(&["orphan"]));
        assert!(!plan.valid);
        assert_eq!(
            plan.ensure_valid().unwrap_err(),
            PlanningError::UnknownDependency {
                probe: "orphan".into(),
                dependency: "ghost".into()
            }
        );
    }

    #[test]
    fn unknown_probe_invalidates_plan() {
        let plan = scheduler().execution_plan(&set(&[SCREEN_READER, "colour_blindness"]));
        assert!(!plan.valid);
        assert_eq!(
            plan.ensure_valid().unwrap_err(),
            PlanningError::UnknownProbe("colour_blindness".into())
        );
        assert_eq!(plan.phase_of(SCREEN_READER), Some(1));
    }

    #[test]
    fn same_phase_dependency_is_rejected() {
        let table = ProbeTable::new()
            .with(ProbeDescriptor::new("a", 1))
            .with(ProbeDescriptor::new("b", 1).depends_on("a"));
        let err = PhaseScheduler::new(table).unwrap_err();
        assert!(matches!(err, PlanningError::PhaseInversion { .. }));
    }
}

//! Plain-text execution summary.

use std::collections::BTreeMap;
use std::fmt;

use a11y_core_types::ElementId;
use a11y_scheduler::Phase;
use element_identity::ResolverMetrics;
use serde::Serialize;

use crate::planning::AutoEnabled;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedProbe {
    pub probe: String,
    pub phase: Phase,
    pub reason: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    /// Probes that ran to completion, by phase.
    pub executed: BTreeMap<Phase, Vec<String>>,
    pub skipped: Vec<SkippedProbe>,
    pub auto_enabled: Vec<AutoEnabled>,
    /// Identifiers whose equality is inconclusive.
    pub degraded: Vec<ElementId>,
    pub estimated_cost_secs: u64,
    pub resolver: ResolverMetrics,
}

impl RunSummary {
    pub fn executed_probes(&self) -> impl Iterator<Item = &str> + '_ {
        self.executed.values().flatten().map(String::as_str)
    }

    pub fn was_executed(&self, probe: &str) -> bool {
        self.executed_probes().any(|name| name == probe)
    }

    pub fn was_skipped(&self, probe: &str) -> bool {
        self.skipped.iter().any(|skipped| skipped.probe == probe)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Execution summary")?;
        if self.executed.is_empty() {
            writeln!(f, "  no probes ran")?;
        }
        for (phase, probes) in &self.executed {
            writeln!(f, "  phase {phase}: {}", probes.join(", "))?;
        }
        for added in &self.auto_enabled {
            writeln!(
                f,
                "  auto-enabled: {} (required by {})",
                added.probe, added.required_by
            )?;
        }
        for skipped in &self.skipped {
            writeln!(
                f,
                "  skipped: {} (phase {}): {}",
                skipped.probe, skipped.phase, skipped.reason
            )?;
        }
        if !self.degraded.is_empty() {
            let ids: Vec<&str> = self.degraded.iter().map(ElementId::as_str).collect();
            writeln!(
                f,
                "  degraded identifiers ({}): {}",
                ids.len(),
                ids.join(", ")
            )?;
        }
        write!(f, "  estimated cost: {}s", self.estimated_cost_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_phases_skips_and_degraded_ids() {
        let mut summary = RunSummary::default();
        summary
            .executed
            .insert(1, vec!["headings".into(), "screen_reader".into()]);
        summary.executed.insert(2, vec!["tab_navigation".into()]);
        summary.auto_enabled.push(AutoEnabled {
            probe: "screen_reader".into(),
            required_by: "tab_navigation".into(),
        });
        summary.skipped.push(SkippedProbe {
            probe: "image_alt".into(),
            phase: 1,
            reason: "driver timeout".into(),
        });
        summary.degraded.push(ElementId::new("div[0a1b]"));
        summary.estimated_cost_secs = 53;

        let text = summary.to_string();
        assert_eq!(
            text,
            "Execution summary\n\
             \x20 phase 1: headings, screen_reader\n\
             \x20 phase 2: tab_navigation\n\
             \x20 auto-enabled: screen_reader (required by tab_navigation)\n\
             \x20 skipped: image_alt (phase 1): driver timeout\n\
             \x20 degraded identifiers (1): div[0a1b]\n\
             \x20 estimated cost: 53s"
        );
        assert!(summary.was_executed("tab_navigation"));
        assert!(summary.was_skipped("image_alt"));
    }
}

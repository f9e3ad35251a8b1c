//! Static priority/dependency tables for the probe catalogue.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Phase, ProbeDescriptor};

pub const SCREEN_READER: &str = "screen_reader";
pub const IMAGE_ALT: &str = "image_alt";
pub const HEADINGS: &str = "headings";
pub const TAB_NAVIGATION: &str = "tab_navigation";
pub const LINK_PURPOSE: &str = "link_purpose";

/// Immutable probe configuration handed to the scheduler.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbeTable {
    pub probes: BTreeMap<String, ProbeDescriptor>,
    /// Per-phase allow-list of probes that may run concurrently.
    #[cfg_attr(feature = "serde", serde(default))]
    pub parallel_safe: BTreeMap<Phase, BTreeSet<String>>,
}

impl ProbeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for the probes shipped with the crawler.
    pub fn builtin() -> Self {
        Self::new()
            .with_parallel(ProbeDescriptor::new(SCREEN_READER, 1).with_cost(20).producer())
            .with_parallel(ProbeDescriptor::new(IMAGE_ALT, 1).with_cost(5).producer())
            .with_parallel(ProbeDescriptor::new(HEADINGS, 1).with_cost(3).producer())
            .with(
                ProbeDescriptor::new(TAB_NAVIGATION, 2)
                    .depends_on(SCREEN_READER)
                    .with_cost(30)
                    .consumer(),
            )
            .with_parallel(
                ProbeDescriptor::new(LINK_PURPOSE, 2)
                    .depends_on(SCREEN_READER)
                    .with_cost(4)
                    .consumer(),
            )
    }

    pub fn with(mut self, descriptor: ProbeDescriptor) -> Self {
        self.probes.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn with_parallel(mut self, descriptor: ProbeDescriptor) -> Self {
        self.parallel_safe
            .entry(descriptor.phase)
            .or_default()
            .insert(descriptor.name.clone());
        self.with(descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&ProbeDescriptor> {
        self.probes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.probes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.probes.keys().map(String::as_str)
    }

    pub fn is_parallel_safe(&self, phase: Phase, name: &str) -> bool {
        self.parallel_safe
            .get(&phase)
            .map_or(false, |names| names.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_declares_tab_navigation_after_screen_reader() {
        let table = ProbeTable::builtin();
        let tab = table.get(TAB_NAVIGATION).unwrap();
        let reader = table.get(SCREEN_READER).unwrap();
        assert!(tab.dependencies.contains(SCREEN_READER));
        assert!(reader.phase < tab.phase);
        assert!(tab.consumes_bus);
        assert!(reader.produces_inventory);
    }

    #[test]
    fn parallel_allow_list_is_per_phase() {
        let table = ProbeTable::builtin();
        assert!(table.is_parallel_safe(1, SCREEN_READER));
        assert!(!table.is_parallel_safe(2, SCREEN_READER));
        assert!(!table.is_parallel_safe(2, TAB_NAVIGATION));
        assert!(table.is_parallel_safe(2, LINK_PURPOSE));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn table_deserializes_from_yaml() {
        let yaml = r#"
probes:
  contrast:
    name: contrast
    phase: 1
    estimated_cost_secs: 12
    produces_inventory: true
  focus_ring:
    name: focus_ring
    phase: 3
    dependencies: [contrast]
parallel_safe:
  1: [contrast]
"#;
        let table: ProbeTable = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(table.get("contrast").unwrap().estimated_cost_secs, 12);
        assert!(table.get("focus_ring").unwrap().dependencies.contains("contrast"));
        assert!(table.is_parallel_safe(1, "contrast"));
    }
}

//! Keyboard focus order.
//!
//! Positive `tabindex` values come first in ascending order, then every
//! other focusable element in document order. Each entry is appended to the
//! bus focus list and correlated with the screen-reader record of the same
//! element.

use std::sync::Arc;

use a11y_core_types::Properties;
use a11y_data_bus::SharedDataBus;
use a11y_scheduler::table::TAB_NAVIGATION;
use async_trait::async_trait;
use element_identity::{
    find_matching, BatchOptions, DocumentDriver, ElementHandle, ElementResolver, ElementSnapshot,
};
use tracing::debug;

use super::{describe_matching, positioned_identity, props};
use crate::errors::ProbeError;
use crate::probe::{Finding, Probe, ProbeDeps, ProbeReport, Severity};

const SELECTOR: &str = "a[href], button, input, select, textarea, [tabindex]";

pub struct TabNavigationProbe {
    driver: Arc<dyn DocumentDriver>,
    resolver: Arc<ElementResolver>,
    bus: Arc<dyn SharedDataBus>,
    batch: BatchOptions,
}

impl TabNavigationProbe {
    pub fn new(deps: ProbeDeps, bus: Arc<dyn SharedDataBus>) -> Self {
        Self {
            driver: deps.driver,
            resolver: deps.resolver,
            bus,
            batch: deps.batch,
        }
    }
}

/// Effective tab index, `None` when the element is not in the tab sequence.
pub fn tab_index(snapshot: &ElementSnapshot) -> Option<i32> {
    if snapshot.attr("disabled").is_some() {
        return None;
    }
    if snapshot.tag == "input" && snapshot.attr_trimmed("type") == Some("hidden") {
        return None;
    }
    let natively_focusable = match snapshot.tag.as_str() {
        "a" => snapshot.attr("href").is_some(),
        "button" | "input" | "select" | "textarea" => true,
        _ => false,
    };
    match snapshot.attr_trimmed("tabindex").and_then(|raw| raw.parse::<i32>().ok()) {
        Some(index) if index < 0 => None,
        Some(index) => Some(index),
        None if natively_focusable => Some(0),
        None => None,
    }
}

/// Sorts into focus order; the sort is stable so document order breaks ties.
pub fn focus_order(
    elements: Vec<(ElementHandle, ElementSnapshot)>,
) -> Vec<(ElementHandle, ElementSnapshot, i32)> {
    let mut ordered: Vec<_> = elements
        .into_iter()
        .filter_map(|(handle, snapshot)| {
            tab_index(&snapshot).map(|index| (handle, snapshot, index))
        })
        .collect();
    ordered.sort_by_key(|(_, _, index)| if *index > 0 { (0, *index) } else { (1, 0) });
    ordered
}

#[async_trait]
impl Probe for TabNavigationProbe {
    fn name(&self) -> &str {
        TAB_NAVIGATION
    }

    async fn run(&mut self) -> Result<ProbeReport, ProbeError> {
        let mut report = ProbeReport::new(TAB_NAVIGATION);
        let elements = describe_matching(&self.driver, SELECTOR, self.batch).await?;
        let known = self.bus.ids();

        for (position, (handle, snapshot, index)) in focus_order(elements).into_iter().enumerate() {
            report.examined += 1;
            let (_, key) = positioned_identity(&self.resolver, &handle, &snapshot).await?;

            let matched = find_matching(&key, &known).cloned();
            let recorded_name = matched
                .as_ref()
                .and_then(|id| self.bus.get(id).get(props::ACCESSIBLE_NAME).cloned());
            let name = match recorded_name {
                Some(name) => name,
                None => self.resolver.accessible_name_of(&handle, &snapshot).await?.name,
            };

            if index > 0 {
                report.push(
                    Finding::new(
                        "positive-tabindex",
                        Severity::Warning,
                        format!("tabindex={index} overrides the document focus order"),
                    )
                    .on(key.clone()),
                );
            }
            if name.is_empty() {
                report.push(
                    Finding::new(
                        "unnamed-focusable",
                        Severity::Error,
                        format!("focusable <{}> has no accessible name", snapshot.tag),
                    )
                    .on(key.clone()),
                );
            }

            let mut properties = Properties::new();
            properties.insert(props::TAG.into(), snapshot.tag.clone());
            properties.insert(props::TAB_INDEX.into(), index.to_string());
            properties.insert(props::FOCUS_ORDER.into(), (position + 1).to_string());
            properties.insert(props::ACCESSIBLE_NAME.into(), name);
            properties.insert(
                props::MATCHED_RECORD.into(),
                matched.as_ref().map(|id| id.to_string()).unwrap_or_default(),
            );
            debug!(target: "crawler", id = %key, order = position + 1, "focusable");
            self.bus.append_focusable(key, properties);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(n: u64, snapshot: ElementSnapshot) -> (ElementHandle, ElementSnapshot) {
        (ElementHandle(n), snapshot)
    }

    #[test]
    fn tab_index_rules() {
        assert_eq!(tab_index(&ElementSnapshot::new("button")), Some(0));
        assert_eq!(tab_index(&ElementSnapshot::new("a")), None);
        assert_eq!(tab_index(&ElementSnapshot::new("div").with_attr("tabindex", "0")), Some(0));
        assert_eq!(tab_index(&ElementSnapshot::new("button").with_attr("tabindex", "-1")), None);
        assert_eq!(tab_index(&ElementSnapshot::new("button").with_attr("disabled", "")), None);
        assert_eq!(
            tab_index(&ElementSnapshot::new("input").with_attr("type", "hidden")),
            None
        );
    }

    #[test]
    fn positive_indices_lead_in_ascending_order() {
        let ordered = focus_order(vec![
            el(1, ElementSnapshot::new("button")),
            el(2, ElementSnapshot::new("button").with_attr("tabindex", "3")),
            el(3, ElementSnapshot::new("a").with_attr("href", "/")),
            el(4, ElementSnapshot::new("input").with_attr("tabindex", "1")),
            el(5, ElementSnapshot::new("div")),
        ]);
        let handles: Vec<u64> = ordered.iter().map(|(h, _, _)| h.0).collect();
        assert_eq!(handles, vec![4, 2, 1, 3]);
    }
}

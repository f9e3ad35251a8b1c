//! Link purpose from the link text (WCAG 2.4.4), read from the bus.

use std::sync::Arc;

use a11y_data_bus::SharedDataBus;
use a11y_scheduler::table::LINK_PURPOSE;
use async_trait::async_trait;

use super::props;
use crate::errors::ProbeError;
use crate::probe::{Finding, Probe, ProbeReport, Severity};

/// Link texts that say nothing about the destination.
const VAGUE_LINK_TEXT: &[&str] = &[
    "click here",
    "here",
    "read more",
    "more",
    "learn more",
    "link",
    "this",
    "details",
    "cliquez ici",
    "ici",
    "en savoir plus",
];

pub struct LinkPurposeProbe {
    bus: Arc<dyn SharedDataBus>,
}

impl LinkPurposeProbe {
    pub fn new(bus: Arc<dyn SharedDataBus>) -> Self {
        Self { bus }
    }
}

pub fn is_vague(name: &str) -> bool {
    let normalized = name
        .trim()
        .trim_end_matches(['.', '…', '!'])
        .to_lowercase();
    VAGUE_LINK_TEXT.contains(&normalized.as_str())
}

#[async_trait]
impl Probe for LinkPurposeProbe {
    fn name(&self) -> &str {
        LINK_PURPOSE
    }

    async fn run(&mut self) -> Result<ProbeReport, ProbeError> {
        let mut report = ProbeReport::new(LINK_PURPOSE);
        for (id, properties) in self.bus.records() {
            if properties.get(props::ROLE).map(String::as_str) != Some("link") {
                continue;
            }
            report.examined += 1;
            let name = properties
                .get(props::ACCESSIBLE_NAME)
                .map(|name| name.trim())
                .unwrap_or_default();
            if name.is_empty() {
                report.push(
                    Finding::new("empty-link", Severity::Error, "link has no accessible name")
                        .on(id),
                );
            } else if is_vague(name) {
                report.push(
                    Finding::new(
                        "vague-link",
                        Severity::Warning,
                        format!("link text '{name}' does not describe its destination"),
                    )
                    .on(id),
                );
            }
        }
        Ok(report)
    }
}

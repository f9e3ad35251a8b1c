//! Heading structure.

use std::sync::Arc;

use a11y_core_types::Properties;
use a11y_scheduler::table::HEADINGS;
use async_trait::async_trait;
use element_identity::{BatchOptions, DocumentDriver, ElementResolver};

use super::{describe_matching, flag, positioned_identity, props};
use crate::errors::ProbeError;
use crate::probe::{Finding, Inventory, Probe, ProbeDeps, ProbeReport, Severity};

pub struct HeadingsProbe {
    driver: Arc<dyn DocumentDriver>,
    resolver: Arc<ElementResolver>,
    batch: BatchOptions,
    inventory: Inventory,
}

impl HeadingsProbe {
    pub fn new(deps: ProbeDeps) -> Self {
        Self {
            driver: deps.driver,
            resolver: deps.resolver,
            batch: deps.batch,
            inventory: Inventory::new(),
        }
    }
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag.as_bytes() {
        [b'h', digit @ b'1'..=b'6'] => Some(digit - b'0'),
        _ => None,
    }
}

#[async_trait]
impl Probe for HeadingsProbe {
    fn name(&self) -> &str {
        HEADINGS
    }

    async fn run(&mut self) -> Result<ProbeReport, ProbeError> {
        let mut report = ProbeReport::new(HEADINGS);
        let headings =
            describe_matching(&self.driver, "h1, h2, h3, h4, h5, h6", self.batch).await?;

        let mut previous: Option<u8> = None;
        let mut h1_count = 0;
        for (handle, snapshot) in &headings {
            let Some(level) = heading_level(&snapshot.tag) else {
                continue;
            };
            report.examined += 1;
            let (_, key) = positioned_identity(&self.resolver, handle, snapshot).await?;

            if level == 1 {
                h1_count += 1;
            }
            let skipped = previous.is_some_and(|prev| level > prev + 1);
            if skipped {
                report.push(
                    Finding::new(
                        "skipped-heading-level",
                        Severity::Warning,
                        format!(
                            "h{level} follows h{} without the levels in between",
                            previous.unwrap_or_default()
                        ),
                    )
                    .on(key.clone()),
                );
            }
            if snapshot.trimmed_text().is_empty() {
                report.push(
                    Finding::new("empty-heading", Severity::Error, format!("h{level} has no text"))
                        .on(key.clone()),
                );
            }
            previous = Some(level);

            let mut properties = Properties::new();
            properties.insert(props::TAG.into(), snapshot.tag.clone());
            properties.insert(props::HEADING_LEVEL.into(), level.to_string());
            properties.insert(props::HEADING_TEXT.into(), snapshot.trimmed_text().to_string());
            properties.insert(props::LEVEL_SKIPPED.into(), flag(skipped));
            self.inventory.entry(key).or_default().extend(properties);
        }

        match h1_count {
            0 => report.push(Finding::new(
                "missing-h1",
                Severity::Error,
                "document has no level-one heading",
            )),
            1 => {}
            n => report.push(Finding::new(
                "multiple-h1",
                Severity::Notice,
                format!("document has {n} level-one headings"),
            )),
        }

        Ok(report)
    }

    fn inventory(&self) -> Option<&Inventory> {
        Some(&self.inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::heading_level;

    #[test]
    fn parses_heading_tags() {
        assert_eq!(heading_level("h1"), Some(1));
        assert_eq!(heading_level("h6"), Some(6));
        assert_eq!(heading_level("h7"), None);
        assert_eq!(heading_level("header"), None);
    }
}

//! What a screen reader announces for interactive and image elements.

use std::sync::Arc;

use a11y_core_types::Properties;
use a11y_scheduler::table::SCREEN_READER;
use async_trait::async_trait;
use element_identity::{BatchOptions, DocumentDriver, ElementResolver, ElementSnapshot, NameSource};
use tracing::debug;

use super::{describe_matching, flag, positioned_identity, props};
use crate::errors::ProbeError;
use crate::probe::{Finding, Inventory, Probe, ProbeDeps, ProbeReport, Severity};

const SELECTOR: &str = "a[href], button, input, select, textarea, img, [role='button'], \
                        [role='link'], [role='checkbox'], [role='tab'], [tabindex]";

pub struct ScreenReaderProbe {
    driver: Arc<dyn DocumentDriver>,
    resolver: Arc<ElementResolver>,
    batch: BatchOptions,
    inventory: Inventory,
}

impl ScreenReaderProbe {
    pub fn new(deps: ProbeDeps) -> Self {
        Self {
            driver: deps.driver,
            resolver: deps.resolver,
            batch: deps.batch,
            inventory: Inventory::new(),
        }
    }
}

#[async_trait]
impl Probe for ScreenReaderProbe {
    fn name(&self) -> &str {
        SCREEN_READER
    }

    async fn run(&mut self) -> Result<ProbeReport, ProbeError> {
        let mut report = ProbeReport::new(SCREEN_READER);
        let elements = describe_matching(&self.driver, SELECTOR, self.batch).await?;

        for (handle, snapshot) in &elements {
            if is_hidden_input(snapshot) {
                continue;
            }
            report.examined += 1;
            let (identity, key) = positioned_identity(&self.resolver, handle, snapshot).await?;
            let name = self.resolver.accessible_name_of(handle, snapshot).await?;
            let locators = self.resolver.locators_of(handle, snapshot).await?;

            let role = role_of(snapshot);
            if name.source == NameSource::None && !snapshot.is_image() && !is_decorative(snapshot) {
                report.push(
                    Finding::new(
                        "unnamed-control",
                        Severity::Error,
                        format!("<{}> with role '{role}' has no accessible name", snapshot.tag),
                    )
                    .on(key.clone()),
                );
            }

            let mut properties = Properties::new();
            properties.insert(props::TAG.into(), snapshot.tag.clone());
            properties.insert(props::ROLE.into(), role.to_string());
            properties.insert(props::ACCESSIBLE_NAME.into(), name.name.clone());
            properties.insert(props::NAME_SOURCE.into(), name.source.as_str().to_string());
            properties.insert(props::NAME_PRIORITY.into(), name.priority.to_string());
            properties.insert(props::XPATH.into(), locators.primary.expression.clone());
            properties.insert(props::CSS.into(), locators.css_primary.expression.clone());
            if !locators.secondary.is_empty() {
                let secondary: Vec<&str> = locators
                    .secondary
                    .iter()
                    .map(|locator| locator.expression.as_str())
                    .collect();
                properties.insert(props::XPATH_SECONDARY.into(), secondary.join(" | "));
            }
            properties.insert(
                props::DEGRADED.into(),
                flag(identity.is_degraded() || locators.degraded),
            );
            debug!(target: "crawler", id = %key, name = %name.name, "screen reader record");
            self.inventory.entry(key).or_default().extend(properties);
        }

        Ok(report)
    }

    fn inventory(&self) -> Option<&Inventory> {
        Some(&self.inventory)
    }
}

fn is_hidden_input(snapshot: &ElementSnapshot) -> bool {
    snapshot.tag == "input" && snapshot.attr_trimmed("type") == Some("hidden")
}

fn is_decorative(snapshot: &ElementSnapshot) -> bool {
    snapshot.attr_trimmed("aria-hidden") == Some("true")
        || matches!(snapshot.attr_trimmed("role"), Some("presentation" | "none"))
}

/// Explicit `role`, else the implicit role of the tag.
pub fn role_of(snapshot: &ElementSnapshot) -> &str {
    if let Some(role) = snapshot.attr_trimmed("role") {
        return role;
    }
    match snapshot.tag.as_str() {
        "a" if snapshot.attr("href").is_some() => "link",
        "button" => "button",
        "img" => "img",
        "select" => "combobox",
        "textarea" => "textbox",
        "input" => match snapshot.attr_trimmed("type").unwrap_or("text") {
            "checkbox" => "checkbox",
            "radio" => "radio",
            "button" | "submit" | "reset" | "image" => "button",
            "range" => "slider",
            "search" => "searchbox",
            _ => "textbox",
        },
        _ => "generic",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_roles() {
        assert_eq!(role_of(&ElementSnapshot::new("a").with_attr("href", "/")), "link");
        assert_eq!(role_of(&ElementSnapshot::new("a")), "generic");
        assert_eq!(
            role_of(&ElementSnapshot::new("input").with_attr("type", "submit")),
            "button"
        );
        assert_eq!(role_of(&ElementSnapshot::new("input")), "textbox");
        assert_eq!(
            role_of(&ElementSnapshot::new("div").with_attr("role", "tab")),
            "tab"
        );
    }
}

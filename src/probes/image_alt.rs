//! Image text alternatives (WCAG 1.1.1).

use std::sync::Arc;

use a11y_core_types::Properties;
use a11y_scheduler::table::IMAGE_ALT;
use async_trait::async_trait;
use element_identity::{BatchOptions, DocumentDriver, ElementResolver};

use super::{describe_matching, positioned_identity, props};
use crate::errors::ProbeError;
use crate::probe::{Finding, Inventory, Probe, ProbeDeps, ProbeReport, Severity};

/// Alt values that describe nothing.
const GENERIC_ALT_VALUES: &[&str] = &[
    "image",
    "photo",
    "picture",
    "icon",
    "graphic",
    "img",
    "banner",
    "logo",
    "untitled",
    "screenshot",
    "thumbnail",
    "placeholder",
];

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".bmp"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AltStatus {
    Missing,
    Decorative,
    Generic,
    FileName,
    Ok,
}

impl AltStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AltStatus::Missing => "missing",
            AltStatus::Decorative => "decorative",
            AltStatus::Generic => "generic",
            AltStatus::FileName => "filename",
            AltStatus::Ok => "ok",
        }
    }
}

pub fn classify_alt(alt: Option<&str>) -> AltStatus {
    let Some(alt) = alt else {
        return AltStatus::Missing;
    };
    let alt = alt.trim().to_lowercase();
    if alt.is_empty() {
        AltStatus::Decorative
    } else if GENERIC_ALT_VALUES.contains(&alt.as_str()) {
        AltStatus::Generic
    } else if IMAGE_EXTENSIONS.iter().any(|ext| alt.ends_with(ext)) {
        AltStatus::FileName
    } else {
        AltStatus::Ok
    }
}

pub struct ImageAltProbe {
    driver: Arc<dyn DocumentDriver>,
    resolver: Arc<ElementResolver>,
    batch: BatchOptions,
    inventory: Inventory,
}

impl ImageAltProbe {
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
impl Probe for ImageAltProbe {
    fn name(&self) -> &str {
        IMAGE_ALT
    }

    async fn run(&mut self) -> Result<ProbeReport, ProbeError> {
        let mut report = ProbeReport::new(IMAGE_ALT);
        let images = describe_matching(&self.driver, "img", self.batch).await?;

        for (handle, snapshot) in &images {
            report.examined += 1;
            let (_, key) = positioned_identity(&self.resolver, handle, snapshot).await?;
            let alt = snapshot.attr("alt");
            let status = classify_alt(alt);
            let finding = match status {
                AltStatus::Missing => Some(Finding::new(
                    "missing-alt",
                    Severity::Error,
                    "image has no alt attribute; use alt=\"\" for decorative images",
                )),
                AltStatus::Generic => Some(Finding::new(
                    "generic-alt",
                    Severity::Warning,
                    format!("alt text '{}' does not describe the image", alt.unwrap_or_default().trim()),
                )),
                AltStatus::FileName => Some(Finding::new(
                    "filename-alt",
                    Severity::Warning,
                    format!("alt text '{}' looks like a file name", alt.unwrap_or_default().trim()),
                )),
                AltStatus::Decorative | AltStatus::Ok => None,
            };
            if let Some(finding) = finding {
                report.push(finding.on(key.clone()));
            }

            let mut properties = Properties::new();
            properties.insert(props::TAG.into(), snapshot.tag.clone());
            properties.insert(props::ALT.into(), alt.unwrap_or_default().trim().to_string());
            properties.insert(props::ALT_STATUS.into(), status.as_str().to_string());
            self.inventory.entry(key).or_default().extend(properties);
        }

        Ok(report)
    }

    fn inventory(&self) -> Option<&Inventory> {
        Some(&self.inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_alt_values() {
        assert_eq!(classify_alt(None), AltStatus::Missing);
        assert_eq!(classify_alt(Some("  ")), AltStatus::Decorative);
        assert_eq!(classify_alt(Some("Photo")), AltStatus::Generic);
        assert_eq!(classify_alt(Some("IMG_2041.JPG")), AltStatus::FileName);
        assert_eq!(classify_alt(Some("Team at the 2024 offsite")), AltStatus::Ok);
    }
}

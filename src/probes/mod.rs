//! Built-in probes.

use std::sync::Arc;

use a11y_core_types::ElementId;
use a11y_scheduler::table::{HEADINGS, IMAGE_ALT, LINK_PURPOSE, SCREEN_READER, TAB_NAVIGATION};
use element_identity::{
    describe_all, BatchOptions, DocumentDriver, ElementHandle, ElementResolver, ElementSnapshot,
    Identity, Locator,
};
use tracing::debug;

use crate::errors::ProbeError;
use crate::probe::ProbeRegistry;

pub mod headings;
pub mod image_alt;
pub mod link_purpose;
pub mod screen_reader;
pub mod tab_navigation;

pub use headings::HeadingsProbe;
pub use image_alt::ImageAltProbe;
pub use link_purpose::LinkPurposeProbe;
pub use screen_reader::ScreenReaderProbe;
pub use tab_navigation::TabNavigationProbe;

/// Inventory property names shared between producers and consumers.
pub mod props {
    pub const TAG: &str = "tag";
    pub const ROLE: &str = "role";
    pub const ACCESSIBLE_NAME: &str = "accessible_name";
    pub const NAME_SOURCE: &str = "name_source";
    pub const NAME_PRIORITY: &str = "name_priority";
    pub const XPATH: &str = "xpath";
    pub const XPATH_SECONDARY: &str = "xpath_secondary";
    pub const CSS: &str = "css";
    pub const DEGRADED: &str = "degraded";
    pub const ALT: &str = "alt";
    pub const ALT_STATUS: &str = "alt_status";
    pub const HEADING_LEVEL: &str = "heading_level";
    pub const HEADING_TEXT: &str = "heading_text";
    pub const LEVEL_SKIPPED: &str = "level_skipped";
    pub const TAB_INDEX: &str = "tab_index";
    pub const FOCUS_ORDER: &str = "focus_order";
    pub const MATCHED_RECORD: &str = "matched_record";
}

impl ProbeRegistry {
    /// Registry with a factory for every built-in probe.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(SCREEN_READER, |deps| Ok(Box::new(ScreenReaderProbe::new(deps))))
            .register(IMAGE_ALT, |deps| Ok(Box::new(ImageAltProbe::new(deps))))
            .register(HEADINGS, |deps| Ok(Box::new(HeadingsProbe::new(deps))))
            .register(TAB_NAVIGATION, |deps| {
                let bus = deps.require_bus(TAB_NAVIGATION)?;
                Ok(Box::new(TabNavigationProbe::new(deps, bus)))
            })
            .register(LINK_PURPOSE, |deps| {
                let bus = deps.require_bus(LINK_PURPOSE)?;
                Ok(Box::new(LinkPurposeProbe::new(bus)))
            });
        registry
    }
}

/// Queries `selector` and reads every match through batched round trips.
/// Elements that went stale in between are dropped.
pub(crate) async fn describe_matching(
    driver: &Arc<dyn DocumentDriver>,
    selector: &str,
    batch: BatchOptions,
) -> Result<Vec<(ElementHandle, ElementSnapshot)>, ProbeError> {
    let handles = driver.query(&Locator::css(selector)).await?;
    let snapshots = describe_all(Arc::clone(driver), &handles, batch).await?;
    let mut described = Vec::with_capacity(handles.len());
    for (handle, snapshot) in handles.into_iter().zip(snapshots) {
        match snapshot {
            Ok(snapshot) => described.push((handle, snapshot)),
            Err(err) if err.is_stale() => {
                debug!(element = %handle, "skipping stale element");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(described)
}

/// Identity with the element's viewport position appended, so repeated
/// look-alike elements keep distinct records.
pub(crate) async fn positioned_identity(
    resolver: &ElementResolver,
    handle: &ElementHandle,
    snapshot: &ElementSnapshot,
) -> Result<(Identity, ElementId), ProbeError> {
    let identity = resolver.identify_snapshot(handle, snapshot).await?;
    let key = match snapshot.rect {
        Some(rect) => identity.id.with_position(rect.x, rect.y),
        None => identity.id.clone(),
    };
    Ok((identity, key))
}

pub(crate) fn flag(value: bool) -> String {
    value.to_string()
}

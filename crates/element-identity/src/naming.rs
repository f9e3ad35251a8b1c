//! Accessible-name cascade.

use crate::driver::DocumentDriver;
use crate::errors::DriverError;
use crate::identity::xpath_literal;
use crate::model::{AccessibleName, ElementHandle, ElementSnapshot, Locator, NameSource};

/// Resolves the accessible name of an already described element.
///
/// First non-empty source wins: `aria-labelledby`, `aria-label`, own text,
/// image `alt`, then for links the `alt` of a descendant image.
pub async fn resolve_name(
    driver: &dyn DocumentDriver,
    element: &ElementHandle,
    snapshot: &ElementSnapshot,
) -> Result<AccessibleName, DriverError> {
    if let Some(ids) = snapshot.attr_trimmed("aria-labelledby") {
        let name = labelled_by(driver, ids).await?;
        if !name.is_empty() {
            return Ok(AccessibleName::new(name, NameSource::AriaLabelledBy));
        }
    }

    if let Some(label) = snapshot.attr_trimmed("aria-label") {
        return Ok(AccessibleName::new(label, NameSource::AriaLabel));
    }

    let text = snapshot.trimmed_text();
    if !text.is_empty() {
        return Ok(AccessibleName::new(text, NameSource::TextContent));
    }

    if snapshot.is_image() {
        if let Some(alt) = snapshot.attr_trimmed("alt") {
            return Ok(AccessibleName::new(alt, NameSource::Alt));
        }
    }

    if snapshot.is_link() {
        if let Some(alt) = child_image_alt(driver, element).await? {
            return Ok(AccessibleName::new(alt, NameSource::ChildImageAlt));
        }
    }

    Ok(AccessibleName::none())
}

/// Joins the trimmed text of every referenced element with single spaces.
/// Missing or stale references contribute nothing.
async fn labelled_by(driver: &dyn DocumentDriver, ids: &str) -> Result<String, DriverError> {
    let mut targets = Vec::new();
    for id in ids.split_whitespace() {
        let Some(literal) = xpath_literal(id) else { continue };
        let hits = driver
            .query(&Locator::xpath(format!("//*[@id={literal}]")))
            .await?;
        if let Some(first) = hits.first() {
            targets.push(*first);
        }
    }
    if targets.is_empty() {
        return Ok(String::new());
    }

    let parts: Vec<String> = driver
        .describe_batch(&targets)
        .await?
        .into_iter()
        .filter_map(Result::ok)
        .map(|snapshot| snapshot.trimmed_text().to_string())
        .filter(|text| !text.is_empty())
        .collect();
    Ok(parts.join(" "))
}

async fn child_image_alt(
    driver: &dyn DocumentDriver,
    element: &ElementHandle,
) -> Result<Option<String>, DriverError> {
    let images = driver.query_within(element, &Locator::css("img")).await?;
    if images.is_empty() {
        return Ok(None);
    }
    let alt = driver
        .describe_batch(&images)
        .await?
        .into_iter()
        .filter_map(Result::ok)
        .find_map(|image| image.attr_trimmed("alt").map(str::to_string));
    Ok(alt)
}

//! Locator synthesis.
//!
//! The primary locator is id-anchored when possible, otherwise a full path
//! from the document root. Secondaries come from attribute predicates that
//! single the element out, then a parent/child compound.

use crate::driver::DocumentDriver;
use crate::errors::DriverError;
use crate::identity::{css_literal, xpath_literal, MAX_KEY_TEXT};
use crate::model::{ElementHandle, ElementSnapshot, Locator, LocatorSet};

pub const MAX_SECONDARY: usize = 2;
const HREF_CHARS: usize = 50;

pub async fn synthesize(
    driver: &dyn DocumentDriver,
    element: &ElementHandle,
    snapshot: &ElementSnapshot,
) -> Result<LocatorSet, DriverError> {
    let (primary, css_primary) = primary_locators(driver, element, snapshot).await?;
    let (secondary, css_secondary) =
        secondary_locators(driver, element, snapshot, &primary).await?;
    Ok(LocatorSet {
        primary,
        secondary,
        css_primary,
        css_secondary,
        degraded: false,
    })
}

async fn primary_locators(
    driver: &dyn DocumentDriver,
    element: &ElementHandle,
    snapshot: &ElementSnapshot,
) -> Result<(Locator, Locator), DriverError> {
    let tag = snapshot.tag.as_str();
    if let Some(id) = snapshot.id() {
        if let Some(literal) = xpath_literal(id) {
            let anchored = format!("//{tag}[@id={literal}]");
            let hits = driver.query(&Locator::xpath(anchored.clone())).await?;
            if hits.as_slice() == [*element] {
                return Ok((Locator::xpath(anchored), Locator::css(css_id_selector(tag, id))));
            }
            if let Some(pos) = hits.iter().position(|hit| hit == element) {
                // Duplicate id: qualify by document position.
                let (_, css_path) = path_locators(driver, element, snapshot).await?;
                return Ok((
                    Locator::xpath(format!("({anchored})[{}]", pos + 1)),
                    css_path,
                ));
            }
        }
    }
    path_locators(driver, element, snapshot).await
}

/// Walks to the root choosing, per level, a class predicate, a text
/// predicate, or the sibling index, whichever first singles the node out
/// among its same-tag siblings.
pub async fn path_locators(
    driver: &dyn DocumentDriver,
    element: &ElementHandle,
    snapshot: &ElementSnapshot,
) -> Result<(Locator, Locator), DriverError> {
    let mut xpath_steps = Vec::new();
    let mut css_steps = Vec::new();
    let mut current = *element;
    let mut current_snapshot = snapshot.clone();

    loop {
        let Some(parent) = driver.parent(&current).await? else {
            xpath_steps.push(current_snapshot.tag.clone());
            css_steps.push(current_snapshot.tag.clone());
            break;
        };
        let siblings = same_tag_siblings(driver, &parent, &current_snapshot.tag).await?;
        let (xpath_step, css_step) = choose_step(&current, &current_snapshot, &siblings)?;
        xpath_steps.push(xpath_step);
        css_steps.push(css_step);

        current_snapshot = driver.describe(&parent).await?;
        current = parent;
    }

    xpath_steps.reverse();
    css_steps.reverse();
    Ok((
        Locator::xpath(format!("/{}", xpath_steps.join("/"))),
        Locator::css(css_steps.join(" > ")),
    ))
}

async fn same_tag_siblings(
    driver: &dyn DocumentDriver,
    parent: &ElementHandle,
    tag: &str,
) -> Result<Vec<(ElementHandle, ElementSnapshot)>, DriverError> {
    let children = driver.children(parent).await?;
    let snapshots = driver.describe_batch(&children).await?;
    Ok(children
        .into_iter()
        .zip(snapshots)
        .filter_map(|(handle, snapshot)| snapshot.ok().map(|s| (handle, s)))
        .filter(|(_, snapshot)| snapshot.tag == tag)
        .collect())
}

fn choose_step(
    element: &ElementHandle,
    snapshot: &ElementSnapshot,
    siblings: &[(ElementHandle, ElementSnapshot)],
) -> Result<(String, String), DriverError> {
    let tag = snapshot.tag.as_str();
    let position = siblings
        .iter()
        .position(|(handle, _)| handle == element)
        .ok_or_else(|| {
            DriverError::StaleElement(format!("{element} is no longer attached to its parent"))
        })?;
    if siblings.len() == 1 {
        return Ok((tag.to_string(), tag.to_string()));
    }
    let index = position + 1;
    let others = || {
        siblings
            .iter()
            .filter(move |(handle, _)| handle != element)
            .map(|(_, sibling)| sibling)
    };

    if let Some(class) = snapshot.attr("class").filter(|c| !c.trim().is_empty()) {
        if let Some(literal) = xpath_literal(class) {
            if others().all(|sibling| sibling.attr("class") != Some(class)) {
                return Ok((
                    format!("{tag}[@class={literal}]"),
                    format!("{tag}[class={}]", css_literal(class)),
                ));
            }
        }
    }

    let text = snapshot.trimmed_text();
    if !text.is_empty() && text.chars().count() <= MAX_KEY_TEXT {
        if let Some(literal) = xpath_literal(text) {
            if others().all(|sibling| !sibling.text.contains(text)) {
                return Ok((
                    format!("{tag}[contains(normalize-space(.), {literal})]"),
                    format!("{tag}:nth-of-type({index})"),
                ));
            }
        }
    }

    Ok((format!("{tag}[{index}]"), format!("{tag}:nth-of-type({index})")))
}

/// Attribute predicate usable as a document-wide secondary locator.
struct Candidate {
    xpath: String,
    css: String,
}

fn candidates(snapshot: &ElementSnapshot) -> Vec<Candidate> {
    let tag = snapshot.tag.as_str();
    let mut out = Vec::new();
    let mut exact = |attr: &str, value: &str| {
        if let Some(literal) = xpath_literal(value) {
            out.push(Candidate {
                xpath: format!("//{tag}[@{attr}={literal}]"),
                css: format!("{tag}[{attr}={}]", css_literal(value)),
            });
        }
    };

    if let Some(class) = snapshot.attr("class").filter(|c| !c.trim().is_empty()) {
        exact("class", class);
    }
    for attr in ["name", "type"] {
        if let Some(value) = snapshot.attr_trimmed(attr) {
            exact(attr, value);
        }
    }
    let mut partial = Vec::new();
    for token in snapshot.classes() {
        partial.push(("class", token.to_string()));
    }
    if let Some(href) = snapshot.attr_trimmed("href") {
        partial.push(("href", href.chars().take(HREF_CHARS).collect()));
    }
    for (attr, value) in partial {
        if let Some(literal) = xpath_literal(&value) {
            out.push(Candidate {
                xpath: format!("//{tag}[contains(@{attr}, {literal})]"),
                css: format!("{tag}[{attr}*={}]", css_literal(&value)),
            });
        }
    }

    let mut exact = |attr: &str, value: &str| {
        if let Some(literal) = xpath_literal(value) {
            out.push(Candidate {
                xpath: format!("//{tag}[@{attr}={literal}]"),
                css: format!("{tag}[{attr}={}]", css_literal(value)),
            });
        }
    };
    if let Some(role) = snapshot.attr_trimmed("role") {
        exact("role", role);
    }
    for (name, value) in &snapshot.attributes {
        if name.starts_with("aria-") && name != "aria-hidden" && !value.trim().is_empty() {
            exact(name, value.trim());
        }
    }
    out
}

async fn secondary_locators(
    driver: &dyn DocumentDriver,
    element: &ElementHandle,
    snapshot: &ElementSnapshot,
    primary: &Locator,
) -> Result<(Vec<Locator>, Vec<Locator>), DriverError> {
    let mut xpaths: Vec<Locator> = Vec::new();
    let mut css = Vec::new();

    for candidate in candidates(snapshot) {
        if xpaths.len() >= MAX_SECONDARY {
            break;
        }
        if candidate.xpath == primary.expression
            || xpaths.iter().any(|l| l.expression == candidate.xpath)
        {
            continue;
        }
        let locator = Locator::xpath(candidate.xpath);
        if resolves_to(driver, &locator, element).await? {
            xpaths.push(locator);
            let css_locator = Locator::css(candidate.css);
            if resolves_to(driver, &css_locator, element).await? {
                css.push(css_locator);
            }
        }
    }

    if xpaths.len() < MAX_SECONDARY {
        if let Some(parent) = driver.parent(element).await? {
            let parent_tag = driver.describe(&parent).await?.tag;
            let compound = format!("//{parent_tag}/{}", snapshot.tag);
            let hits = driver.query(&Locator::xpath(compound.clone())).await?;
            if let Some(pos) = hits.iter().position(|hit| hit == element) {
                let (expression, css_expression) = if hits.len() == 1 {
                    (compound, format!("{parent_tag} > {}", snapshot.tag))
                } else {
                    let siblings = same_tag_siblings(driver, &parent, &snapshot.tag).await?;
                    let index = siblings
                        .iter()
                        .position(|(handle, _)| handle == element)
                        .map_or(0, |i| i + 1);
                    (
                        format!("({compound})[{}]", pos + 1),
                        format!("{parent_tag} > {}:nth-of-type({index})", snapshot.tag),
                    )
                };
                if expression != primary.expression {
                    xpaths.push(Locator::xpath(expression));
                    // nth-of-type counts per parent, so it can match cousins too.
                    let css_locator = Locator::css(css_expression);
                    if resolves_to(driver, &css_locator, element).await? {
                        css.push(css_locator);
                    }
                }
            }
        }
    }

    Ok((xpaths, css))
}

async fn resolves_to(
    driver: &dyn DocumentDriver,
    locator: &Locator,
    element: &ElementHandle,
) -> Result<bool, DriverError> {
    Ok(driver.query(locator).await?.as_slice() == [*element])
}

fn css_id_selector(tag: &str, id: &str) -> String {
    if is_css_identifier(id) {
        format!("{tag}#{id}")
    } else {
        format!("{tag}[id={}]", css_literal(id))
    }
}

fn is_css_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    let first_ok = match chars.next() {
        Some(c) => c.is_ascii_alphabetic() || c == '_',
        None => false,
    };
    first_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

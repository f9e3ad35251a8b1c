//! Identity keys.
//!
//! Rules in order, first match wins: unique `id`, short text, link `href`,
//! first class token, control `type`, structural hash. Keys from the last
//! rule are flagged degraded.

use sha2::{Digest, Sha256};

use crate::driver::DocumentDriver;
use crate::errors::DriverError;
use crate::model::{
    collapse_whitespace, truncate_chars, ElementHandle, ElementId, ElementSnapshot, Identity,
    IdentityRule, Locator,
};

/// Own text longer than this is not used as a key.
pub const MAX_KEY_TEXT: usize = 50;
/// Characters of text kept in a text key.
pub const KEY_TEXT_CHARS: usize = 30;
pub const KEY_HREF_CHARS: usize = 50;
/// Hex digits of the structural digest kept in a key.
const HASH_HEX_CHARS: usize = 16;

/// Derives the identity key for an already described element.
pub async fn identity_key(
    driver: &dyn DocumentDriver,
    element: &ElementHandle,
    snapshot: &ElementSnapshot,
) -> Result<Identity, DriverError> {
    let tag = snapshot.tag.as_str();

    if let Some(id) = snapshot.id() {
        if id_is_unique(driver, id).await? {
            return Ok(Identity::new(format!("{tag}#{id}"), IdentityRule::Id));
        }
    }

    let text = snapshot.trimmed_text();
    if !text.is_empty() && text.chars().count() <= MAX_KEY_TEXT {
        let short = truncate_chars(&collapse_whitespace(text), KEY_TEXT_CHARS);
        return Ok(Identity::new(format!("{tag}[text='{short}']"), IdentityRule::Text));
    }

    if snapshot.is_link() {
        if let Some(href) = snapshot.attr_trimmed("href") {
            let href = truncate_chars(href, KEY_HREF_CHARS);
            return Ok(Identity::new(format!("{tag}[href='{href}']"), IdentityRule::Href));
        }
    }

    if let Some(first) = snapshot.classes().first() {
        return Ok(Identity::new(format!("{tag}.{first}"), IdentityRule::Class));
    }

    if snapshot.is_control() {
        if let Some(kind) = snapshot.attr_trimmed("type") {
            return Ok(Identity::new(
                format!("{tag}[type='{kind}']"),
                IdentityRule::ControlType,
            ));
        }
    }

    let path = ancestor_path(driver, element).await?;
    let digest = structural_digest(&path, snapshot);
    Ok(Identity::new(
        format!("{tag}[{digest}]"),
        IdentityRule::StructuralHash,
    ))
}

/// Key used when the element went stale after its snapshot was taken.
pub fn stale_key(snapshot: &ElementSnapshot) -> Identity {
    let digest = structural_digest(&[], snapshot);
    Identity::new(format!("{}[{digest}]", snapshot.tag), IdentityRule::Stale)
}

/// Key used when nothing could be read from the element.
pub fn unreadable_key(element: &ElementHandle) -> Identity {
    Identity::new(format!("*[stale-{}]", element.0), IdentityRule::Stale)
}

pub(crate) async fn id_is_unique(driver: &dyn DocumentDriver, id: &str) -> Result<bool, DriverError> {
    match xpath_literal(id) {
        Some(literal) => {
            let hits = driver
                .query(&Locator::xpath(format!("//*[@id={literal}]")))
                .await?;
            Ok(hits.len() == 1)
        }
        None => Ok(false),
    }
}

/// One step of the chain from the document root down to an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathStep {
    pub tag: String,
    /// 1-based position among same-tag siblings.
    pub index: usize,
}

/// Tag and same-tag sibling index of every level, root first.
pub async fn ancestor_path(
    driver: &dyn DocumentDriver,
    element: &ElementHandle,
) -> Result<Vec<PathStep>, DriverError> {
    let mut steps = Vec::new();
    let mut current = *element;
    loop {
        let tag = driver.describe(&current).await?.tag;
        let parent = driver.parent(&current).await?;
        let index = match parent {
            Some(parent) => {
                let siblings = driver.children(&parent).await?;
                same_tag_index(driver, &siblings, &current, &tag).await?
            }
            None => 1,
        };
        steps.push(PathStep { tag, index });
        match parent {
            Some(parent) => current = parent,
            None => break,
        }
    }
    steps.reverse();
    Ok(steps)
}

async fn same_tag_index(
    driver: &dyn DocumentDriver,
    siblings: &[ElementHandle],
    element: &ElementHandle,
    tag: &str,
) -> Result<usize, DriverError> {
    let snapshots = driver.describe_batch(siblings).await?;
    let mut index = 0;
    for (handle, snapshot) in siblings.iter().zip(snapshots) {
        let Ok(snapshot) = snapshot else { continue };
        if snapshot.tag == tag {
            index += 1;
        }
        if handle == element {
            return Ok(index.max(1));
        }
    }
    Err(DriverError::StaleElement(format!(
        "{element} is no longer a child of its parent"
    )))
}

/// SHA-256 over the ancestor chain and sorted attribute names.
///
/// Distinct elements at the same chain position with the same attribute
/// names still collide, which is why callers treat these keys as inconclusive.
pub fn structural_digest(path: &[PathStep], snapshot: &ElementSnapshot) -> String {
    let mut hasher = Sha256::new();
    for step in path {
        hasher.update(step.tag.as_bytes());
        hasher.update(b":");
        hasher.update(step.index.to_string().as_bytes());
        hasher.update(b"/");
    }
    hasher.update(b"|");
    // BTreeMap keys are already sorted
    for name in snapshot.attributes.keys() {
        hasher.update(name.as_bytes());
        hasher.update(b",");
    }
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(HASH_HEX_CHARS);
    for byte in digest.iter().take(HASH_HEX_CHARS / 2) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Quotes `value` as an XPath 1.0 string literal, `None` when it holds both quote kinds.
pub fn xpath_literal(value: &str) -> Option<String> {
    if !value.contains('\'') {
        Some(format!("'{value}'"))
    } else if !value.contains('"') {
        Some(format!("\"{value}\""))
    } else {
        None
    }
}

/// Quotes `value` as a CSS string.
pub fn css_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Finds the candidate matching `target`.
///
/// Exact normalized matches win; among several the one nearest to the target's
/// position suffix is chosen. Otherwise a candidate whose base contains, or is
/// contained in, the target's base is accepted.
pub fn find_matching<'a, I>(target: &ElementId, candidates: I) -> Option<&'a ElementId>
where
    I: IntoIterator<Item = &'a ElementId>,
{
    let candidates: Vec<&ElementId> = candidates.into_iter().collect();
    let wanted = target.normalized();
    let exact: Vec<&ElementId> = candidates
        .iter()
        .copied()
        .filter(|candidate| candidate.normalized() == wanted)
        .collect();
    if !exact.is_empty() {
        return nearest(target, exact);
    }

    if wanted.is_empty() {
        return None;
    }
    let fuzzy: Vec<&ElementId> = candidates
        .into_iter()
        .filter(|candidate| {
            let base = candidate.normalized();
            !base.is_empty() && (base.contains(&wanted) || wanted.contains(&base))
        })
        .collect();
    nearest(target, fuzzy)
}

fn nearest<'a>(target: &ElementId, candidates: Vec<&'a ElementId>) -> Option<&'a ElementId> {
    let Some((tx, ty)) = target.position() else {
        return candidates.into_iter().next();
    };
    candidates.into_iter().min_by_key(|candidate| match candidate.position() {
        Some((x, y)) => (x - tx).abs().saturating_add((y - ty).abs()),
        None => i64::MAX,
    })
}

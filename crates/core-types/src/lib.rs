use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

/// Separator between an identity key and its optional viewport-position suffix.
pub const POSITION_MARKER: &str = "|pos=";

/// Per-element findings exchanged between probes.
pub type Properties = BTreeMap<String, String>;

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque, deterministic key for a document element.
///
/// The key grammar is produced by the identity resolver (`tag#id`,
/// `tag[text='...']`, `tag[href='...']`, `tag.class`, `tag[type='...']`,
/// `tag[<hash>]`), optionally followed by `|pos=<x>,<y>`.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends a rounded viewport position, replacing any existing suffix.
    pub fn with_position(&self, x: f64, y: f64) -> Self {
        Self(format!(
            "{}{}{},{}",
            self.base(),
            POSITION_MARKER,
            x.round() as i64,
            y.round() as i64
        ))
    }

    /// The key without its position suffix.
    pub fn base(&self) -> &str {
        match self.0.find(POSITION_MARKER) {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }

    pub fn position(&self) -> Option<(i64, i64)> {
        let idx = self.0.find(POSITION_MARKER)?;
        let raw = &self.0[idx + POSITION_MARKER.len()..];
        let (x, y) = raw.split_once(',')?;
        Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
    }

    /// Position suffix stripped, lowercased. Used for tolerant comparison.
    pub fn normalized(&self) -> String {
        self.base().to_lowercase()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One entry of the ordered focus list.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FocusableEntry {
    pub id: ElementId,
    pub properties: Properties,
}

impl FocusableEntry {
    pub fn new(id: ElementId, properties: Properties) -> Self {
        Self { id, properties }
    }
}

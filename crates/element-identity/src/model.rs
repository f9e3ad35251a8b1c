use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use a11y_core_types::ElementId;

/// Opaque reference to a live document element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementHandle(pub u64);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Single round-trip read of an element: tag, attributes, text, geometry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Lowercase tag name.
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Rendered text of the element and its descendants, whitespace-collapsed.
    pub text: String,
    pub rect: Option<Rect>,
}

impl ElementSnapshot {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = collapse_whitespace(text);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute value trimmed, `None` when absent or blank.
    pub fn attr_trimmed(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr_trimmed("id")
    }

    pub fn class(&self) -> Option<&str> {
        self.attr_trimmed("class")
    }

    pub fn classes(&self) -> Vec<&str> {
        self.class()
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    pub fn is_image(&self) -> bool {
        self.tag == "img"
    }

    pub fn is_link(&self) -> bool {
        self.tag == "a"
    }

    pub fn is_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "button" | "select" | "textarea")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocatorKind {
    XPath,
    Css,
}

impl LocatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            LocatorKind::XPath => "xpath",
            LocatorKind::Css => "css",
        }
    }
}

/// Structural query that re-finds an element through the document driver.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub kind: LocatorKind,
    pub expression: String,
}

impl Locator {
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self {
            kind: LocatorKind::XPath,
            expression: expression.into(),
        }
    }

    pub fn css(expression: impl Into<String>) -> Self {
        Self {
            kind: LocatorKind::Css,
            expression: expression.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.name(), self.expression)
    }
}

/// One primary and up to two secondary locators, in XPath and CSS syntax.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorSet {
    pub primary: Locator,
    pub secondary: Vec<Locator>,
    pub css_primary: Locator,
    pub css_secondary: Vec<Locator>,
    /// Some locator fell back to a best-effort value.
    pub degraded: bool,
}

impl LocatorSet {
    /// Bare-tag fallback used when the element went stale.
    pub fn fallback(tag: &str) -> Self {
        let tag = if tag.is_empty() { "*" } else { tag };
        Self {
            primary: Locator::xpath(format!("//{tag}")),
            secondary: Vec::new(),
            css_primary: Locator::css(tag),
            css_secondary: Vec::new(),
            degraded: true,
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &Locator> + '_ {
        std::iter::once(&self.primary)
            .chain(self.secondary.iter())
            .chain(std::iter::once(&self.css_primary))
            .chain(self.css_secondary.iter())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameSource {
    AriaLabelledBy,
    AriaLabel,
    TextContent,
    Alt,
    ChildImageAlt,
    None,
}

impl NameSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NameSource::AriaLabelledBy => "aria-labelledby",
            NameSource::AriaLabel => "aria-label",
            NameSource::TextContent => "text_content",
            NameSource::Alt => "alt",
            NameSource::ChildImageAlt => "alt (img enfant)",
            NameSource::None => "none",
        }
    }

    /// Cascade rank; 0 means no name was found.
    pub fn priority(&self) -> u8 {
        match self {
            NameSource::AriaLabelledBy => 1,
            NameSource::AriaLabel => 2,
            NameSource::TextContent => 3,
            NameSource::Alt | NameSource::ChildImageAlt => 4,
            NameSource::None => 0,
        }
    }
}

impl fmt::Display for NameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibleName {
    pub name: String,
    pub source: NameSource,
    pub priority: u8,
}

impl AccessibleName {
    pub fn new(name: impl Into<String>, source: NameSource) -> Self {
        Self {
            name: name.into(),
            source,
            priority: source.priority(),
        }
    }

    pub fn none() -> Self {
        Self::new(String::new(), NameSource::None)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

/// Which identity rule produced a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityRule {
    Id,
    Text,
    Href,
    Class,
    ControlType,
    StructuralHash,
    /// Element went stale before any attribute could be read.
    Stale,
}

impl IdentityRule {
    pub fn name(&self) -> &'static str {
        match self {
            IdentityRule::Id => "id",
            IdentityRule::Text => "text",
            IdentityRule::Href => "href",
            IdentityRule::Class => "class",
            IdentityRule::ControlType => "type",
            IdentityRule::StructuralHash => "structural-hash",
            IdentityRule::Stale => "stale",
        }
    }

    /// Keys from these rules do not prove two elements are the same.
    pub fn is_degraded(&self) -> bool {
        matches!(self, IdentityRule::StructuralHash | IdentityRule::Stale)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: ElementId,
    pub rule: IdentityRule,
}

impl Identity {
    pub fn new(id: impl Into<ElementId>, rule: IdentityRule) -> Self {
        Self {
            id: id.into(),
            rule,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.rule.is_degraded()
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_sources_carry_rank() {
        assert_eq!(AccessibleName::new("x", NameSource::AriaLabelledBy).priority, 1);
        assert_eq!(AccessibleName::new("x", NameSource::ChildImageAlt).priority, 4);
        assert_eq!(NameSource::ChildImageAlt.as_str(), "alt (img enfant)");
        assert_eq!(AccessibleName::none().priority, 0);
    }

    #[test]
    fn snapshot_helpers() {
        let snap = ElementSnapshot::new("DIV")
            .with_attr("class", "  card  featured ")
            .with_text("  Hello \n  world ");
        assert_eq!(snap.tag, "div");
        assert_eq!(snap.classes(), vec!["card", "featured"]);
        assert_eq!(snap.text, "Hello world");
        assert_eq!(snap.id(), None);
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_chars("éàü-abc", 3), "éàü");
    }
}

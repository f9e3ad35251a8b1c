use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use element_identity::{
    collapse_whitespace, DocumentDriver, DriverError, ElementHandle, ElementSnapshot, Locator,
    LocatorKind, Rect,
};
use parking_lot::RwLock;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::xpath::{parse_xpath, NodeTree};

#[derive(Clone, Debug)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
    depth: usize,
}

/// A parsed HTML document served through [`DocumentDriver`].
///
/// Handles are pre-order indices. [`detach`](Self::detach) removes a subtree
/// so that its handles go stale, like nodes removed from a live page.
pub struct StaticDocument {
    source: String,
    nodes: Vec<Node>,
    detached: RwLock<HashSet<usize>>,
    round_trips: AtomicU64,
}

impl StaticDocument {
    pub fn parse(source: &str) -> Self {
        let html = Html::parse_document(source);
        let mut nodes: Vec<Node> = Vec::new();
        let mut index_of = HashMap::new();

        for element in html.root_element().descendants().filter_map(ElementRef::wrap) {
            let index = nodes.len();
            index_of.insert(element.id(), index);
            let parent = element
                .parent()
                .and_then(|parent| index_of.get(&parent.id()).copied());
            let depth = parent.map_or(0, |parent| nodes[parent].depth + 1);
            if let Some(parent) = parent {
                nodes[parent].children.push(index);
            }
            nodes.push(Node {
                tag: element.value().name().to_ascii_lowercase(),
                attributes: element
                    .value()
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
                text: collapse_whitespace(&element.text().collect::<String>()),
                parent,
                children: Vec::new(),
                depth,
            });
        }
        debug!(elements = nodes.len(), "parsed static document");

        Self {
            source: source.to_string(),
            nodes,
            detached: RwLock::new(HashSet::new()),
            round_trips: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Driver calls served so far; a batched read counts once.
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    /// Removes `handle` and its subtree from the live document.
    pub fn detach(&self, handle: ElementHandle) {
        let mut detached = self.detached.write();
        let mut stack = vec![handle.0 as usize];
        while let Some(index) = stack.pop() {
            if let Some(node) = self.nodes.get(index) {
                detached.insert(index);
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// CSS matches in document order, without counting a round trip.
    pub fn select(&self, css: &str) -> Result<Vec<ElementHandle>, DriverError> {
        Ok(self.select_css(css)?.into_iter().map(handle).collect())
    }

    /// First CSS match, for test setup.
    pub fn first(&self, css: &str) -> Option<ElementHandle> {
        self.select(css).ok().and_then(|hits| hits.into_iter().next())
    }

    fn trip(&self) {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
    }

    fn live(&self, element: &ElementHandle) -> Result<usize, DriverError> {
        let index = element.0 as usize;
        if index >= self.nodes.len() || self.detached.read().contains(&index) {
            return Err(DriverError::StaleElement(element.to_string()));
        }
        Ok(index)
    }

    fn select_css(&self, css: &str) -> Result<Vec<usize>, DriverError> {
        let selector = Selector::parse(css)
            .map_err(|err| DriverError::query(Locator::css(css), err.to_string()))?;
        // Html is not Send, so it is rebuilt per query instead of stored.
        let html = Html::parse_document(&self.source);
        let index_of: HashMap<_, usize> = html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .enumerate()
            .map(|(index, element)| (element.id(), index))
            .collect();
        let detached = self.detached.read();
        let mut hits: Vec<usize> = html
            .select(&selector)
            .filter_map(|element| index_of.get(&element.id()).copied())
            .filter(|index| !detached.contains(index))
            .collect();
        hits.sort_unstable();
        hits.dedup();
        Ok(hits)
    }

    fn evaluate(&self, locator: &Locator, scope: Option<usize>) -> Result<Vec<usize>, DriverError> {
        let mut hits = match locator.kind {
            LocatorKind::Css => self.select_css(&locator.expression)?,
            LocatorKind::XPath => {
                let expr = parse_xpath(&locator.expression)
                    .map_err(|reason| DriverError::query(locator, reason))?;
                let detached = self.detached.read();
                let tree = LiveTree {
                    nodes: &self.nodes,
                    detached: &detached,
                };
                expr.evaluate(&tree, scope)
            }
        };
        if let Some(scope) = scope {
            hits.retain(|index| self.is_descendant(*index, scope));
        }
        Ok(hits)
    }

    fn is_descendant(&self, mut node: usize, ancestor: usize) -> bool {
        while let Some(parent) = self.nodes[node].parent {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    fn snapshot(&self, element: &ElementHandle) -> Result<ElementSnapshot, DriverError> {
        let index = self.live(element)?;
        let node = &self.nodes[index];
        let rect = node
            .attributes
            .get("data-rect")
            .and_then(|value| parse_rect(value))
            .unwrap_or(Rect {
                x: node.depth as f64 * 10.0,
                y: index as f64 * 20.0,
                width: 100.0,
                height: 18.0,
            });
        Ok(ElementSnapshot {
            tag: node.tag.clone(),
            attributes: node.attributes.clone(),
            text: node.text.clone(),
            rect: Some(rect),
        })
    }
}

#[async_trait]
impl DocumentDriver for StaticDocument {
    async fn query(&self, locator: &Locator) -> Result<Vec<ElementHandle>, DriverError> {
        self.trip();
        Ok(self.evaluate(locator, None)?.into_iter().map(handle).collect())
    }

    async fn query_within(
        &self,
        scope: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        self.trip();
        let scope = self.live(scope)?;
        Ok(self
            .evaluate(locator, Some(scope))?
            .into_iter()
            .map(handle)
            .collect())
    }

    async fn describe(&self, element: &ElementHandle) -> Result<ElementSnapshot, DriverError> {
        self.trip();
        self.snapshot(element)
    }

    async fn parent(&self, element: &ElementHandle) -> Result<Option<ElementHandle>, DriverError> {
        self.trip();
        let index = self.live(element)?;
        Ok(self.nodes[index].parent.map(handle))
    }

    async fn children(&self, element: &ElementHandle) -> Result<Vec<ElementHandle>, DriverError> {
        self.trip();
        let index = self.live(element)?;
        let detached = self.detached.read();
        Ok(self.nodes[index]
            .children
            .iter()
            .filter(|child| !detached.contains(*child))
            .map(|child| handle(*child))
            .collect())
    }

    async fn describe_batch(
        &self,
        elements: &[ElementHandle],
    ) -> Result<Vec<Result<ElementSnapshot, DriverError>>, DriverError> {
        self.trip();
        Ok(elements.iter().map(|element| self.snapshot(element)).collect())
    }
}

struct LiveTree<'a> {
    nodes: &'a [Node],
    detached: &'a HashSet<usize>,
}

impl NodeTree for LiveTree<'_> {
    fn roots(&self) -> Vec<usize> {
        if self.nodes.is_empty() || self.detached.contains(&0) {
            Vec::new()
        } else {
            vec![0]
        }
    }

    fn children(&self, node: usize) -> Vec<usize> {
        self.nodes[node]
            .children
            .iter()
            .copied()
            .filter(|child| !self.detached.contains(child))
            .collect()
    }

    fn tag(&self, node: usize) -> &str {
        &self.nodes[node].tag
    }

    fn attr(&self, node: usize, name: &str) -> Option<&str> {
        self.nodes[node].attributes.get(name).map(String::as_str)
    }

    fn text(&self, node: usize) -> &str {
        &self.nodes[node].text
    }
}

fn handle(index: usize) -> ElementHandle {
    ElementHandle(index as u64)
}

/// `data-rect="x,y,width,height"`
fn parse_rect(value: &str) -> Option<Rect> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [x, y, width, height] => Some(Rect {
            x: *x,
            y: *y,
            width: *width,
            height: *height,
        }),
        _ => None,
    }
}

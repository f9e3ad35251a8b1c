//! Shared data bus for one crawl run.
//!
//! Producers `put` per-element properties keyed by [`ElementId`]; consumers
//! in later phases `get` them back. A second, append-only list keeps
//! focusable elements in focus order. All state lives for a single run and
//! is cleared by [`SharedDataBus::reset`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

pub use a11y_core_types::{ElementId, FocusableEntry, Properties};

pub trait SharedDataBus: Send + Sync {
    /// Merges `properties` into the record for `id`, last write wins per key.
    fn put(&self, id: ElementId, properties: Properties);

    /// Stored properties, or an empty map when `id` is unknown.
    fn get(&self, id: &ElementId) -> Properties;

    fn contains(&self, id: &ElementId) -> bool;

    /// Appends to the focus-ordered list. Duplicate identifiers are kept.
    fn append_focusable(&self, id: ElementId, properties: Properties);

    fn focusables(&self) -> Vec<FocusableEntry>;

    /// Every record, ordered by identifier.
    fn records(&self) -> BTreeMap<ElementId, Properties>;

    fn ids(&self) -> Vec<ElementId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn reset(&self);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusStats {
    pub puts: u64,
    pub merges: u64,
    pub focusables: u64,
}

#[derive(Default)]
pub struct InMemoryDataBus {
    records: DashMap<ElementId, Properties>,
    focusables: Mutex<Vec<FocusableEntry>>,
    puts: AtomicU64,
    merges: AtomicU64,
}

impl InMemoryDataBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            puts: self.puts.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
            focusables: self.focusables.lock().len() as u64,
        }
    }
}

impl SharedDataBus for InMemoryDataBus {
    fn put(&self, id: ElementId, properties: Properties) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        let mut entry = self.records.entry(id).or_default();
        if !entry.is_empty() {
            self.merges.fetch_add(1, Ordering::Relaxed);
        }
        entry.extend(properties);
    }

    fn get(&self, id: &ElementId) -> Properties {
        self.records
            .get(id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn contains(&self, id: &ElementId) -> bool {
        self.records.contains_key(id)
    }

    fn append_focusable(&self, id: ElementId, properties: Properties) {
        self.focusables
            .lock()
            .push(FocusableEntry::new(id, properties));
    }

    fn focusables(&self) -> Vec<FocusableEntry> {
        self.focusables.lock().clone()
    }

    fn records(&self) -> BTreeMap<ElementId, Properties> {
        self.records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn ids(&self) -> Vec<ElementId> {
        let mut ids: Vec<ElementId> = self.records.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn reset(&self) {
        let records = self.records.len();
        let mut focusables = self.focusables.lock();
        debug!(records, focusables = focusables.len(), "data bus reset");
        self.records.clear();
        focusables.clear();
        self.puts.store(0, Ordering::Relaxed);
        self.merges.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn put_merges_instead_of_replacing() {
        let bus = InMemoryDataBus::new();
        let key = ElementId::new("a[text='Home']");
        bus.put(key.clone(), props(&[("a", "1")]));
        bus.put(key.clone(), props(&[("b", "2")]));
        assert_eq!(bus.get(&key), props(&[("a", "1"), ("b", "2")]));
        assert_eq!(bus.stats().merges, 1);
    }

    #[test]
    fn put_last_write_wins_per_key() {
        let bus = InMemoryDataBus::new();
        let key = ElementId::new("button#go");
        bus.put(key.clone(), props(&[("name", "Go"), ("role", "button")]));
        bus.put(key.clone(), props(&[("name", "Submit")]));
        assert_eq!(bus.get(&key), props(&[("name", "Submit"), ("role", "button")]));
    }

    #[test]
    fn get_unknown_is_empty() {
        let bus = InMemoryDataBus::new();
        assert!(bus.get(&ElementId::new("nav.main")).is_empty());
        assert!(!bus.contains(&ElementId::new("nav.main")));
    }

    #[test]
    fn focusables_keep_order_and_duplicates() {
        let bus = InMemoryDataBus::new();
        bus.append_focusable(ElementId::new("a.x"), props(&[("order", "1")]));
        bus.append_focusable(ElementId::new("input[type='text']"), props(&[("order", "2")]));
        bus.append_focusable(ElementId::new("a.x"), props(&[("order", "3")]));
        let ids: Vec<String> = bus.focusables().into_iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec!["a.x", "input[type='text']", "a.x"]);
    }

    #[test]
    fn reset_clears_everything() {
        let bus = InMemoryDataBus::new();
        bus.put(ElementId::new("h1"), props(&[("level", "1")]));
        bus.append_focusable(ElementId::new("a.x"), Properties::new());
        bus.reset();
        assert!(bus.is_empty());
        assert!(bus.focusables().is_empty());
        assert_eq!(bus.stats(), BusStats::default());
    }
}

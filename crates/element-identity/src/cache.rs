use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use crate::identity::MAX_KEY_TEXT;
use crate::model::{truncate_chars, ElementSnapshot, LocatorSet};

/// What a locator computation is memoized under.
///
/// Two elements can share a key (same tag, no id or class, same leading
/// text), so a cached entry must be re-verified before it is trusted.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LocatorCacheKey {
    pub tag: String,
    pub id: Option<String>,
    pub class: Option<String>,
    pub text: String,
}

impl LocatorCacheKey {
    pub fn from_snapshot(snapshot: &ElementSnapshot) -> Self {
        Self {
            tag: snapshot.tag.clone(),
            id: snapshot.id().map(str::to_string),
            class: snapshot.class().map(str::to_string),
            text: truncate_chars(snapshot.trimmed_text(), MAX_KEY_TEXT),
        }
    }
}

/// Per-run locator memo. Cleared at run start, never bounded or persisted.
#[derive(Default)]
pub struct LocatorCache {
    entries: DashMap<LocatorCacheKey, LocatorSet>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LocatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &LocatorCacheKey) -> Option<LocatorSet> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn put(&self, key: LocatorCacheKey, locators: LocatorSet) {
        if locators.degraded {
            return;
        }
        self.entries.insert(key, locators);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheMetric {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheMetric {
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct CacheMetric {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Locator;

    fn set(expr: &str) -> LocatorSet {
        LocatorSet {
            primary: Locator::xpath(expr),
            secondary: vec![],
            css_primary: Locator::css("a"),
            css_secondary: vec![],
            degraded: false,
        }
    }

    #[test]
    fn key_truncates_text_and_ignores_other_attributes() {
        let long = "x".repeat(80);
        let a = ElementSnapshot::new("p").with_text(&long).with_attr("title", "a");
        let b = ElementSnapshot::new("p").with_text(&long).with_attr("title", "b");
        let key = LocatorCacheKey::from_snapshot(&a);
        assert_eq!(key.text.len(), MAX_KEY_TEXT);
        assert_eq!(key, LocatorCacheKey::from_snapshot(&b));
    }

    #[test]
    fn degraded_sets_are_not_cached() {
        let cache = LocatorCache::new();
        let key = LocatorCacheKey::from_snapshot(&ElementSnapshot::new("a"));
        cache.put(key.clone(), LocatorSet::fallback("a"));
        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), set("//a"));
        assert_eq!(cache.get(&key).map(|s| s.primary), Some(Locator::xpath("//a")));
    }

    #[test]
    fn clear_resets_counters() {
        let cache = LocatorCache::new();
        cache.record_hit();
        cache.record_miss();
        cache.record_miss();
        assert!((cache.stats().hit_rate - 1.0 / 3.0).abs() < 1e-9);
        cache.clear();
        assert_eq!(cache.stats(), CacheMetric::default());
    }
}

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheMetric, LocatorCache, LocatorCacheKey};
use crate::driver::DocumentDriver;
use crate::errors::DriverError;
use crate::identity::{identity_key, stale_key, unreadable_key};
use crate::locators::synthesize;
use crate::model::{
    AccessibleName, ElementHandle, ElementId, ElementSnapshot, Identity, Locator, LocatorSet,
};
use crate::naming::resolve_name;

/// Counters for one run of the resolver.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ResolverMetrics {
    pub locator_cache: CacheMetric,
    pub stale_handles: u64,
    pub degraded_identities: usize,
}

/// Derives identity keys, accessible names and locators for elements of one
/// document, memoizing locators for the current run.
///
/// Stale handles never surface as errors: the affected value falls back to a
/// best-effort result and a warning is logged. Other driver errors propagate.
pub struct ElementResolver {
    driver: Arc<dyn DocumentDriver>,
    cache: LocatorCache,
    degraded: Mutex<BTreeSet<ElementId>>,
    stale: AtomicU64,
}

impl ElementResolver {
    pub fn new(driver: Arc<dyn DocumentDriver>) -> Self {
        Self {
            driver,
            cache: LocatorCache::new(),
            degraded: Mutex::new(BTreeSet::new()),
            stale: AtomicU64::new(0),
        }
    }

    pub fn driver(&self) -> &Arc<dyn DocumentDriver> {
        &self.driver
    }

    /// Drops all per-run state. Call once at run start.
    pub fn reset(&self) {
        self.cache.clear();
        self.degraded.lock().clear();
        self.stale.store(0, Ordering::Relaxed);
    }

    pub async fn describe(&self, element: &ElementHandle) -> Result<Option<ElementSnapshot>, DriverError> {
        match self.driver.describe(element).await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) if err.is_stale() => {
                self.note_stale(element, "describe", &err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn identify(&self, element: &ElementHandle) -> Result<Identity, DriverError> {
        match self.describe(element).await? {
            Some(snapshot) => self.identify_snapshot(element, &snapshot).await,
            None => Ok(self.mark(unreadable_key(element))),
        }
    }

    /// Identity of an element whose snapshot the caller already holds.
    pub async fn identify_snapshot(
        &self,
        element: &ElementHandle,
        snapshot: &ElementSnapshot,
    ) -> Result<Identity, DriverError> {
        let identity = match identity_key(self.driver.as_ref(), element, snapshot).await {
            Ok(identity) => identity,
            Err(err) if err.is_stale() => {
                self.note_stale(element, "identity", &err);
                stale_key(snapshot)
            }
            Err(err) => return Err(err),
        };
        debug!(element = %element, id = %identity.id, rule = identity.rule.name(), "identified element");
        Ok(self.mark(identity))
    }

    pub async fn accessible_name(&self, element: &ElementHandle) -> Result<AccessibleName, DriverError> {
        match self.describe(element).await? {
            Some(snapshot) => self.accessible_name_of(element, &snapshot).await,
            None => Ok(AccessibleName::none()),
        }
    }

    pub async fn accessible_name_of(
        &self,
        element: &ElementHandle,
        snapshot: &ElementSnapshot,
    ) -> Result<AccessibleName, DriverError> {
        match resolve_name(self.driver.as_ref(), element, snapshot).await {
            Ok(name) => Ok(name),
            Err(err) if err.is_stale() => {
                self.note_stale(element, "accessible name", &err);
                Ok(AccessibleName::none())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn locators(&self, element: &ElementHandle) -> Result<LocatorSet, DriverError> {
        match self.describe(element).await? {
            Some(snapshot) => self.locators_of(element, &snapshot).await,
            None => Ok(LocatorSet::fallback("*")),
        }
    }

    /// Locators for an element whose snapshot the caller already holds.
    ///
    /// A cached set is only reused when its primary locator still resolves
    /// to exactly this element.
    pub async fn locators_of(
        &self,
        element: &ElementHandle,
        snapshot: &ElementSnapshot,
    ) -> Result<LocatorSet, DriverError> {
        let key = LocatorCacheKey::from_snapshot(snapshot);
        if let Some(cached) = self.cache.get(&key) {
            if self.resolves_to(&cached.primary, element).await? {
                self.cache.record_hit();
                return Ok(cached);
            }
        }
        self.cache.record_miss();

        match synthesize(self.driver.as_ref(), element, snapshot).await {
            Ok(locators) => {
                self.cache.put(key, locators.clone());
                Ok(locators)
            }
            Err(err) if err.is_stale() => {
                self.note_stale(element, "locators", &err);
                Ok(LocatorSet::fallback(&snapshot.tag))
            }
            Err(err) => Err(err),
        }
    }

    /// Identifiers produced by a degraded rule during this run.
    pub fn degraded_ids(&self) -> Vec<ElementId> {
        self.degraded.lock().iter().cloned().collect()
    }

    pub fn metrics(&self) -> ResolverMetrics {
        ResolverMetrics {
            locator_cache: self.cache.stats(),
            stale_handles: self.stale.load(Ordering::Relaxed),
            degraded_identities: self.degraded.lock().len(),
        }
    }

    async fn resolves_to(&self, locator: &Locator, element: &ElementHandle) -> Result<bool, DriverError> {
        match self.driver.query(locator).await {
            Ok(hits) => Ok(hits.as_slice() == [*element]),
            Err(err) if err.is_stale() => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn mark(&self, identity: Identity) -> Identity {
        if identity.is_degraded() {
            warn!(id = %identity.id, rule = identity.rule.name(), "degraded identity");
            self.degraded.lock().insert(identity.id.clone());
        }
        identity
    }

    fn note_stale(&self, element: &ElementHandle, step: &str, err: &DriverError) {
        self.stale.fetch_add(1, Ordering::Relaxed);
        warn!(element = %element, step, error = %err, "stale element, using fallback");
    }
}

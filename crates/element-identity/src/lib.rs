//! Element identity and locators
//!
//! Derives stable keys, accessible names and re-locatable structural
//! locators for elements of a live document reached through a
//! [`DocumentDriver`]:
//! - identity keys with a degraded structural-hash fallback
//! - the accessible-name cascade
//! - XPath and CSS locator synthesis with a per-run validated cache
//! - batched fan-out reads over a bounded worker pool

pub mod batch;
pub mod cache;
pub mod driver;
pub mod errors;
pub mod identity;
pub mod locators;
pub mod model;
pub mod naming;
pub mod resolver;

pub use batch::{describe_all, BatchOptions};
pub use cache::{CacheMetric, LocatorCache, LocatorCacheKey};
pub use driver::DocumentDriver;
pub use errors::DriverError;
pub use identity::{find_matching, identity_key};
pub use model::*;
pub use naming::resolve_name;
pub use resolver::{ElementResolver, ResolverMetrics};

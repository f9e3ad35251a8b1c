use async_trait::async_trait;

use crate::errors::DriverError;
use crate::model::{ElementHandle, ElementSnapshot, Locator};

/// Port onto the live document.
///
/// Each method is one round trip; implementations typically serialize
/// queries, so callers batch through [`describe_batch`](Self::describe_batch).
#[async_trait]
pub trait DocumentDriver: Send + Sync {
    /// All elements matching `locator`, in document order.
    async fn query(&self, locator: &Locator) -> Result<Vec<ElementHandle>, DriverError>;

    /// Matches restricted to descendants of `scope`.
    async fn query_within(
        &self,
        scope: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, DriverError>;

    async fn describe(&self, element: &ElementHandle) -> Result<ElementSnapshot, DriverError>;

    async fn parent(&self, element: &ElementHandle) -> Result<Option<ElementHandle>, DriverError>;

    /// Element children in document order.
    async fn children(&self, element: &ElementHandle) -> Result<Vec<ElementHandle>, DriverError>;

    /// Reads N elements in one round trip. Per-element failures (stale
    /// handles) are reported in place; the outer error is for the trip itself.
    async fn describe_batch(
        &self,
        elements: &[ElementHandle],
    ) -> Result<Vec<Result<ElementSnapshot, DriverError>>, DriverError> {
        let mut out = Vec::with_capacity(elements.len());
        for element in elements {
            out.push(self.describe(element).await);
        }
        Ok(out)
    }
}

//! Fan-out/fan-in element reads.
//!
//! Handles are split into fixed-size chunks, each read in one driver round
//! trip by a worker from a bounded pool. Chunks never overlap, so merging by
//! chunk index gives the input order regardless of completion order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::driver::DocumentDriver;
use crate::errors::DriverError;
use crate::model::{ElementHandle, ElementSnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    pub size: usize,
    pub workers: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            size: 50,
            workers: 4,
        }
    }
}

pub type SnapshotResult = Result<ElementSnapshot, DriverError>;

/// Describes every handle, one entry per input handle in input order.
pub async fn describe_all(
    driver: Arc<dyn DocumentDriver>,
    handles: &[ElementHandle],
    options: BatchOptions,
) -> Result<Vec<SnapshotResult>, DriverError> {
    if handles.is_empty() {
        return Ok(Vec::new());
    }
    let size = options.size.max(1);
    let permits = Arc::new(Semaphore::new(options.workers.max(1)));
    let chunks: Vec<Vec<ElementHandle>> = handles.chunks(size).map(<[_]>::to_vec).collect();
    let chunk_count = chunks.len();

    let mut set = JoinSet::new();
    for (index, chunk) in chunks.into_iter().enumerate() {
        let driver = Arc::clone(&driver);
        let permits = Arc::clone(&permits);
        set.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|err| DriverError::Internal(err.to_string()))?;
            let results = driver.describe_batch(&chunk).await?;
            if results.len() != chunk.len() {
                return Err(DriverError::Internal(format!(
                    "batch of {} returned {} results",
                    chunk.len(),
                    results.len()
                )));
            }
            Ok::<_, DriverError>((index, results))
        });
    }

    let mut slots: Vec<Option<Vec<SnapshotResult>>> = (0..chunk_count).map(|_| None).collect();
    let mut first_error = None;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok((index, results))) => slots[index] = Some(results),
            Ok(Err(err)) => {
                first_error.get_or_insert(err);
            }
            Err(err) => {
                first_error.get_or_insert(DriverError::Internal(err.to_string()));
            }
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }

    debug!(elements = handles.len(), batches = chunk_count, "batched describe complete");
    let mut merged = Vec::with_capacity(handles.len());
    for slot in slots {
        merged.extend(slot.ok_or_else(|| DriverError::Internal("batch result missing".into()))?);
    }
    Ok(merged)
}

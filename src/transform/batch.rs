use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::dataset::RawRow;

use super::row::{RowTransformer, TransformedRow};

pub const DEFAULT_BATCH_SIZE: usize = 250;

/// Consecutive transformed rows; `offset` is the index of the first one in
/// the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformBatch {
    pub offset: usize,
    pub rows: Vec<TransformedRow>,
}

/// Lazy, finite sequence of batches over a row slice.
///
/// Nothing is transformed until a batch is pulled, so callers can report
/// progress or stop between batches. Cloning restarts from the clone point.
#[derive(Debug, Clone)]
pub struct TransformBatches<'a> {
    transformer: &'a RowTransformer,
    rows: &'a [RawRow],
    batch_size: usize,
    next: usize,
}

impl<'a> Iterator for TransformBatches<'a> {
    type Item = TransformBatch;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.rows.len() {
            return None;
        }
        let offset = self.next;
        let end = offset.saturating_add(self.batch_size).min(self.rows.len());
        self.next = end;
        let rows = self.rows[offset..end]
            .iter()
            .map(|row| self.transformer.transform(row))
            .collect();
        Some(TransformBatch { offset, rows })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.rows.len().saturating_sub(self.next);
        let batches = left.div_ceil(self.batch_size);
        (batches, Some(batches))
    }
}

impl TransformBatches<'_> {
    pub fn is_finished(&self) -> bool {
        self.next >= self.rows.len()
    }
}

impl ExactSizeIterator for TransformBatches<'_> {}
impl FusedIterator for TransformBatches<'_> {}

impl RowTransformer {
    /// Batches of at most `batch_size` rows (zero is treated as one). Each
    /// call starts over from the first row.
    pub fn batches<'a>(&'a self, rows: &'a [RawRow], batch_size: usize) -> TransformBatches<'a> {
        TransformBatches {
            transformer: self,
            rows,
            batch_size: batch_size.max(1),
            next: 0,
        }
    }
}

/// Cooperative cancellation shared between the caller and a running
/// transform. Checked between batches only.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct BatchProgress {
    pub batch: usize,
    pub processed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct TransformOutcome {
    pub rows: Vec<TransformedRow>,
    /// Rows never reached because the run was cancelled.
    pub remaining: usize,
    pub cancelled: bool,
}

/// Drives [`TransformBatches`] to completion, calling `on_batch` after each
/// batch and stopping early once `cancel` is raised. Rows are never half
/// transformed: a cancelled run returns whole batches only.
pub fn transform_in_batches<F>(
    transformer: &RowTransformer,
    rows: &[RawRow],
    batch_size: usize,
    cancel: &CancelFlag,
    mut on_batch: F,
) -> TransformOutcome
where
    F: FnMut(&BatchProgress),
{
    let total = rows.len();
    let mut outcome = TransformOutcome {
        rows: Vec::with_capacity(total),
        remaining: 0,
        cancelled: false,
    };

    let mut batches = transformer.batches(rows, batch_size);
    let mut index = 0;
    while !batches.is_finished() {
        if cancel.is_cancelled() {
            outcome.cancelled = true;
            break;
        }
        let Some(batch) = batches.next() else { break };
        outcome.rows.extend(batch.rows);
        let progress = BatchProgress {
            batch: index,
            processed: outcome.rows.len(),
            total,
        };
        tracing::debug!(
            target: "kennel_import",
            event = "transform_batch_done",
            batch = progress.batch,
            processed = progress.processed,
            total = progress.total,
        );
        on_batch(&progress);
        index += 1;
    }

    outcome.remaining = total - outcome.rows.len();
    if outcome.cancelled {
        tracing::info!(
            target: "kennel_import",
            event = "transform_cancelled",
            processed = outcome.rows.len(),
            remaining = outcome.remaining,
        );
    }
    outcome
}

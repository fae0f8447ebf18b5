//! Raw rows → persistence payloads.

mod batch;
mod coerce;
mod row;

pub use batch::{
    transform_in_batches, BatchProgress, CancelFlag, TransformBatch, TransformBatches,
    TransformOutcome, DEFAULT_BATCH_SIZE,
};
pub use coerce::{coerce_value, parse_boolean, parse_date, CoercionKind, DATE_OUTPUT_FORMAT};
pub use row::{
    transform_row_with_mappings, AssociationLookup, CoercionWarning, RowTransformer,
    TransformedRow,
};

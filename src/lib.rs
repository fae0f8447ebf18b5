//! Column mapping and row transformation for the bulk import wizard.
//!
//! Callers build an [`EntityCatalog`] once and pass it by reference to the
//! compatibility resolver, the auto-mapper, the validator and the
//! transformer. [`ImportSession`] bundles those steps for a single upload.

pub mod catalog;
pub mod compatibility;
pub mod dataset;
mod error;
pub mod import;
mod logging;
pub mod mapping;
pub mod session;
pub mod transform;

pub use catalog::{EntityCatalog, EntityTypeDefinition, FieldDefinition, FieldType};
pub use compatibility::{associable_entities, disabled_tooltip, SelectedTypes, MAX_SELECTED_TYPES};
pub use dataset::{ParsedDataset, RawRow, SAMPLE_ROW_COUNT};
pub use error::{AppError, CatalogError, DatasetError, ImportError};
pub use import::{
    write_import_report, CoercionSummary, ImportMode, ImportRequest, OverwriteSetting,
};
pub use logging::{init_logging, DEFAULT_FILTER, LOG_ENV};
pub use mapping::{
    association_property_options, auto_map_columns, import_as_options, mapping_stats,
    normalize_header, property_options, unmapped_required_fields, validate_mappings,
    ColumnMapping, ColumnMappings, ColumnTarget, ImportAs, MappingStats, MappingValidation,
};
pub use session::ImportSession;
pub use transform::{
    transform_in_batches, transform_row_with_mappings, AssociationLookup, CancelFlag,
    CoercionKind, CoercionWarning, RowTransformer, TransformOutcome, TransformedRow,
    DEFAULT_BATCH_SIZE,
};

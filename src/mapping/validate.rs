use serde::Serialize;
use ts_rs::TS;

use crate::catalog::EntityCatalog;
use crate::compatibility::SelectedTypes;
use crate::error::ImportError;

use super::{ColumnMappings, ColumnTarget};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct UnmappedRequiredField {
    pub field: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct MappingStats {
    pub property_count: usize,
    pub association_count: usize,
    pub skipped_count: usize,
}

impl MappingStats {
    pub fn total(&self) -> usize {
        self.property_count + self.association_count + self.skipped_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct MappingValidation {
    pub is_valid: bool,
    pub errors: Vec<UnmappedRequiredField>,
}

fn covers(target: &ColumnTarget, primary: &str, field: &str) -> bool {
    matches!(
        target,
        ColumnTarget::Property { entity_type, field: Some(mapped) }
            if entity_type == primary && mapped == field
    )
}

/// Primary-type required fields no column maps to, in declaration order.
///
/// Only mapping coverage is checked; empty cells in individual rows are the
/// execution side's concern.
pub fn unmapped_required_fields(
    catalog: &EntityCatalog,
    mappings: &ColumnMappings,
    selected: &SelectedTypes,
) -> Result<Vec<UnmappedRequiredField>, ImportError> {
    let primary = catalog.require(selected.require_primary()?)?;
    Ok(primary
        .required_field_definitions()
        .filter(|field| {
            !mappings
                .iter()
                .any(|(_, target)| covers(target, &primary.id, &field.key))
        })
        .map(|field| UnmappedRequiredField {
            field: field.key.clone(),
            label: field.label.clone(),
        })
        .collect())
}

/// Counts every column exactly once.
///
/// Pending entries, and properties of any type other than the primary one,
/// create nothing and are counted as skipped.
pub fn mapping_stats(mappings: &ColumnMappings, selected: &SelectedTypes) -> MappingStats {
    let primary = selected.primary();
    let mut stats = MappingStats::default();
    for (_, target) in mappings.iter() {
        match target {
            ColumnTarget::Property {
                entity_type,
                field: Some(_),
            } if Some(entity_type.as_str()) == primary => stats.property_count += 1,
            ColumnTarget::Association {
                target_entity_type: Some(_),
                field: Some(_),
            } => stats.association_count += 1,
            _ => stats.skipped_count += 1,
        }
    }
    stats
}

/// Gate for leaving the mapping step. Incomplete coverage is reported in
/// `errors`; an invalid selection is a hard error.
pub fn validate_mappings(
    catalog: &EntityCatalog,
    mappings: &ColumnMappings,
    selected: &SelectedTypes,
) -> Result<MappingValidation, ImportError> {
    selected.validate(catalog)?;
    let errors = unmapped_required_fields(catalog, mappings, selected)?;
    let validation = MappingValidation {
        is_valid: errors.is_empty(),
        errors,
    };
    tracing::debug!(
        target: "kennel_import",
        event = "mappings_validated",
        primary = selected.primary(),
        is_valid = validation.is_valid,
        missing = validation.errors.len(),
    );
    Ok(validation)
}

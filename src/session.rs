//! In-memory state of one import wizard run.
//!
//! The session owns the mutable pieces (selection, dataset, mapping, modes)
//! and keeps them consistent: the mapping is rebuilt whenever the selection
//! or the dataset changes, and edits are checked against the catalog before
//! they land.

use std::collections::BTreeMap;

use crate::catalog::EntityCatalog;
use crate::compatibility::{associable_entities, disabled_tooltip, SelectedTypes};
use crate::dataset::ParsedDataset;
use crate::error::ImportError;
use crate::import::{CoercionSummary, ImportMode, ImportRequest, OverwriteSetting};
use crate::mapping::{
    association_property_options, auto_map_columns, import_as_options, mapping_stats,
    property_options, validate_mappings, AssociationPropertyOption, ColumnMappings, ColumnTarget,
    ImportAs, ImportAsOption, MappingStats, MappingValidation, PropertyOption,
};
use crate::transform::{
    transform_in_batches, BatchProgress, CancelFlag, RowTransformer, TransformOutcome,
    TransformedRow, DEFAULT_BATCH_SIZE,
};

#[derive(Debug)]
pub struct ImportSession<'c> {
    catalog: &'c EntityCatalog,
    selected: SelectedTypes,
    dataset: Option<ParsedDataset>,
    mappings: ColumnMappings,
    import_modes: BTreeMap<String, ImportMode>,
    overwrite_settings: BTreeMap<String, OverwriteSetting>,
    batch_size: usize,
    cancel: CancelFlag,
}

impl<'c> ImportSession<'c> {
    pub fn new(catalog: &'c EntityCatalog) -> Self {
        Self {
            catalog,
            selected: SelectedTypes::empty(),
            dataset: None,
            mappings: ColumnMappings::new(),
            import_modes: BTreeMap::new(),
            overwrite_settings: BTreeMap::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            cancel: CancelFlag::new(),
        }
    }

    pub fn catalog(&self) -> &'c EntityCatalog {
        self.catalog
    }

    pub fn selected(&self) -> &SelectedTypes {
        &self.selected
    }

    pub fn dataset(&self) -> Option<&ParsedDataset> {
        self.dataset.as_ref()
    }

    pub fn mappings(&self) -> &ColumnMappings {
        &self.mappings
    }

    pub fn associable_entities(&self) -> Vec<&'c str> {
        associable_entities(self.catalog, &self.selected)
    }

    pub fn disabled_tooltip(&self, entity_id: &str) -> Result<Option<String>, ImportError> {
        disabled_tooltip(self.catalog, entity_id, &self.selected)
    }

    /// Toggles `entity_id` in the selection. Returns whether the selection
    /// changed; a change re-maps every column of a loaded file.
    pub fn toggle_type(&mut self, entity_id: &str) -> Result<bool, ImportError> {
        let next = self.selected.toggle(self.catalog, entity_id)?;
        if next == self.selected {
            return Ok(false);
        }
        self.selected = next;
        tracing::info!(
            target: "kennel_import",
            event = "selection_changed",
            entity_type = entity_id,
            selected = ?self.selected.as_slice(),
        );
        self.remap()?;
        Ok(true)
    }

    /// Replaces the whole selection at once, e.g. from saved wizard state.
    pub fn select(&mut self, selected: SelectedTypes) -> Result<(), ImportError> {
        selected.validate(self.catalog)?;
        if selected != self.selected {
            self.selected = selected;
            self.remap()?;
        }
        Ok(())
    }

    pub fn load_dataset(&mut self, dataset: ParsedDataset) -> Result<(), ImportError> {
        tracing::info!(
            target: "kennel_import",
            event = "dataset_loaded",
            headers = dataset.headers.len(),
            rows = dataset.row_count,
        );
        self.dataset = Some(dataset);
        self.remap()
    }

    fn remap(&mut self) -> Result<(), ImportError> {
        let Some(dataset) = &self.dataset else {
            return Ok(());
        };
        self.mappings = auto_map_columns(self.catalog, dataset.headers.as_slice(), &self.selected)?;
        Ok(())
    }

    /// Swaps in an externally edited mapping, e.g. one loaded from a file.
    /// Headers the dataset does not have are rejected.
    pub fn replace_mappings(&mut self, mappings: ColumnMappings) -> Result<(), ImportError> {
        let dataset = self.dataset.as_ref().ok_or(ImportError::NoDataset)?;
        if let Some(unknown) = mappings
            .headers()
            .find(|header| !dataset.headers.iter().any(|known| known == header))
        {
            return Err(ImportError::UnknownHeader(unknown.to_string()));
        }
        let mut merged = ColumnMappings::all_skipped(dataset.headers.iter().map(String::as_str));
        for (header, target) in mappings.iter() {
            merged.set(header, target.clone());
        }
        self.mappings = merged;
        Ok(())
    }

    pub fn import_as_options(&self) -> Result<Vec<ImportAsOption>, ImportError> {
        import_as_options(self.catalog, &self.selected)
    }

    pub fn property_options(&self, entity_type: &str) -> Result<Vec<PropertyOption>, ImportError> {
        Ok(property_options(self.catalog.require(entity_type)?))
    }

    pub fn association_property_options(
        &self,
    ) -> Result<Vec<AssociationPropertyOption>, ImportError> {
        association_property_options(self.catalog, self.selected.require_primary()?)
    }

    pub fn set_import_as(&mut self, header: &str, choice: ImportAs) -> Result<(), ImportError> {
        if let ImportAs::Properties { entity_type } = &choice {
            if !self.selected.contains(entity_type) {
                return Err(ImportError::UnselectedEntityType {
                    header: header.to_string(),
                    entity_type: entity_type.clone(),
                });
            }
        }
        self.mappings.set_import_as(header, choice)
    }

    pub fn set_property_field(
        &mut self,
        header: &str,
        field: Option<String>,
    ) -> Result<(), ImportError> {
        if let (Some(key), Some(ColumnTarget::Property { entity_type, .. })) =
            (&field, self.mappings.get(header))
        {
            let entity = self.catalog.require(entity_type)?;
            if entity.field(key).is_none() {
                return Err(ImportError::UnknownField {
                    entity_type: entity_type.clone(),
                    field: key.clone(),
                });
            }
        }
        self.mappings.set_property_field(header, field)
    }

    /// Points `header` at `target.field`, which must be one of the options
    /// [`ImportSession::association_property_options`] offers.
    pub fn set_association_target(
        &mut self,
        header: &str,
        target: &str,
        field: &str,
    ) -> Result<(), ImportError> {
        let primary = self.selected.require_primary()?;
        let target_type = self.catalog.require(target)?;
        if !self.catalog.are_associable(primary, target) {
            return Err(ImportError::IllegalAssociationTarget {
                header: header.to_string(),
                target: target.to_string(),
                primary: primary.to_string(),
            });
        }
        if !target_type.is_unique_identifier(field) {
            return Err(ImportError::NotUniqueIdentifier {
                header: header.to_string(),
                target: target.to_string(),
                field: field.to_string(),
            });
        }
        self.mappings.set_association_target(header, target, field)
    }

    pub fn set_import_mode(&mut self, entity_type: &str, mode: ImportMode) -> Result<(), ImportError> {
        self.catalog.require(entity_type)?;
        self.import_modes.insert(entity_type.to_string(), mode);
        Ok(())
    }

    pub fn set_overwrite(&mut self, field: &str, setting: OverwriteSetting) {
        self.overwrite_settings.insert(field.to_string(), setting);
    }

    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size.max(1);
    }

    pub fn stats(&self) -> MappingStats {
        mapping_stats(&self.mappings, &self.selected)
    }

    pub fn validate(&self) -> Result<MappingValidation, ImportError> {
        validate_mappings(self.catalog, &self.mappings, &self.selected)
    }

    /// Handle the caller can raise from elsewhere to stop
    /// [`ImportSession::transform`] between batches.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Transforms the sample rows with the current mapping, without
    /// requiring it to be complete.
    pub fn preview(&self) -> Result<Vec<TransformedRow>, ImportError> {
        let dataset = self.dataset.as_ref().ok_or(ImportError::NoDataset)?;
        let transformer = RowTransformer::new(self.catalog, &self.mappings, &self.selected)?;
        Ok(dataset
            .sample_rows
            .iter()
            .map(|row| transformer.transform(row))
            .collect())
    }

    /// Transforms every row in batches. Refuses to run while required fields
    /// are unmapped.
    pub fn transform<F>(&self, on_batch: F) -> Result<TransformOutcome, ImportError>
    where
        F: FnMut(&BatchProgress),
    {
        let dataset = self.dataset.as_ref().ok_or(ImportError::NoDataset)?;
        let validation = self.validate()?;
        if !validation.is_valid {
            return Err(ImportError::MappingIncomplete(
                validation.errors.into_iter().map(|missing| missing.field).collect(),
            ));
        }
        let transformer = RowTransformer::new(self.catalog, &self.mappings, &self.selected)?;

        tracing::info!(
            target: "kennel_import",
            event = "transform_started",
            primary = transformer.primary(),
            rows = dataset.row_count,
            batch_size = self.batch_size,
        );
        let outcome = transform_in_batches(
            &transformer,
            &dataset.all_data,
            self.batch_size,
            &self.cancel,
            on_batch,
        );
        self.cancel.reset();
        tracing::info!(
            target: "kennel_import",
            event = "transform_finished",
            rows = outcome.rows.len(),
            remaining = outcome.remaining,
            cancelled = outcome.cancelled,
        );
        Ok(outcome)
    }

    /// Packages transformed rows with the session's modes and overwrite
    /// settings for the execution service.
    pub fn build_request(&self, rows: Vec<TransformedRow>) -> Result<ImportRequest, ImportError> {
        let primary = self.selected.require_primary()?.to_string();
        let mut import_modes = self.import_modes.clone();
        import_modes.entry(primary.clone()).or_default();
        Ok(ImportRequest {
            selected_types: self.selected.clone(),
            coercion_summary: CoercionSummary::from_rows(&rows),
            primary_type: primary,
            import_modes,
            overwrite_settings: self.overwrite_settings.clone(),
            rows,
        })
    }
}

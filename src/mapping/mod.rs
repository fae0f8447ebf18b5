//! Column mappings: what each uploaded column feeds into.

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::error::ImportError;

mod automap;
mod normalize;
mod options;
mod validate;

pub use automap::auto_map_columns;
pub use normalize::normalize_header;
pub use options::{
    association_property_options, import_as_options, property_options,
    AssociationPropertyOption, ImportAsOption, PropertyOption,
};
pub use validate::{
    mapping_stats, unmapped_required_fields, validate_mappings, MappingStats, MappingValidation,
    UnmappedRequiredField,
};

/// Destination of one column.
///
/// `Property` and `Association` may be pending (no field picked yet) while
/// the operator is still editing; pending entries contribute nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "importAs", rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub enum ColumnTarget {
    Skip,
    Property {
        #[serde(rename = "entityType")]
        entity_type: String,
        #[serde(default)]
        field: Option<String>,
    },
    Association {
        #[serde(rename = "targetEntityType", default)]
        target_entity_type: Option<String>,
        #[serde(default)]
        field: Option<String>,
    },
}

impl ColumnTarget {
    pub fn property(entity_type: impl Into<String>, field: impl Into<String>) -> Self {
        ColumnTarget::Property {
            entity_type: entity_type.into(),
            field: Some(field.into()),
        }
    }

    pub fn association(target_entity_type: impl Into<String>, field: impl Into<String>) -> Self {
        ColumnTarget::Association {
            target_entity_type: Some(target_entity_type.into()),
            field: Some(field.into()),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, ColumnTarget::Skip)
    }

    /// Not skipped and pointing at a concrete field.
    pub fn is_complete(&self) -> bool {
        match self {
            ColumnTarget::Skip => false,
            ColumnTarget::Property { field, .. } => field.is_some(),
            ColumnTarget::Association {
                target_entity_type,
                field,
            } => target_entity_type.is_some() && field.is_some(),
        }
    }

    pub fn import_as(&self) -> ImportAs {
        match self {
            ColumnTarget::Skip => ImportAs::Skip,
            ColumnTarget::Property { entity_type, .. } => ImportAs::Properties {
                entity_type: entity_type.clone(),
            },
            ColumnTarget::Association { .. } => ImportAs::Association,
        }
    }
}

/// The per-column classification chosen in the first mapping step. The
/// concrete field or association target is picked afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub enum ImportAs {
    Skip,
    Properties {
        #[serde(rename = "entityType")]
        entity_type: String,
    },
    Association,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "import/")]
pub struct ColumnMapping {
    pub header: String,
    pub target: ColumnTarget,
}

/// Ordered header → target map with exactly one entry per header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "import/")]
pub struct ColumnMappings(Vec<ColumnMapping>);

impl ColumnMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every header mapped to `Skip`.
    pub fn all_skipped<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        headers
            .into_iter()
            .map(|header| (header.into(), ColumnTarget::Skip))
            .collect()
    }

    /// Inserts or replaces the entry for `header`; the last write wins and
    /// keeps the header's original position.
    pub fn set(&mut self, header: impl Into<String>, target: ColumnTarget) {
        let header = header.into();
        match self.0.iter_mut().find(|entry| entry.header == header) {
            Some(existing) => existing.target = target,
            None => self.0.push(ColumnMapping { header, target }),
        }
    }

    pub fn get(&self, header: &str) -> Option<&ColumnTarget> {
        self.0
            .iter()
            .find(|entry| entry.header == header)
            .map(|entry| &entry.target)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnTarget)> {
        self.0
            .iter()
            .map(|entry| (entry.header.as_str(), &entry.target))
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|entry| entry.header.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn existing_mut(&mut self, header: &str) -> Result<&mut ColumnTarget, ImportError> {
        self.0
            .iter_mut()
            .find(|entry| entry.header == header)
            .map(|entry| &mut entry.target)
            .ok_or_else(|| ImportError::UnknownHeader(header.to_string()))
    }

    /// Changes the Import-As choice of an existing column. A changed choice
    /// clears the picked field; re-selecting the current choice keeps it.
    pub fn set_import_as(&mut self, header: &str, choice: ImportAs) -> Result<(), ImportError> {
        let target = self.existing_mut(header)?;
        if target.import_as() == choice {
            return Ok(());
        }
        *target = match choice {
            ImportAs::Skip => ColumnTarget::Skip,
            ImportAs::Properties { entity_type } => ColumnTarget::Property {
                entity_type,
                field: None,
            },
            ImportAs::Association => ColumnTarget::Association {
                target_entity_type: None,
                field: None,
            },
        };
        Ok(())
    }

    /// Picks the field of a column already classified as a property.
    pub fn set_property_field(
        &mut self,
        header: &str,
        field: Option<String>,
    ) -> Result<(), ImportError> {
        match self.existing_mut(header)? {
            ColumnTarget::Property { field: current, .. } => {
                *current = field;
                Ok(())
            }
            _ => Err(ImportError::NotAPropertyColumn(header.to_string())),
        }
    }

    /// Points an existing column at an association lookup.
    pub fn set_association_target(
        &mut self,
        header: &str,
        target_entity_type: impl Into<String>,
        field: impl Into<String>,
    ) -> Result<(), ImportError> {
        let target = self.existing_mut(header)?;
        *target = ColumnTarget::association(target_entity_type, field);
        Ok(())
    }
}

impl<H: Into<String>> FromIterator<(H, ColumnTarget)> for ColumnMappings {
    fn from_iter<T: IntoIterator<Item = (H, ColumnTarget)>>(iter: T) -> Self {
        let mut mappings = ColumnMappings::new();
        for (header, target) in iter {
            mappings.set(header, target);
        }
        mappings
    }
}

impl<'de> Deserialize<'de> for ColumnMappings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<ColumnMapping>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.header, entry.target))
            .collect())
    }
}

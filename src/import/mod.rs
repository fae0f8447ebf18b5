//! The hand-off to the import-execution service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::compatibility::SelectedTypes;
use crate::transform::TransformedRow;

pub mod report;
mod summary;

pub use report::write_import_report;
pub use summary::{CoercionSummary, CoercionSummaryEntry};

/// How the execution service treats rows that do or do not match an
/// existing record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "import/")]
pub enum ImportMode {
    #[default]
    CreateUpdate,
    CreateOnly,
    UpdateOnly,
}

impl ImportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportMode::CreateUpdate => "create_update",
            ImportMode::CreateOnly => "create_only",
            ImportMode::UpdateOnly => "update_only",
        }
    }
}

impl std::str::FromStr for ImportMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "create_update" => Ok(ImportMode::CreateUpdate),
            "create_only" => Ok(ImportMode::CreateOnly),
            "update_only" => Ok(ImportMode::UpdateOnly),
            other => Err(format!(
                "unknown import mode {other}; expected create_update, create_only or update_only"
            )),
        }
    }
}

/// Whether an existing, non-empty value on a matched record is replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "import/")]
pub enum OverwriteSetting {
    Overwrite,
    #[default]
    Skip,
}

/// Everything the execution service needs for one run. Modes are keyed by
/// entity type id and overwrite settings by field key; anything absent
/// falls back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct ImportRequest {
    pub selected_types: SelectedTypes,
    pub primary_type: String,
    pub import_modes: BTreeMap<String, ImportMode>,
    pub overwrite_settings: BTreeMap<String, OverwriteSetting>,
    pub rows: Vec<TransformedRow>,
    pub coercion_summary: CoercionSummary,
}

impl ImportRequest {
    pub fn mode_for(&self, entity_type: &str) -> ImportMode {
        self.import_modes
            .get(entity_type)
            .copied()
            .unwrap_or_default()
    }

    pub fn overwrite_for(&self, field: &str) -> OverwriteSetting {
        self.overwrite_settings
            .get(field)
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_use_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&ImportMode::CreateOnly).unwrap(),
            "\"create_only\""
        );
        assert_eq!("update-only".parse::<ImportMode>(), Ok(ImportMode::UpdateOnly));
        assert!("merge".parse::<ImportMode>().is_err());
    }

    #[test]
    fn request_falls_back_to_defaults() {
        let request = ImportRequest {
            selected_types: SelectedTypes::empty(),
            primary_type: "owners".into(),
            import_modes: BTreeMap::from([("pets".to_string(), ImportMode::UpdateOnly)]),
            overwrite_settings: BTreeMap::from([(
                "email".to_string(),
                OverwriteSetting::Overwrite,
            )]),
            rows: Vec::new(),
            coercion_summary: CoercionSummary::default(),
        };
        assert_eq!(request.mode_for("owners"), ImportMode::CreateUpdate);
        assert_eq!(request.mode_for("pets"), ImportMode::UpdateOnly);
        assert_eq!(request.overwrite_for("email"), OverwriteSetting::Overwrite);
        assert_eq!(request.overwrite_for("phone"), OverwriteSetting::Skip);
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::catalog::{EntityCatalog, FieldDefinition, FieldType};
use crate::compatibility::SelectedTypes;
use crate::dataset::RawRow;
use crate::error::ImportError;
use crate::mapping::{ColumnMappings, ColumnTarget};

use super::coerce::{coerce_value, CoercionKind};

/// A request to link the primary record to an existing record of another
/// type, located by one of that type's unique identifier fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct AssociationLookup {
    pub target_entity_type: String,
    pub match_field: String,
    pub match_value: String,
    pub source_header: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct CoercionWarning {
    pub header: String,
    pub field: String,
    pub kind: CoercionKind,
    /// The cell as it appeared in the file.
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct TransformedRow {
    #[ts(type = "Record<string, unknown>")]
    pub record: Map<String, Value>,
    pub associations: Vec<AssociationLookup>,
    pub warnings: Vec<CoercionWarning>,
}

#[derive(Debug, Clone)]
enum ColumnPlan {
    Property {
        header: String,
        field: FieldDefinition,
    },
    Association {
        header: String,
        target: String,
        field: String,
    },
}

/// A mapping checked against the catalog once and then applied to any
/// number of rows.
///
/// Construction rejects structurally invalid mappings. After that,
/// [`RowTransformer::transform`] cannot fail: bad cells become warnings.
#[derive(Debug, Clone)]
pub struct RowTransformer {
    primary: String,
    columns: Vec<ColumnPlan>,
}

impl RowTransformer {
    pub fn new(
        catalog: &EntityCatalog,
        mappings: &ColumnMappings,
        selected: &SelectedTypes,
    ) -> Result<Self, ImportError> {
        selected.validate(catalog)?;
        let primary = catalog.require(selected.require_primary()?)?;

        let mut columns = Vec::new();
        for (header, target) in mappings.iter() {
            match target {
                ColumnTarget::Skip => {}
                ColumnTarget::Property { entity_type, field } => {
                    if !selected.contains(entity_type) {
                        return Err(ImportError::UnselectedEntityType {
                            header: header.to_string(),
                            entity_type: entity_type.clone(),
                        });
                    }
                    let entity = catalog.require(entity_type)?;
                    let Some(key) = field else { continue };
                    let definition =
                        entity
                            .field(key)
                            .ok_or_else(|| ImportError::UnknownField {
                                entity_type: entity_type.clone(),
                                field: key.clone(),
                            })?;
                    // Secondary-type properties are informational only.
                    if entity.id == primary.id {
                        columns.push(ColumnPlan::Property {
                            header: header.to_string(),
                            field: definition.clone(),
                        });
                    }
                }
                ColumnTarget::Association {
                    target_entity_type: Some(target_id),
                    field: Some(key),
                } => {
                    let target = catalog.require(target_id)?;
                    if !catalog.are_associable(&primary.id, &target.id) {
                        return Err(ImportError::IllegalAssociationTarget {
                            header: header.to_string(),
                            target: target.id.clone(),
                            primary: primary.id.clone(),
                        });
                    }
                    if target.field(key).is_none() {
                        return Err(ImportError::UnknownField {
                            entity_type: target.id.clone(),
                            field: key.clone(),
                        });
                    }
                    if !target.is_unique_identifier(key) {
                        return Err(ImportError::NotUniqueIdentifier {
                            header: header.to_string(),
                            target: target.id.clone(),
                            field: key.clone(),
                        });
                    }
                    columns.push(ColumnPlan::Association {
                        header: header.to_string(),
                        target: target.id.clone(),
                        field: key.clone(),
                    });
                }
                ColumnTarget::Association { .. } => {}
            }
        }

        Ok(Self {
            primary: primary.id.clone(),
            columns,
        })
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Applies the mapping to one row. Columns missing from `row` read as
    /// empty cells.
    pub fn transform(&self, row: &RawRow) -> TransformedRow {
        let mut out = TransformedRow::default();
        for column in &self.columns {
            match column {
                ColumnPlan::Property { header, field } => {
                    let raw = row.get(header).map(String::as_str).unwrap_or("");
                    let trimmed = raw.trim();
                    if trimmed.is_empty() {
                        if field.field_type == FieldType::Boolean {
                            out.record
                                .entry(field.key.clone())
                                .or_insert(Value::Bool(false));
                        }
                        continue;
                    }
                    match coerce_value(field.field_type, trimmed) {
                        Ok(value) => {
                            out.record.insert(field.key.clone(), value);
                        }
                        Err(kind) => out.warnings.push(CoercionWarning {
                            header: header.clone(),
                            field: field.key.clone(),
                            kind,
                            value: raw.to_string(),
                        }),
                    }
                }
                ColumnPlan::Association {
                    header,
                    target,
                    field,
                } => {
                    let value = row.get(header).map(|cell| cell.trim()).unwrap_or("");
                    if value.is_empty() {
                        continue;
                    }
                    out.associations.push(AssociationLookup {
                        target_entity_type: target.clone(),
                        match_field: field.clone(),
                        match_value: value.to_string(),
                        source_header: header.clone(),
                    });
                }
            }
        }
        out
    }
}

/// One-shot form of [`RowTransformer`]. Prefer building the transformer
/// once when more than a handful of rows are involved.
pub fn transform_row_with_mappings(
    catalog: &EntityCatalog,
    row: &RawRow,
    mappings: &ColumnMappings,
    selected: &SelectedTypes,
) -> Result<TransformedRow, ImportError> {
    Ok(RowTransformer::new(catalog, mappings, selected)?.transform(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(cells: &[(&str, &str)]) -> RawRow {
        cells
            .iter()
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect()
    }

    fn pets_and_owners(catalog: &EntityCatalog) -> SelectedTypes {
        SelectedTypes::new(catalog, ["pets", "owners"]).unwrap()
    }

    #[test]
    fn coerces_by_field_type_and_collects_warnings() {
        let catalog = EntityCatalog::builtin();
        let mappings: ColumnMappings = [
            ("Name", ColumnTarget::property("pets", "name")),
            ("Weight", ColumnTarget::property("pets", "weight")),
            ("DOB", ColumnTarget::property("pets", "dateOfBirth")),
            ("Fixed", ColumnTarget::property("pets", "isNeutered")),
        ]
        .into_iter()
        .collect();
        let transformer =
            RowTransformer::new(&catalog, &mappings, &pets_and_owners(&catalog)).unwrap();

        let out = transformer.transform(&row(&[
            ("Name", "  Rex "),
            ("Weight", "12.5"),
            ("DOB", "sometime"),
            ("Fixed", "YES"),
        ]));
        assert_eq!(
            Value::Object(out.record),
            json!({"name": "Rex", "weight": 12.5, "isNeutered": true})
        );
        assert_eq!(
            out.warnings,
            vec![CoercionWarning {
                header: "DOB".into(),
                field: "dateOfBirth".into(),
                kind: CoercionKind::InvalidDate,
                value: "sometime".into(),
            }]
        );
    }

    #[test]
    fn empty_booleans_default_to_false_and_other_empties_are_omitted() {
        let catalog = EntityCatalog::builtin();
        let mappings: ColumnMappings = [
            ("Breed", ColumnTarget::property("pets", "breed")),
            ("Fixed", ColumnTarget::property("pets", "isNeutered")),
        ]
        .into_iter()
        .collect();
        let transformer =
            RowTransformer::new(&catalog, &mappings, &pets_and_owners(&catalog)).unwrap();
        let out = transformer.transform(&row(&[("Breed", "   ")]));
        assert_eq!(Value::Object(out.record), json!({"isNeutered": false}));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn secondary_properties_and_skips_contribute_nothing() {
        let catalog = EntityCatalog::builtin();
        let mappings: ColumnMappings = [
            ("Name", ColumnTarget::property("pets", "name")),
            ("City", ColumnTarget::property("owners", "city")),
            ("Junk", ColumnTarget::Skip),
        ]
        .into_iter()
        .collect();
        let out = transform_row_with_mappings(
            &catalog,
            &row(&[("Name", "Rex"), ("City", "Cork"), ("Junk", "x")]),
            &mappings,
            &pets_and_owners(&catalog),
        )
        .unwrap();
        assert_eq!(Value::Object(out.record), json!({"name": "Rex"}));
        assert!(out.associations.is_empty());
    }

    #[test]
    fn associations_trim_and_skip_empty_values() {
        let catalog = EntityCatalog::builtin();
        let mappings: ColumnMappings = [
            ("Owner Email", ColumnTarget::association("owners", "email")),
            ("Owner Phone", ColumnTarget::association("owners", "phone")),
        ]
        .into_iter()
        .collect();
        let out = transform_row_with_mappings(
            &catalog,
            &row(&[("Owner Email", " jo@x.ie "), ("Owner Phone", "")]),
            &mappings,
            &pets_and_owners(&catalog),
        )
        .unwrap();
        assert_eq!(
            out.associations,
            vec![AssociationLookup {
                target_entity_type: "owners".into(),
                match_field: "email".into(),
                match_value: "jo@x.ie".into(),
                source_header: "Owner Email".into(),
            }]
        );
    }

    #[test]
    fn rejects_structurally_invalid_mappings() {
        let catalog = EntityCatalog::builtin();
        let selected = pets_and_owners(&catalog);

        let unselected: ColumnMappings =
            [("When", ColumnTarget::property("bookings", "startDate"))].into_iter().collect();
        assert!(matches!(
            RowTransformer::new(&catalog, &unselected, &selected).unwrap_err(),
            ImportError::UnselectedEntityType { .. }
        ));

        let not_unique: ColumnMappings =
            [("Owner City", ColumnTarget::association("owners", "city"))].into_iter().collect();
        assert!(matches!(
            RowTransformer::new(&catalog, &not_unique, &selected).unwrap_err(),
            ImportError::NotUniqueIdentifier { .. }
        ));

        let illegal: ColumnMappings =
            [("Service", ColumnTarget::association("services", "name"))].into_iter().collect();
        assert!(matches!(
            RowTransformer::new(&catalog, &illegal, &selected).unwrap_err(),
            ImportError::IllegalAssociationTarget { .. }
        ));

        let unknown_field: ColumnMappings =
            [("Tail", ColumnTarget::property("pets", "tailLength"))].into_iter().collect();
        assert!(matches!(
            RowTransformer::new(&catalog, &unknown_field, &selected).unwrap_err(),
            ImportError::UnknownField { .. }
        ));
    }

    #[test]
    fn association_targets_need_not_be_selected() {
        let catalog = EntityCatalog::builtin();
        let selected = SelectedTypes::new(&catalog, ["pets"]).unwrap();
        let mappings: ColumnMappings =
            [("Booking", ColumnTarget::association("bookings", "id"))].into_iter().collect();
        let out = transform_row_with_mappings(&catalog, &row(&[("Booking", "B-7")]), &mappings, &selected)
            .unwrap();
        assert_eq!(out.associations[0].target_entity_type, "bookings");
    }

    #[test]
    fn later_columns_overwrite_earlier_ones_for_the_same_field() {
        let catalog = EntityCatalog::builtin();
        let mappings: ColumnMappings = [
            ("Name", ColumnTarget::property("pets", "name")),
            ("Nickname", ColumnTarget::property("pets", "name")),
        ]
        .into_iter()
        .collect();
        let transformer =
            RowTransformer::new(&catalog, &mappings, &pets_and_owners(&catalog)).unwrap();
        let both = transformer.transform(&row(&[("Name", "Rex"), ("Nickname", "Rexy")]));
        assert_eq!(both.record.get("name"), Some(&json!("Rexy")));
        let first_only = transformer.transform(&row(&[("Name", "Rex"), ("Nickname", "")]));
        assert_eq!(first_only.record.get("name"), Some(&json!("Rex")));
    }
}

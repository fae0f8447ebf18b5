use serde::Serialize;
use ts_rs::TS;

use crate::catalog::{EntityCatalog, EntityTypeDefinition, FieldDefinition};
use crate::compatibility::SelectedTypes;
use crate::error::ImportError;

use super::ImportAs;

pub const SKIP_LABEL: &str = "Don't import column";
pub const ASSOCIATION_LABEL: &str = "Association";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct ImportAsOption {
    pub value: ImportAs,
    pub label: String,
    pub is_association: bool,
    pub is_skip: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct PropertyOption {
    pub value: String,
    pub label: String,
    pub field: FieldDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct AssociationPropertyOption {
    /// `<target type>.<field key>`, unique across the option list.
    pub value: String,
    pub label: String,
    pub entity_type: String,
    pub field: FieldDefinition,
}

/// Import-As choices for a column: one "properties" entry per selected type,
/// "Association" when the primary type has something to link to, and the
/// skip entry last.
pub fn import_as_options(
    catalog: &EntityCatalog,
    selected: &SelectedTypes,
) -> Result<Vec<ImportAsOption>, ImportError> {
    selected.validate(catalog)?;
    let mut options = Vec::with_capacity(selected.len() + 2);
    for id in selected.iter() {
        let entity = catalog.require(id)?;
        options.push(ImportAsOption {
            value: ImportAs::Properties {
                entity_type: entity.id.clone(),
            },
            label: format!("{} properties", entity.label_singular),
            is_association: false,
            is_skip: false,
        });
    }

    if let Some(primary) = selected.primary() {
        if !catalog.partners_of(primary).is_empty() {
            options.push(ImportAsOption {
                value: ImportAs::Association,
                label: ASSOCIATION_LABEL.to_string(),
                is_association: true,
                is_skip: false,
            });
        }
    }

    options.push(ImportAsOption {
        value: ImportAs::Skip,
        label: SKIP_LABEL.to_string(),
        is_association: false,
        is_skip: true,
    });
    Ok(options)
}

pub fn property_options(entity: &EntityTypeDefinition) -> Vec<PropertyOption> {
    entity
        .fields
        .iter()
        .map(|field| PropertyOption {
            value: field.key.clone(),
            label: field.label.clone(),
            field: field.clone(),
        })
        .collect()
}

/// Every `(partner, unique identifier)` pair the primary type can be linked
/// through, partners in catalog order.
pub fn association_property_options(
    catalog: &EntityCatalog,
    primary: &str,
) -> Result<Vec<AssociationPropertyOption>, ImportError> {
    catalog.require(primary)?;
    Ok(catalog
        .partners_of(primary)
        .into_iter()
        .flat_map(|target| {
            target
                .unique_field_definitions()
                .map(move |field| AssociationPropertyOption {
                    value: format!("{}.{}", target.id, field.key),
                    label: format!("{} ({})", field.label, target.label),
                    entity_type: target.id.clone(),
                    field: field.clone(),
                })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_as_lists_types_association_and_skip() {
        let catalog = EntityCatalog::builtin();
        let selected = SelectedTypes::new(&catalog, ["owners", "pets"]).unwrap();
        let options = import_as_options(&catalog, &selected).unwrap();

        let labels: Vec<_> = options.iter().map(|option| option.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Owner properties", "Pet properties", "Association", SKIP_LABEL]
        );
        assert_eq!(options.iter().filter(|option| option.is_skip).count(), 1);
        assert!(options[2].is_association);
    }

    #[test]
    fn association_is_hidden_for_types_without_partners() {
        let catalog = EntityCatalog::builtin();
        let selected = SelectedTypes::new(&catalog, ["staff"]).unwrap();
        let options = import_as_options(&catalog, &selected).unwrap();
        assert!(options.iter().all(|option| !option.is_association));
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn property_options_follow_field_order() {
        let catalog = EntityCatalog::builtin();
        let pets = catalog.require("pets").unwrap();
        let options = property_options(pets);
        assert_eq!(options.len(), pets.fields.len());
        assert_eq!(options[1].value, "name");
        assert_eq!(options[1].label, "Name");
    }

    #[test]
    fn association_property_options_cover_partner_unique_fields() {
        let catalog = EntityCatalog::builtin();
        let options = association_property_options(&catalog, "owners").unwrap();
        let labels: Vec<_> = options.iter().map(|option| option.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Pet ID (Pets)", "Name (Pets)", "Microchip Number (Pets)"]
        );
        assert_eq!(options[1].value, "pets.name");
        assert_eq!(options[1].entity_type, "pets");
    }

    #[test]
    fn association_property_options_reject_unknown_primary() {
        let catalog = EntityCatalog::builtin();
        assert!(association_property_options(&catalog, "dragons").is_err());
    }
}

use crate::catalog::{EntityCatalog, EntityTypeDefinition, FieldDefinition};
use crate::compatibility::SelectedTypes;
use crate::error::ImportError;

use super::normalize::{names_match, normalize_header, strip_segment};
use super::{ColumnMappings, ColumnTarget};

/// Proposes a mapping for every header.
///
/// Per header, first match wins:
/// 1. primary field by key, then by label;
/// 2. association with the secondary type: the header names the secondary
///    type (singular label or id) and the rest of it names one of its unique
///    identifier fields, e.g. `Owner Email` → owners by email;
/// 3. secondary field by key, then by label;
/// 4. skip.
///
/// Within a tier the first field in declaration order wins. The result only
/// depends on the arguments and replaces any earlier mapping wholesale.
pub fn auto_map_columns<S: AsRef<str>>(
    catalog: &EntityCatalog,
    headers: &[S],
    selected: &SelectedTypes,
) -> Result<ColumnMappings, ImportError> {
    selected.validate(catalog)?;
    let Some(primary_id) = selected.primary() else {
        return Ok(ColumnMappings::all_skipped(headers.iter().map(|header| header.as_ref())));
    };
    let primary = catalog.require(primary_id)?;
    let secondary = selected
        .secondary()
        .map(|id| catalog.require(id))
        .transpose()?;

    let mappings: ColumnMappings = headers
        .iter()
        .map(|header| {
            let header = header.as_ref();
            (header, map_header(header, primary, secondary))
        })
        .collect();

    let mapped = mappings.iter().filter(|(_, target)| !target.is_skip()).count();
    tracing::info!(
        target: "kennel_import",
        event = "columns_auto_mapped",
        primary = primary_id,
        secondary = selected.secondary(),
        headers = mappings.len(),
        mapped = mapped,
    );
    Ok(mappings)
}

fn map_header(
    header: &str,
    primary: &EntityTypeDefinition,
    secondary: Option<&EntityTypeDefinition>,
) -> ColumnTarget {
    let normalized = normalize_header(header);
    if normalized.is_empty() {
        return ColumnTarget::Skip;
    }

    if let Some(field) = match_field(&normalized, &primary.fields) {
        return ColumnTarget::property(&primary.id, &field.key);
    }

    let Some(secondary) = secondary else {
        return ColumnTarget::Skip;
    };

    if let Some(field) = match_association(&normalized, secondary) {
        return ColumnTarget::association(&secondary.id, &field.key);
    }

    if let Some(field) = match_field(&normalized, &secondary.fields) {
        return ColumnTarget::property(&secondary.id, &field.key);
    }

    ColumnTarget::Skip
}

fn match_field<'a>(normalized: &str, fields: &'a [FieldDefinition]) -> Option<&'a FieldDefinition> {
    fields
        .iter()
        .find(|field| names_match(normalized, &normalize_header(&field.key)))
        .or_else(|| {
            fields
                .iter()
                .find(|field| names_match(normalized, &normalize_header(&field.label)))
        })
}

fn match_association<'a>(
    normalized: &str,
    target: &'a EntityTypeDefinition,
) -> Option<&'a FieldDefinition> {
    let mut names = vec![
        normalize_header(&target.label_singular),
        normalize_header(&target.id),
    ];
    // `pets` must be tried before `pet` or `pets_name` would leave `s_name`.
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));
    names.dedup();

    let unique: Vec<&FieldDefinition> = target.unique_field_definitions().collect();
    names.iter().find_map(|name| {
        let remainder = strip_segment(normalized, name)?;
        unique
            .iter()
            .copied()
            .find(|field| names_match(&remainder, &normalize_header(&field.key)))
            .or_else(|| {
                unique
                    .iter()
                    .copied()
                    .find(|field| names_match(&remainder, &normalize_header(&field.label)))
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::entity;
    use crate::catalog::FieldType;

    fn builtin() -> EntityCatalog {
        EntityCatalog::builtin()
    }

    fn select(catalog: &EntityCatalog, ids: &[&str]) -> SelectedTypes {
        SelectedTypes::new(catalog, ids.iter().copied()).unwrap()
    }

    #[test]
    fn maps_owner_headers_and_pet_association() {
        let catalog = builtin();
        let headers = ["First Name", "Last Name", "Email", "Pet Name"];
        let mappings =
            auto_map_columns(&catalog, &headers, &select(&catalog, &["owners", "pets"])).unwrap();

        assert_eq!(
            mappings.get("First Name"),
            Some(&ColumnTarget::property("owners", "firstName"))
        );
        assert_eq!(
            mappings.get("Last Name"),
            Some(&ColumnTarget::property("owners", "lastName"))
        );
        assert_eq!(mappings.get("Email"), Some(&ColumnTarget::property("owners", "email")));
        assert_eq!(
            mappings.get("Pet Name"),
            Some(&ColumnTarget::association("pets", "name"))
        );
    }

    #[test]
    fn association_accepts_id_or_singular_label_and_unique_labels() {
        let catalog = builtin();
        let selected = select(&catalog, &["pets", "owners"]);
        let headers = ["owner_email", "OwnersPhone", "Owner ID", "Owner Zip Code"];
        let mappings = auto_map_columns(&catalog, &headers, &selected).unwrap();

        assert_eq!(
            mappings.get("owner_email"),
            Some(&ColumnTarget::association("owners", "email"))
        );
        assert_eq!(
            mappings.get("OwnersPhone"),
            Some(&ColumnTarget::association("owners", "phone"))
        );
        // "Owner ID" is the label of owners.id, but pets is primary so the
        // association tier applies first.
        assert_eq!(
            mappings.get("Owner ID"),
            Some(&ColumnTarget::association("owners", "id"))
        );
        // zipCode is not a unique identifier, so no association and no
        // field named "owner zip code" on either side.
        assert_eq!(mappings.get("Owner Zip Code"), Some(&ColumnTarget::Skip));
    }

    #[test]
    fn falls_back_to_secondary_properties_then_skip() {
        let catalog = builtin();
        let selected = select(&catalog, &["pets", "owners"]);
        let mappings = auto_map_columns(&catalog, &["City", "Shoe Size"], &selected).unwrap();
        assert_eq!(mappings.get("City"), Some(&ColumnTarget::property("owners", "city")));
        assert_eq!(mappings.get("Shoe Size"), Some(&ColumnTarget::Skip));
    }

    #[test]
    fn primary_fields_win_over_secondary() {
        let catalog = builtin();
        let selected = select(&catalog, &["pets", "owners"]);
        let mappings = auto_map_columns(&catalog, &["Notes"], &selected).unwrap();
        assert_eq!(mappings.get("Notes"), Some(&ColumnTarget::property("pets", "notes")));
    }

    #[test]
    fn key_match_beats_label_match_and_declaration_order_breaks_ties() {
        let catalog = EntityCatalog::new(vec![entity(
            "things",
            "Things",
            "Thing",
            &[
                ("title", "Code", FieldType::String),
                ("code", "Identifier", FieldType::String),
                ("alias", "Nickname", FieldType::String),
                ("nick", "Nickname", FieldType::String),
            ],
            &[],
            &[],
            &[],
        )])
        .unwrap();
        let selected = select(&catalog, &["things"]);
        let mappings = auto_map_columns(&catalog, &["Code", "Nickname"], &selected).unwrap();
        assert_eq!(mappings.get("Code"), Some(&ColumnTarget::property("things", "code")));
        assert_eq!(
            mappings.get("Nickname"),
            Some(&ColumnTarget::property("things", "alias"))
        );
    }

    #[test]
    fn empty_selection_skips_everything() {
        let catalog = builtin();
        let mappings =
            auto_map_columns(&catalog, &["Email", "Name"], &SelectedTypes::empty()).unwrap();
        assert!(mappings.iter().all(|(_, target)| target.is_skip()));
        assert_eq!(mappings.len(), 2);
    }

    #[test]
    fn blank_headers_are_skipped() {
        let catalog = builtin();
        let mappings =
            auto_map_columns(&catalog, &["", "---"], &select(&catalog, &["owners"])).unwrap();
        assert!(mappings.iter().all(|(_, target)| target.is_skip()));
    }

    #[test]
    fn is_idempotent() {
        let catalog = builtin();
        let selected = select(&catalog, &["owners", "pets"]);
        let headers = ["First Name", "Pet Name", "Pet Microchip Number", "Mystery"];
        let first = auto_map_columns(&catalog, &headers, &selected).unwrap();
        let second = auto_map_columns(&catalog, &headers, &selected).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.get("Pet Microchip Number"),
            Some(&ColumnTarget::association("pets", "microchipNumber"))
        );
    }
}

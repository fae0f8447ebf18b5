//! Which entity types may be imported together.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::EntityCatalog;
use crate::error::ImportError;

pub const MAX_SELECTED_TYPES: usize = 2;
pub const MAX_TYPES_TOOLTIP: &str = "Maximum of 2 object types per import";

/// Entity types chosen for an import. The first is the primary type (the
/// one created or updated from each row); the optional second one is only
/// ever linked to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "import/")]
pub struct SelectedTypes(Vec<String>);

impl SelectedTypes {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a validated selection.
    pub fn new<I, S>(catalog: &EntityCatalog, ids: I) -> Result<Self, ImportError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selected = Self(ids.into_iter().map(Into::into).collect());
        selected.validate(catalog)?;
        Ok(selected)
    }

    /// Re-checks the selection against `catalog`. Selections that arrive
    /// through deserialization skip [`SelectedTypes::new`], so consumers
    /// call this before trusting one.
    pub fn validate(&self, catalog: &EntityCatalog) -> Result<(), ImportError> {
        if self.0.len() > MAX_SELECTED_TYPES {
            return Err(ImportError::TooManyTypes {
                max: MAX_SELECTED_TYPES,
                count: self.0.len(),
            });
        }
        for id in &self.0 {
            catalog.require(id)?;
        }
        if let [primary, secondary] = self.0.as_slice() {
            if primary == secondary {
                return Err(ImportError::DuplicateSelection(primary.clone()));
            }
            if !catalog.are_associable(primary, secondary) {
                return Err(ImportError::IncompatibleTypes {
                    primary: primary.clone(),
                    secondary: secondary.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn secondary(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }

    pub fn require_primary(&self) -> Result<&str, ImportError> {
        self.primary().ok_or(ImportError::NoSelection)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|selected| selected == id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Selects or deselects `id`.
    ///
    /// Deselecting the primary type promotes the secondary one. Selecting a
    /// type that is disabled for the current selection leaves it unchanged.
    pub fn toggle(&self, catalog: &EntityCatalog, id: &str) -> Result<Self, ImportError> {
        catalog.require(id)?;

        if self.contains(id) {
            let remaining = self.0.iter().filter(|selected| *selected != id).cloned();
            return Ok(Self(remaining.collect()));
        }

        if associable_entities(catalog, self).contains(&id) {
            let mut next = self.0.clone();
            next.push(id.to_string());
            return Ok(Self(next));
        }

        tracing::debug!(
            target: "kennel_import",
            event = "selection_toggle_ignored",
            entity_type = id,
            selected = ?self.0,
        );
        Ok(self.clone())
    }
}

/// Entity types that may be added to `selected`, in catalog order.
///
/// With nothing selected every type is offered; with one type selected its
/// association partners are offered; at the two-type cap nothing is.
pub fn associable_entities<'c>(catalog: &'c EntityCatalog, selected: &SelectedTypes) -> Vec<&'c str> {
    match selected.as_slice() {
        [] => catalog.ids().collect(),
        [only] => catalog
            .partners_of(only)
            .into_iter()
            .map(|entity| entity.id.as_str())
            .collect(),
        _ => Vec::new(),
    }
}

/// Reason `entity_id` cannot be toggled on, or `None` when it can be toggled
/// (including when it is already selected and may be removed).
pub fn disabled_tooltip(
    catalog: &EntityCatalog,
    entity_id: &str,
    selected: &SelectedTypes,
) -> Result<Option<String>, ImportError> {
    let entity = catalog.require(entity_id)?;
    if selected.contains(entity_id) {
        return Ok(None);
    }
    if selected.len() >= MAX_SELECTED_TYPES {
        return Ok(Some(MAX_TYPES_TOOLTIP.to_string()));
    }
    if associable_entities(catalog, selected).contains(&entity_id) {
        return Ok(None);
    }

    let primary = catalog.require(selected.require_primary()?)?;
    Ok(Some(format!(
        "{} cannot be imported together with {}",
        entity.label, primary.label
    )))
}

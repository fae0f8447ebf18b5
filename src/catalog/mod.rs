//! Entity type registry.
//!
//! The catalog is built once, validated, and then passed by reference to
//! every resolver, mapper and transformer call. Nothing in the crate keeps a
//! catalog in module state, so tests are free to build synthetic ones.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CatalogError, ImportError};

mod builtin;

pub use builtin::builtin_entity_types;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "import/")]
pub enum FieldType {
    String,
    Text,
    Number,
    Boolean,
    Date,
    Enum,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Enum => "enum",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct FieldDefinition {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDefinition {
    pub fn new(key: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            field_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct EntityTypeDefinition {
    pub id: String,
    pub label: String,
    pub label_singular: String,
    pub label_plural: String,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub unique_identifier_fields: Vec<String>,
    #[serde(default)]
    pub associable_with: Vec<String>,
}

impl EntityTypeDefinition {
    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn is_required(&self, key: &str) -> bool {
        self.required_fields.iter().any(|required| required == key)
    }

    pub fn is_unique_identifier(&self, key: &str) -> bool {
        self.unique_identifier_fields
            .iter()
            .any(|unique| unique == key)
    }

    /// Required fields in field declaration order.
    pub fn required_field_definitions(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields
            .iter()
            .filter(move |field| self.is_required(&field.key))
    }

    /// Unique identifier fields in the order the type lists them.
    pub fn unique_field_definitions(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.unique_identifier_fields
            .iter()
            .filter_map(move |key| self.field(key))
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.key.as_str()) {
                return Err(CatalogError::DuplicateField {
                    entity_type: self.id.clone(),
                    field: field.key.clone(),
                });
            }
        }

        let roles = [
            ("required", &self.required_fields),
            ("unique identifier", &self.unique_identifier_fields),
        ];
        for (role, keys) in roles {
            if let Some(missing) = keys.iter().find(|key| !seen.contains(key.as_str())) {
                return Err(CatalogError::UnknownField {
                    entity_type: self.id.clone(),
                    field: missing.clone(),
                    role,
                });
            }
        }

        if self.associable_with.iter().any(|partner| partner == &self.id) {
            return Err(CatalogError::SelfAssociation(self.id.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Wrapped {
        #[serde(rename = "entityTypes")]
        entity_types: Vec<EntityTypeDefinition>,
    },
    Bare(Vec<EntityTypeDefinition>),
}

/// Immutable set of importable entity types plus the symmetric
/// compatibility graph derived from their `associable_with` lists.
#[derive(Debug, Clone)]
pub struct EntityCatalog {
    types: Vec<EntityTypeDefinition>,
    partners: BTreeMap<String, BTreeSet<String>>,
}

impl EntityCatalog {
    pub fn new(types: Vec<EntityTypeDefinition>) -> Result<Self, CatalogError> {
        let mut ids = HashSet::new();
        for entity in &types {
            if !ids.insert(entity.id.as_str()) {
                return Err(CatalogError::DuplicateEntityType(entity.id.clone()));
            }
            entity.validate()?;
        }

        // Either side declaring the pairing is enough; the graph is the union.
        let mut partners: BTreeMap<String, BTreeSet<String>> = types
            .iter()
            .map(|entity| (entity.id.clone(), BTreeSet::new()))
            .collect();
        for entity in &types {
            for partner in &entity.associable_with {
                if !ids.contains(partner.as_str()) {
                    return Err(CatalogError::UnknownPartner {
                        entity_type: entity.id.clone(),
                        partner: partner.clone(),
                    });
                }
                partners
                    .entry(entity.id.clone())
                    .or_default()
                    .insert(partner.clone());
                partners
                    .entry(partner.clone())
                    .or_default()
                    .insert(entity.id.clone());
            }
        }

        tracing::debug!(
            target: "kennel_import",
            event = "catalog_built",
            entity_types = types.len(),
        );
        Ok(Self { types, partners })
    }

    /// The pet-business catalog shipped with the crate.
    pub fn builtin() -> Self {
        Self::new(builtin_entity_types()).expect("built-in catalog definitions to be consistent")
    }

    /// Parses a catalog from JSON: either a bare array of entity types or an
    /// object with an `entityTypes` array.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|err| CatalogError::Parse(err.to_string()))?;
        let types = match file {
            CatalogFile::Wrapped { entity_types } => entity_types,
            CatalogFile::Bare(types) => types,
        };
        Self::new(types)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path)
            .map_err(|err| CatalogError::Parse(format!("{}: {err}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn entity_types(&self) -> &[EntityTypeDefinition] {
        &self.types
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|entity| entity.id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&EntityTypeDefinition> {
        self.types.iter().find(|entity| entity.id == id)
    }

    pub fn require(&self, id: &str) -> Result<&EntityTypeDefinition, ImportError> {
        self.get(id)
            .ok_or_else(|| ImportError::UnknownEntityType(id.to_string()))
    }

    /// Whether the two types may be imported together, in either order.
    pub fn are_associable(&self, a: &str, b: &str) -> bool {
        self.partners
            .get(a)
            .map(|set| set.contains(b))
            .unwrap_or(false)
    }

    /// Association partners of `id`, in catalog declaration order.
    pub fn partners_of(&self, id: &str) -> Vec<&EntityTypeDefinition> {
        let Some(set) = self.partners.get(id) else {
            return Vec::new();
        };
        self.types
            .iter()
            .filter(|entity| set.contains(&entity.id))
            .collect()
    }
}

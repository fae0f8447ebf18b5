use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;

use anyhow::Error as AnyhowError;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use ts_rs::TS;

/// Serializable error shape shown in the wizard and written to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "import/")]
pub struct AppError {
    /// Stable code such as `IMPORT/UNKNOWN_ENTITY_TYPE`.
    pub code: String,
    pub message: String,
    /// Offending header, path, row and similar details.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    #[ts(type = "Record<string, string>")]
    pub context: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub cause: Option<Box<AppError>>,
}

impl AppError {
    /// Code for failures none of the crate's error types describe.
    pub const UNKNOWN_CODE: &'static str = "APP/UNKNOWN";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        AppError {
            code: code.into(),
            message: message.into(),
            context: HashMap::new(),
            cause: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    pub fn cause(&self) -> Option<&AppError> {
        self.cause.as_deref()
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<AppError>) -> Self {
        self.cause = Some(Box::new(cause.into()));
        self
    }

    /// Emits the error as a structured `tracing` event.
    pub fn log_with_event(&self, event: &str) {
        tracing::error!(
            target: "kennel_import",
            event = event,
            code = self.code.as_str(),
            message = self.message.as_str(),
            context = ?self.context,
        );
    }

    /// Maps one link of an error chain, if it is a type this crate knows.
    fn classify(error: &(dyn StdError + 'static)) -> Option<AppError> {
        if let Some(app_error) = error.downcast_ref::<AppError>() {
            return Some(app_error.clone());
        }
        if let Some(err) = error.downcast_ref::<ImportError>() {
            return Some(err.into());
        }
        if let Some(err) = error.downcast_ref::<DatasetError>() {
            return Some(err.into());
        }
        if let Some(err) = error.downcast_ref::<CatalogError>() {
            return Some(err.into());
        }
        if let Some(err) = error.downcast_ref::<IoError>() {
            return Some(err.into());
        }
        if let Some(err) = error.downcast_ref::<SerdeJsonError>() {
            return Some(err.into());
        }
        error.downcast_ref::<csv::Error>().map(AppError::from)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "[{}] {}", self.code, self.message)
        } else {
            write!(f, "[{}] {} ({:?})", self.code, self.message, self.context)
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Uses the outermost link of the chain the crate can classify. When that
/// link sits below `.context(...)` wrappers, the outer message is kept as
/// `operation`.
impl From<AnyhowError> for AppError {
    fn from(error: AnyhowError) -> Self {
        let summary = error.to_string();
        for (depth, link) in error.chain().enumerate() {
            if let Some(known) = AppError::classify(link) {
                return if depth == 0 {
                    known
                } else {
                    known.with_context("operation", summary.as_str())
                };
            }
        }
        AppError::new(AppError::UNKNOWN_CODE, summary)
    }
}

impl From<&IoError> for AppError {
    fn from(error: &IoError) -> Self {
        let mut app_error = AppError::new(format!("IO/{:?}", error.kind()), error.to_string());
        if let Some(os_code) = error.raw_os_error() {
            app_error = app_error.with_context("os_code", os_code.to_string());
        }
        app_error
    }
}

impl From<&SerdeJsonError> for AppError {
    fn from(error: &SerdeJsonError) -> Self {
        let code = if error.is_data() {
            "JSON/DATA"
        } else if error.is_syntax() {
            "JSON/SYNTAX"
        } else if error.is_eof() {
            "JSON/EOF"
        } else {
            "JSON/ERROR"
        };

        let mut app_error = AppError::new(code, error.to_string());
        if error.line() > 0 {
            app_error = app_error.with_context("line", error.line().to_string());
        }
        if error.column() > 0 {
            app_error = app_error.with_context("column", error.column().to_string());
        }
        app_error
    }
}

impl From<&csv::Error> for AppError {
    fn from(error: &csv::Error) -> Self {
        let mut app_error = AppError::new("CSV/ERROR", error.to_string());
        if let Some(position) = error.position() {
            app_error = app_error.with_context("line", position.line().to_string());
        }
        app_error
    }
}

/// Failures raised while building or loading an entity catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("entity type {0} is declared more than once")]
    DuplicateEntityType(String),
    #[error("entity type {entity_type} declares field {field} more than once")]
    DuplicateField { entity_type: String, field: String },
    #[error("entity type {entity_type} lists unknown {role} field {field}")]
    UnknownField {
        entity_type: String,
        field: String,
        role: &'static str,
    },
    #[error("entity type {entity_type} is associable with unknown type {partner}")]
    UnknownPartner {
        entity_type: String,
        partner: String,
    },
    #[error("entity type {0} cannot be associable with itself")]
    SelfAssociation(String),
    #[error("failed to parse catalog: {0}")]
    Parse(String),
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::DuplicateEntityType(_) => "CATALOG/DUPLICATE_ENTITY_TYPE",
            CatalogError::DuplicateField { .. } => "CATALOG/DUPLICATE_FIELD",
            CatalogError::UnknownField { .. } => "CATALOG/UNKNOWN_FIELD",
            CatalogError::UnknownPartner { .. } => "CATALOG/UNKNOWN_PARTNER",
            CatalogError::SelfAssociation(_) => "CATALOG/SELF_ASSOCIATION",
            CatalogError::Parse(_) => "CATALOG/PARSE",
        }
    }
}

/// Structural misuse of the mapping engine. These are caller bugs, never
/// problems with the uploaded data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),
    #[error("{entity_type} has no field named {field}")]
    UnknownField { entity_type: String, field: String },
    #[error("{secondary} cannot be imported together with {primary}")]
    IncompatibleTypes { primary: String, secondary: String },
    #[error("at most {max} object types can be imported together, got {count}")]
    TooManyTypes { max: usize, count: usize },
    #[error("entity type {0} is selected twice")]
    DuplicateSelection(String),
    #[error("no entity type is selected")]
    NoSelection,
    #[error("column {header} maps to {entity_type}, which is not selected")]
    UnselectedEntityType { header: String, entity_type: String },
    #[error("column {header} associates {target}, which cannot be linked to {primary}")]
    IllegalAssociationTarget {
        header: String,
        target: String,
        primary: String,
    },
    #[error("column {header} matches {target} by {field}, which is not a unique identifier")]
    NotUniqueIdentifier {
        header: String,
        target: String,
        field: String,
    },
    #[error("no column named {0} in the uploaded file")]
    UnknownHeader(String),
    #[error("column {0} is not mapped to a property")]
    NotAPropertyColumn(String),
    #[error("required fields are not mapped: {}", .0.join(", "))]
    MappingIncomplete(Vec<String>),
    #[error("no file has been loaded")]
    NoDataset,
}

impl ImportError {
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::UnknownEntityType(_) => "IMPORT/UNKNOWN_ENTITY_TYPE",
            ImportError::UnknownField { .. } => "IMPORT/UNKNOWN_FIELD",
            ImportError::IncompatibleTypes { .. } => "IMPORT/INCOMPATIBLE_TYPES",
            ImportError::TooManyTypes { .. } => "IMPORT/TOO_MANY_TYPES",
            ImportError::DuplicateSelection(_) => "IMPORT/DUPLICATE_SELECTION",
            ImportError::NoSelection => "IMPORT/NO_SELECTION",
            ImportError::UnselectedEntityType { .. } => "IMPORT/UNSELECTED_ENTITY_TYPE",
            ImportError::IllegalAssociationTarget { .. } => "IMPORT/ILLEGAL_ASSOCIATION_TARGET",
            ImportError::NotUniqueIdentifier { .. } => "IMPORT/NOT_UNIQUE_IDENTIFIER",
            ImportError::UnknownHeader(_) => "IMPORT/UNKNOWN_HEADER",
            ImportError::NotAPropertyColumn(_) => "IMPORT/NOT_A_PROPERTY_COLUMN",
            ImportError::MappingIncomplete(_) => "IMPORT/MAPPING_INCOMPLETE",
            ImportError::NoDataset => "IMPORT/NO_DATASET",
        }
    }
}

/// Failures while decoding an uploaded file into a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: IoError,
    },
    #[error("malformed delimited data: {0}")]
    Delimited(#[from] csv::Error),
    #[error("malformed json: {0}")]
    Json(#[from] SerdeJsonError),
    #[error("json rows must be objects, found {found} at row {row}")]
    NotAnObject { row: usize, found: &'static str },
    #[error("json document must be an array of rows")]
    NotAnArray,
    #[error("duplicate column header {0}")]
    DuplicateHeader(String),
    #[error("file has no header row")]
    MissingHeaders,
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
}

impl DatasetError {
    pub fn code(&self) -> &'static str {
        match self {
            DatasetError::Io { .. } => "DATASET/IO",
            DatasetError::Delimited(_) => "DATASET/DELIMITED",
            DatasetError::Json(_) => "DATASET/JSON",
            DatasetError::NotAnObject { .. } => "DATASET/NOT_AN_OBJECT",
            DatasetError::NotAnArray => "DATASET/NOT_AN_ARRAY",
            DatasetError::DuplicateHeader(_) => "DATASET/DUPLICATE_HEADER",
            DatasetError::MissingHeaders => "DATASET/MISSING_HEADERS",
            DatasetError::UnsupportedExtension(_) => "DATASET/UNSUPPORTED_EXTENSION",
        }
    }
}

impl From<&CatalogError> for AppError {
    fn from(error: &CatalogError) -> Self {
        let app_error = AppError::new(error.code(), error.to_string());
        match error {
            CatalogError::DuplicateEntityType(entity_type)
            | CatalogError::SelfAssociation(entity_type)
            | CatalogError::DuplicateField { entity_type, .. }
            | CatalogError::UnknownField { entity_type, .. }
            | CatalogError::UnknownPartner { entity_type, .. } => {
                app_error.with_context("entity_type", entity_type.as_str())
            }
            CatalogError::Parse(_) => app_error,
        }
    }
}

impl From<&ImportError> for AppError {
    fn from(error: &ImportError) -> Self {
        let app_error = AppError::new(error.code(), error.to_string());
        match error {
            ImportError::UnknownEntityType(entity_type) => {
                app_error.with_context("entity_type", entity_type.as_str())
            }
            ImportError::UnselectedEntityType { header, .. }
            | ImportError::IllegalAssociationTarget { header, .. }
            | ImportError::NotUniqueIdentifier { header, .. }
            | ImportError::UnknownHeader(header)
            | ImportError::NotAPropertyColumn(header) => {
                app_error.with_context("header", header.as_str())
            }
            ImportError::MappingIncomplete(fields) => {
                app_error.with_context("fields", fields.join(","))
            }
            _ => app_error,
        }
    }
}

impl From<&DatasetError> for AppError {
    fn from(error: &DatasetError) -> Self {
        let app_error = AppError::new(error.code(), error.to_string());
        match error {
            DatasetError::Io { path, source } => {
                app_error.with_context("path", path.as_str()).with_cause(source)
            }
            DatasetError::Delimited(source) => app_error.with_cause(source),
            DatasetError::Json(source) => app_error.with_cause(source),
            DatasetError::NotAnObject { row, .. } => app_error.with_context("row", row.to_string()),
            DatasetError::DuplicateHeader(header) => app_error.with_context("header", header.as_str()),
            _ => app_error,
        }
    }
}

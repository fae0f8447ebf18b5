//! Uploaded files decoded into string-keyed rows.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::DatasetError;

/// One row of the upload: header → raw cell text. Every header of the
/// dataset is present; missing cells are empty strings.
pub type RawRow = BTreeMap<String, String>;

pub const SAMPLE_ROW_COUNT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct ParsedDataset {
    pub headers: Vec<String>,
    pub row_count: usize,
    pub sample_rows: Vec<RawRow>,
    pub all_data: Vec<RawRow>,
}

impl ParsedDataset {
    /// Builds a dataset from already decoded rows. Rows are padded so every
    /// header has a cell; keys that are not headers are dropped.
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> Result<Self, DatasetError> {
        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(DatasetError::DuplicateHeader(header.clone()));
            }
        }

        let all_data: Vec<RawRow> = rows
            .into_iter()
            .map(|mut row| {
                row.retain(|key, _| seen.contains(key.as_str()));
                for header in &headers {
                    row.entry(header.clone()).or_default();
                }
                row
            })
            .collect();

        Ok(Self {
            row_count: all_data.len(),
            sample_rows: all_data.iter().take(SAMPLE_ROW_COUNT).cloned().collect(),
            headers,
            all_data,
        })
    }

    /// Reads delimited text with a header row. Blank headers become
    /// `Column N` (the next free number if a real header already has that
    /// name); rows whose cells are all blank are dropped. Cells past the
    /// last header have no column to land in and are discarded with a
    /// warning.
    pub fn from_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let raw_headers = rdr.headers()?.clone();
        if raw_headers.is_empty() {
            return Err(DatasetError::MissingHeaders);
        }
        let cleaned: Vec<&str> = raw_headers
            .iter()
            .map(|header| header.trim_start_matches('\u{feff}').trim())
            .collect();
        let mut taken: HashSet<String> = cleaned
            .iter()
            .filter(|header| !header.is_empty())
            .map(|header| header.to_string())
            .collect();
        let headers: Vec<String> = cleaned
            .iter()
            .enumerate()
            .map(|(index, header)| {
                if header.is_empty() {
                    free_column_name(index + 1, &mut taken)
                } else {
                    header.to_string()
                }
            })
            .collect();

        let mut rows = Vec::new();
        let mut overlong_rows = 0usize;
        for record in rdr.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            if record.len() > headers.len() {
                overlong_rows += 1;
            }
            let row: RawRow = headers
                .iter()
                .enumerate()
                .map(|(index, header)| {
                    (header.clone(), record.get(index).unwrap_or("").to_string())
                })
                .collect();
            rows.push(row);
        }

        if overlong_rows > 0 {
            tracing::warn!(
                target: "kennel_import",
                event = "extra_cells_dropped",
                rows = overlong_rows,
                headers = headers.len(),
            );
        }

        let dataset = Self::new(headers, rows)?;
        tracing::debug!(
            target: "kennel_import",
            event = "dataset_parsed",
            format = "delimited",
            headers = dataset.headers.len(),
            rows = dataset.row_count,
        );
        Ok(dataset)
    }

    /// Reads a JSON array of flat objects, or an object wrapping one under
    /// `rows` or `data`. Headers are keys in first-seen order.
    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        let document: Value = serde_json::from_str(json)?;
        let items = match document {
            Value::Array(items) => items,
            Value::Object(mut object) => match object.remove("rows").or_else(|| object.remove("data")) {
                Some(Value::Array(items)) => items,
                _ => return Err(DatasetError::NotAnArray),
            },
            _ => return Err(DatasetError::NotAnArray),
        };

        let mut headers: Vec<String> = Vec::new();
        let mut known = HashSet::new();
        let mut rows = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let object = match item {
                Value::Object(object) => object,
                other => {
                    return Err(DatasetError::NotAnObject {
                        row: index + 1,
                        found: json_kind(&other),
                    })
                }
            };
            let mut row = RawRow::new();
            for (key, value) in object {
                if known.insert(key.clone()) {
                    headers.push(key.clone());
                }
                row.insert(key, cell_text(value));
            }
            rows.push(row);
        }
        if headers.is_empty() && !rows.is_empty() {
            return Err(DatasetError::MissingHeaders);
        }

        let dataset = Self::new(headers, rows)?;
        tracing::debug!(
            target: "kennel_import",
            event = "dataset_parsed",
            format = "json",
            headers = dataset.headers.len(),
            rows = dataset.row_count,
        );
        Ok(dataset)
    }

    /// Picks a decoder by extension: `.csv`, `.tsv`, `.txt` (tab separated
    /// when the first line has a tab) or `.json`.
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let read = |path: &Path| {
            fs::read_to_string(path).map_err(|source| DatasetError::Io {
                path: path.display().to_string(),
                source,
            })
        };

        match extension.as_str() {
            "json" => Self::from_json_str(&read(path)?),
            "csv" => Self::from_delimited(read(path)?.as_bytes(), b','),
            "tsv" => Self::from_delimited(read(path)?.as_bytes(), b'\t'),
            "txt" => {
                let text = read(path)?;
                let first_line = text.lines().next().unwrap_or("");
                let delimiter = if first_line.contains('\t') { b'\t' } else { b',' };
                Self::from_delimited(text.as_bytes(), delimiter)
            }
            other => Err(DatasetError::UnsupportedExtension(other.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all_data.is_empty()
    }
}

/// `Column <position>`, or the next number up that no header uses yet.
fn free_column_name(position: usize, taken: &mut HashSet<String>) -> String {
    let mut number = position;
    loop {
        let candidate = format!("Column {number}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        number += 1;
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::transform::{CoercionKind, TransformedRow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct CoercionSummaryEntry {
    pub header: String,
    pub field: String,
    pub kind: CoercionKind,
    pub rows: usize,
}

impl CoercionSummaryEntry {
    /// e.g. "14 rows had an unparsable date in `DOB`".
    pub fn line(&self) -> String {
        let subject = if self.rows == 1 { "row" } else { "rows" };
        format!(
            "{} {subject} had {} in `{}`",
            self.rows,
            self.kind.describe(),
            self.header
        )
    }
}

/// Coercion warnings of a whole run grouped by column and problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub struct CoercionSummary {
    pub entries: Vec<CoercionSummaryEntry>,
    pub affected_rows: usize,
}

impl CoercionSummary {
    pub fn from_rows(rows: &[TransformedRow]) -> Self {
        let mut counts: BTreeMap<(&str, &str, CoercionKind), usize> = BTreeMap::new();
        let mut order: Vec<(&str, &str, CoercionKind)> = Vec::new();
        let mut affected_rows = 0;

        for row in rows {
            if !row.warnings.is_empty() {
                affected_rows += 1;
            }
            for warning in &row.warnings {
                let key = (warning.header.as_str(), warning.field.as_str(), warning.kind);
                let count = counts.entry(key).or_insert(0);
                if *count == 0 {
                    order.push(key);
                }
                *count += 1;
            }
        }

        let entries = order
            .into_iter()
            .map(|key| CoercionSummaryEntry {
                header: key.0.to_string(),
                field: key.1.to_string(),
                kind: key.2,
                rows: counts.get(&key).copied().unwrap_or_default(),
            })
            .collect();
        Self {
            entries,
            affected_rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(CoercionSummaryEntry::line).collect()
    }
}

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use ts_rs::TS;

use crate::catalog::FieldType;

pub const DATE_OUTPUT_FORMAT: &str = "%Y-%m-%d";

// Day-first formats are deliberately absent: 03/04/2024 reads as March 4th.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Largest integer an `f64` holds exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "import/")]
pub enum CoercionKind {
    InvalidNumber,
    InvalidDate,
    InvalidBoolean,
}

impl CoercionKind {
    pub fn code(self) -> &'static str {
        match self {
            CoercionKind::InvalidNumber => "COERCE/INVALID_NUMBER",
            CoercionKind::InvalidDate => "COERCE/INVALID_DATE",
            CoercionKind::InvalidBoolean => "COERCE/INVALID_BOOLEAN",
        }
    }

    /// Phrase used in the post-transform summary, e.g. "an unparsable date".
    pub fn describe(self) -> &'static str {
        match self {
            CoercionKind::InvalidNumber => "an unparsable number",
            CoercionKind::InvalidDate => "an unparsable date",
            CoercionKind::InvalidBoolean => "an unrecognized yes/no value",
        }
    }
}

/// Converts a trimmed, non-empty cell into the JSON value `field_type` calls for.
pub fn coerce_value(field_type: FieldType, trimmed: &str) -> Result<Value, CoercionKind> {
    match field_type {
        FieldType::String | FieldType::Text | FieldType::Enum => {
            Ok(Value::String(trimmed.to_string()))
        }
        FieldType::Number => parse_number(trimmed).ok_or(CoercionKind::InvalidNumber),
        FieldType::Date => parse_date(trimmed)
            .map(|date| Value::String(date.format(DATE_OUTPUT_FORMAT).to_string()))
            .ok_or(CoercionKind::InvalidDate),
        FieldType::Boolean => parse_boolean(trimmed)
            .map(Value::Bool)
            .ok_or(CoercionKind::InvalidBoolean),
    }
}

fn parse_number(value: &str) -> Option<Value> {
    let parsed: f64 = value.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    if parsed.fract() == 0.0 && parsed.abs() <= MAX_EXACT_INTEGER {
        return Some(Value::from(parsed as i64));
    }
    Number::from_f64(parsed).map(Value::Number)
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
    {
        return Some(date);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|datetime| datetime.date())
}

pub fn parse_boolean(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_keep_integers_integral() {
        assert_eq!(coerce_value(FieldType::Number, "42"), Ok(json!(42)));
        assert_eq!(coerce_value(FieldType::Number, "12.50"), Ok(json!(12.5)));
        assert_eq!(coerce_value(FieldType::Number, "-3e2"), Ok(json!(-300)));
    }

    #[test]
    fn rejects_non_numbers_and_non_finite_values() {
        for raw in ["twelve", "1,200", "NaN", "inf", "1e999"] {
            assert_eq!(
                coerce_value(FieldType::Number, raw),
                Err(CoercionKind::InvalidNumber),
                "{raw}"
            );
        }
    }

    #[test]
    fn dates_normalize_to_calendar_dates() {
        for raw in [
            "2024-03-04",
            "2024/03/04",
            "03/04/2024",
            "2024-03-04T10:15:00Z",
            "2024-03-04T10:15:00+02:00",
            "2024-03-04T10:15:00",
            "2024-03-04 10:15",
        ] {
            assert_eq!(
                coerce_value(FieldType::Date, raw),
                Ok(json!("2024-03-04")),
                "{raw}"
            );
        }
    }

    #[test]
    fn rejects_impossible_dates() {
        for raw in ["2024-02-30", "yesterday", "13/01/2024", "2024-3"] {
            assert_eq!(
                coerce_value(FieldType::Date, raw),
                Err(CoercionKind::InvalidDate),
                "{raw}"
            );
        }
    }

    #[test]
    fn booleans_accept_the_documented_spellings() {
        for raw in ["true", "TRUE", "Yes", "1"] {
            assert_eq!(coerce_value(FieldType::Boolean, raw), Ok(json!(true)));
        }
        for raw in ["false", "No", "0"] {
            assert_eq!(coerce_value(FieldType::Boolean, raw), Ok(json!(false)));
        }
        assert_eq!(
            coerce_value(FieldType::Boolean, "maybe"),
            Err(CoercionKind::InvalidBoolean)
        );
    }

    #[test]
    fn text_like_types_pass_through() {
        assert_eq!(coerce_value(FieldType::Enum, "dog"), Ok(json!("dog")));
        assert_eq!(coerce_value(FieldType::Text, "a\nb"), Ok(json!("a\nb")));
    }
}

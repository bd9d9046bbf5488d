//! Conversion of captured text into typed cell values

use crate::error::CoercionError;
use crate::table::{Column, ColumnType, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Outcome of coercing one captured value
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// The value passed the acceptance pattern and converted
    Accepted(Value),
    /// The acceptance pattern refused the value; the whole row is dropped
    Rejected,
}

/// Date-time layouts tried in order after RFC 3339 and RFC 2822
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
    "%d-%b-%Y %H:%M:%S%.f",
    "%b %d %Y %H:%M:%S%.f",
];

/// Date-only layouts, read as midnight
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%d-%b-%Y", "%b %d %Y", "%d %b %Y",
];

/// Coerce a captured value for `column`.
///
/// `raw` is `None` when the group did not take part in the match; such a value is checked
/// against the acceptance pattern as an empty string and stored as [`Value::Empty`].
pub fn coerce(raw: Option<&str>, column: &Column) -> Result<Coerced, CoercionError> {
    if let Some(acceptance) = &column.acceptance {
        if !acceptance.is_match(raw.unwrap_or_default()) {
            return Ok(Coerced::Rejected);
        }
    }

    match raw {
        Some(text) => convert(text, column.column_type)
            .map(Coerced::Accepted)
            .map_err(|reason| CoercionError {
                column: column.name.clone(),
                value: text.to_string(),
                column_type: column.column_type,
                reason,
            }),
        None => Ok(Coerced::Accepted(Value::Empty)),
    }
}

/// Convert text to a value of the given type
pub fn convert(text: &str, column_type: ColumnType) -> Result<Value, String> {
    match column_type {
        ColumnType::Text => Ok(Value::Text(text.to_string())),
        ColumnType::Integer => text
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| e.to_string()),
        ColumnType::Float => text
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| e.to_string()),
        ColumnType::Timestamp => parse_timestamp(text)
            .map(Value::Timestamp)
            .ok_or_else(|| "unrecognized date/time format".to_string()),
    }
}

/// Parse a date-time in any of the accepted layouts
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnDefinition;

    fn column(column_type: ColumnType) -> Column {
        Column::from_definition(&ColumnDefinition::new("c", column_type), 0)
    }

    fn accepting(column_type: ColumnType, pattern: &str) -> Column {
        let def = ColumnDefinition::new("c", column_type)
            .with_acceptance(pattern)
            .unwrap();
        Column::from_definition(&def, 0)
    }

    #[test]
    fn test_integer_conversion() {
        assert_eq!(
            coerce(Some("42"), &column(ColumnType::Integer)).unwrap(),
            Coerced::Accepted(Value::Integer(42))
        );
        assert_eq!(
            coerce(Some(" -7 "), &column(ColumnType::Integer)).unwrap(),
            Coerced::Accepted(Value::Integer(-7))
        );
    }

    #[test]
    fn test_integer_conversion_failure() {
        let err = coerce(Some("4x"), &column(ColumnType::Integer)).unwrap_err();
        assert_eq!(err.column, "c");
        assert_eq!(err.value, "4x");
        assert_eq!(err.column_type, ColumnType::Integer);
    }

    #[test]
    fn test_float_is_locale_invariant() {
        assert_eq!(
            coerce(Some("3.25"), &column(ColumnType::Float)).unwrap(),
            Coerced::Accepted(Value::Float(3.25))
        );
        assert!(coerce(Some("3,25"), &column(ColumnType::Float)).is_err());
    }

    #[test]
    fn test_text_passes_through() {
        assert_eq!(
            coerce(Some("  spaced "), &column(ColumnType::Text)).unwrap(),
            Coerced::Accepted(Value::Text("  spaced ".to_string()))
        );
    }

    #[test]
    fn test_acceptance_rejects_before_conversion() {
        let col = accepting(ColumnType::Integer, "^[0-9]+$");
        assert_eq!(coerce(Some("12a"), &col).unwrap(), Coerced::Rejected);
        assert_eq!(
            coerce(Some("12"), &col).unwrap(),
            Coerced::Accepted(Value::Integer(12))
        );
    }

    #[test]
    fn test_missing_group_is_empty() {
        assert_eq!(
            coerce(None, &column(ColumnType::Integer)).unwrap(),
            Coerced::Accepted(Value::Empty)
        );
        // The acceptance pattern still sees the empty string
        let col = accepting(ColumnType::Text, ".+");
        assert_eq!(coerce(None, &col).unwrap(), Coerced::Rejected);
    }

    #[test]
    fn test_empty_typed_value_fails() {
        assert!(coerce(Some(""), &column(ColumnType::Integer)).is_err());
    }

    #[test]
    fn test_timestamp_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 30)
            .unwrap();

        for text in [
            "2024-03-09T14:05:30",
            "2024-03-09 14:05:30",
            "2024/03/09 14:05:30",
            "03/09/2024 14:05:30",
            "09.03.2024 14:05:30",
            "2024-03-09T14:05:30+02:00",
        ] {
            assert_eq!(parse_timestamp(text), Some(expected), "{}", text);
        }

        let midnight = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-09"), Some(midnight));
        assert_eq!(parse_timestamp("not a date"), None);
    }
}

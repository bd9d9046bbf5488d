//! Appending matched lines to their tables

use crate::coerce::{coerce, Coerced};
use crate::error::CoercionError;
use crate::table::{Column, ColumnDefinition, ColumnType, Row, TableSet, Value};
use tracing::debug;

/// What happened to a matched line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A row was added at the end of the table
    Appended,
    /// An acceptance pattern refused a value; nothing was added
    Rejected {
        /// Column whose acceptance pattern refused the value
        column: String,
    },
}

/// Append one row to `table_name`, built from captured `(column, text)` pairs.
///
/// Every value is accepted and converted before the table is touched; on rejection or a
/// conversion failure the table set is left as it was. Once the row is kept, a missing table is
/// created and captured names without a column become text columns. Cells follow the table's
/// column order; columns with no captured value hold [`Value::Empty`].
pub fn append_row(
    tables: &mut TableSet,
    table_name: &str,
    values: &[(&str, Option<&str>)],
) -> Result<AppendOutcome, CoercionError> {
    let existing = tables.get(table_name);
    let mut converted = Vec::with_capacity(values.len());

    for &(name, raw) in values {
        let lazy;
        let column = match existing.and_then(|t| t.find_column(name)) {
            Some(column) => column,
            None => {
                lazy = Column::from_definition(&ColumnDefinition::new(name, ColumnType::Text), 0);
                &lazy
            }
        };
        match coerce(raw, column)? {
            Coerced::Accepted(value) => converted.push((name, value)),
            Coerced::Rejected => {
                debug!(
                    table = table_name,
                    column = name,
                    "row rejected by acceptance pattern"
                );
                return Ok(AppendOutcome::Rejected {
                    column: name.to_string(),
                });
            }
        }
    }

    let table = tables.get_or_create(table_name);
    for (name, _) in &converted {
        if table.find_column(name).is_none() {
            table.ensure_column(&ColumnDefinition::new(*name, ColumnType::Text));
        }
    }

    let mut cells = vec![Value::Empty; table.column_count()];
    for (name, value) in converted {
        if let Some(column) = table.find_column(name) {
            cells[column.index] = value;
        }
    }

    table.rows.push(Row::new(cells));
    Ok(AppendOutcome::Appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternSpec;
    use crate::schema::derive_schema;

    fn typed_tables() -> TableSet {
        let registry = vec![
            ColumnDefinition::new("code", ColumnType::Text)
                .with_acceptance("^[0-9]+$")
                .unwrap(),
            ColumnDefinition::new("qty", ColumnType::Integer),
        ];
        let spec =
            PatternSpec::new(r"^(?P<code>\S+) (?P<qty>\S+) (?P<note>.*)$", "t", &registry).unwrap();
        let mut tables = TableSet::new();
        derive_schema(Some(&spec), &[], &mut tables);
        tables
    }

    #[test]
    fn test_append_in_column_order() {
        let mut tables = typed_tables();
        // Values arrive in a different order than the columns
        let outcome = append_row(
            &mut tables,
            "t",
            &[("note", Some("hi")), ("qty", Some("3")), ("code", Some("17"))],
        )
        .unwrap();

        assert_eq!(outcome, AppendOutcome::Appended);
        let row = &tables.get("t").unwrap().rows[0];
        assert_eq!(
            row.cells,
            vec![
                Value::Text("17".to_string()),
                Value::Integer(3),
                Value::Text("hi".to_string())
            ]
        );
    }

    #[test]
    fn test_rejection_drops_whole_row() {
        let mut tables = typed_tables();
        let outcome = append_row(
            &mut tables,
            "t",
            &[("code", Some("12a")), ("qty", Some("3")), ("note", Some("x"))],
        )
        .unwrap();

        assert_eq!(
            outcome,
            AppendOutcome::Rejected {
                column: "code".to_string()
            }
        );
        assert_eq!(tables.get("t").unwrap().row_count(), 0);
    }

    #[test]
    fn test_coercion_failure_leaves_table_unchanged() {
        let mut tables = typed_tables();
        let err = append_row(
            &mut tables,
            "t",
            &[("code", Some("1")), ("qty", Some("4x")), ("note", Some("x"))],
        )
        .unwrap_err();

        assert_eq!(err.column, "qty");
        assert_eq!(tables.get("t").unwrap().row_count(), 0);
    }

    #[test]
    fn test_failed_append_adds_no_columns_or_tables() {
        let mut tables = typed_tables();
        let before = tables.clone();

        let outcome = append_row(&mut tables, "t", &[("code", Some("x")), ("extra", Some("y"))])
            .unwrap();
        assert_eq!(
            outcome,
            AppendOutcome::Rejected {
                column: "code".to_string()
            }
        );

        append_row(&mut tables, "t", &[("qty", Some("nope")), ("other", Some("z"))]).unwrap_err();

        assert_eq!(tables, before);
        assert_eq!(tables.get("t").unwrap().column_count(), 3);
        assert_eq!(tables.names(), vec!["t"]);
    }

    #[test]
    fn test_lazy_table_and_columns() {
        let mut tables = TableSet::new();
        append_row(&mut tables, "new", &[("a", Some("1"))]).unwrap();
        append_row(&mut tables, "new", &[("b", Some("2"))]).unwrap();

        let table = tables.get("new").unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.rows[0].cells, vec![Value::Text("1".to_string()), Value::Empty]);
        assert_eq!(table.rows[1].cells, vec![Value::Empty, Value::Text("2".to_string())]);
    }
}

//! Derivation of table columns from pattern group names

use crate::pattern::{ConditionalPattern, PatternSpec};
use crate::table::TableSet;

/// Create the tables and columns implied by the patterns.
///
/// The primary pattern feeds its own target table; each conditional feeds its target table.
/// Existing tables are reused and existing columns are never duplicated, so running this twice
/// with the same patterns leaves the table set unchanged.
pub fn derive_schema(
    primary: Option<&PatternSpec>,
    conditionals: &[ConditionalPattern],
    tables: &mut TableSet,
) {
    let specs = primary
        .into_iter()
        .chain(conditionals.iter().map(ConditionalPattern::content));

    for spec in specs {
        let table = tables.get_or_create(spec.table());
        for definition in spec.columns() {
            table.ensure_column(definition);
        }
    }
}

/// Build a fresh, row-less table set for the patterns
pub fn schema_for(primary: Option<&PatternSpec>, conditionals: &[ConditionalPattern]) -> TableSet {
    let mut tables = TableSet::new();
    derive_schema(primary, conditionals, &mut tables);
    tables
}

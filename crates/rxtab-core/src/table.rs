//! Table types produced by a parsing run

use crate::error::{Error, Result};
use crate::pattern::Pattern;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the table that receives primary pattern matches unless configured otherwise
pub const DEFAULT_TABLE_NAME: &str = "Table1";

/// Declared type of a column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Captured text, passed through unchanged
    #[default]
    Text,
    /// Signed 64-bit integer
    Integer,
    /// 64-bit floating point number
    Float,
    /// Date and time without a time zone
    Timestamp,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    /// Accepts the type names used by profiles, case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "string" | "str" => Ok(ColumnType::Text),
            "integer" | "int" | "int32" | "int64" => Ok(ColumnType::Integer),
            "float" | "double" | "decimal" | "number" => Ok(ColumnType::Float),
            "timestamp" | "datetime" | "date" => Ok(ColumnType::Timestamp),
            _ => Err(Error::UnknownColumnType(s.to_string())),
        }
    }
}

/// What a pattern says about one of its named groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column identity, equal to the capture group name
    pub name: String,
    /// Declared type
    pub column_type: ColumnType,
    /// Pattern the captured value must match for its row to be kept
    pub acceptance: Option<Pattern>,
    /// Display name, when it differs from the identity
    pub label: Option<String>,
}

impl ColumnDefinition {
    /// Create a definition with no acceptance pattern
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            acceptance: None,
            label: None,
        }
    }

    /// Attach an acceptance pattern, compiling it
    pub fn with_acceptance(mut self, pattern: &str) -> Result<Self> {
        self.acceptance = Some(Pattern::new(pattern)?);
        Ok(self)
    }

    /// Attach a display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A column of a materialized table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column identity, stable for the whole run
    pub name: String,
    /// External label (header rename or raw header text)
    pub label: Option<String>,
    /// Declared type
    pub column_type: ColumnType,
    /// Acceptance pattern for captured values
    pub acceptance: Option<Pattern>,
    /// Column index (0-based)
    pub index: usize,
}

impl Column {
    /// Create a column from a definition at the given position
    pub fn from_definition(definition: &ColumnDefinition, index: usize) -> Self {
        Self {
            name: definition.name.clone(),
            label: definition.label.clone(),
            column_type: definition.column_type,
            acceptance: definition.acceptance.clone(),
            index,
        }
    }

    /// The label if one was assigned, otherwise the identity
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// A row of data, one cell per table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Cell values in column order
    pub cells: Vec<Value>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<Value>) -> Self {
        Self { cells }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.cells.get(index)
    }
}

/// A typed cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Text value
    Text(String),
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// Date-time value
    Timestamp(NaiveDateTime),
    /// No value captured for this column
    Empty,
}

impl Value {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Convert to a display string
    pub fn to_string_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Timestamp(ts) => write!(f, "{}", ts),
            Value::Empty => Ok(()),
        }
    }
}

/// A named table built from matched lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name
    pub name: String,
    /// Column definitions
    pub columns: Vec<Column>,
    /// Row data
    pub rows: Vec<Row>,
}

impl Table {
    /// Create a new empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by identity
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Add a column unless one with the same identity exists; returns its index.
    ///
    /// Rows already in the table get an `Empty` cell for the new column.
    pub fn ensure_column(&mut self, definition: &ColumnDefinition) -> usize {
        if let Some(existing) = self.find_column(&definition.name) {
            return existing.index;
        }
        let index = self.columns.len();
        self.columns.push(Column::from_definition(definition, index));
        for row in &mut self.rows {
            row.cells.push(Value::Empty);
        }
        index
    }

    /// Set the external label of a column; returns false if the column does not exist
    pub fn relabel_column(&mut self, name: &str, label: impl Into<String>) -> bool {
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => {
                column.label = Some(label.into());
                true
            }
            None => false,
        }
    }

    /// Get a cell by row index and column identity
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.find_column(column)?.index;
        self.rows.get(row).and_then(|r| r.get(index))
    }
}

/// Ordered registry of tables, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSet {
    tables: Vec<Table>,
}

impl TableSet {
    /// Create an empty table set
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a table by name
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Get a mutable table by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Get the table with this name, creating it at the end if it does not exist
    pub fn get_or_create(&mut self, name: &str) -> &mut Table {
        let position = match self.tables.iter().position(|t| t.name == name) {
            Some(position) => position,
            None => {
                self.tables.push(Table::new(name));
                self.tables.len() - 1
            }
        };
        &mut self.tables[position]
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if there are no tables
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Iterate tables in creation order
    pub fn iter(&self) -> std::slice::Iter<'_, Table> {
        self.tables.iter()
    }

    /// Table names in creation order
    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Total number of rows across all tables
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(Table::row_count).sum()
    }

    /// Drop every table
    pub fn clear(&mut self) {
        self.tables.clear();
    }
}

impl<'a> IntoIterator for &'a TableSet {
    type Item = &'a Table;
    type IntoIter = std::slice::Iter<'a, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}

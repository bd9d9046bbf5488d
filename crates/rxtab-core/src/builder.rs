//! Building line patterns from column layouts
//!
//! A [`ColumnBuilder`] turns an ordered list of column specs into one anchored expression with a
//! named group per column, plus the column definitions (types, acceptance patterns, labels) that
//! go with it. It also holds the helpers used to read column names from a header line.

use crate::error::Result;
use crate::pattern::PatternSpec;
use crate::table::{ColumnDefinition, ColumnType};

/// How a column's text is delimited in the line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnLayout {
    /// Everything up to the next separator
    Delimited,
    /// The rest of the line
    Rest,
    /// Text between double quotes; the quotes are not captured
    Quoted,
    /// Exactly this many characters
    Fixed(usize),
    /// A caller-supplied expression for the group body
    Custom(String),
}

/// One column of a [`ColumnBuilder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Group name (a valid regex identifier)
    pub name: String,
    /// Original name when it had to be changed to form a group name
    pub label: Option<String>,
    /// How the value is delimited
    pub layout: ColumnLayout,
    /// Literal text expected before the value
    pub prefix: String,
    /// Literal text expected after the value
    pub suffix: String,
    /// Declared type
    pub column_type: ColumnType,
    /// Acceptance pattern for the captured value
    pub condition: Option<String>,
}

impl ColumnSpec {
    /// Create a text column; `name` is turned into a valid group name if needed
    pub fn new(name: &str, layout: ColumnLayout) -> Self {
        let group = group_name(name);
        let label = (group != name).then(|| name.to_string());
        Self {
            name: group,
            label,
            layout,
            prefix: String::new(),
            suffix: String::new(),
            column_type: ColumnType::Text,
            condition: None,
        }
    }

    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = column_type;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    fn definition(&self) -> Result<ColumnDefinition> {
        let mut definition = ColumnDefinition::new(&self.name, self.column_type);
        if let Some(condition) = &self.condition {
            definition = definition.with_acceptance(condition)?;
        }
        if let Some(label) = &self.label {
            definition = definition.with_label(label);
        }
        Ok(definition)
    }
}

/// Builds an anchored line pattern from column specs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnBuilder {
    separator: String,
    columns: Vec<ColumnSpec>,
}

impl ColumnBuilder {
    /// Create an empty builder; `separator` goes between consecutive columns
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            columns: Vec::new(),
        }
    }

    /// Delimited text columns, the last one taking the rest of the line
    pub fn from_names<S: AsRef<str>>(separator: impl Into<String>, names: &[S]) -> Self {
        let mut builder = Self::new(separator);
        for (i, name) in names.iter().enumerate() {
            let layout = if i + 1 == names.len() {
                ColumnLayout::Rest
            } else {
                ColumnLayout::Delimited
            };
            builder.add_column(ColumnSpec::new(name.as_ref(), layout));
        }
        builder
    }

    /// Append a column.
    ///
    /// Empty names become `ColumnN`; a name already in use gets a numeric suffix.
    pub fn add_column(&mut self, mut spec: ColumnSpec) -> &mut Self {
        if spec.name.is_empty() {
            spec.name = format!("Column{}", self.columns.len() + 1);
        }
        if self.columns.iter().any(|c| c.name == spec.name) {
            let base = spec.name.clone();
            let mut n = 2;
            while self.columns.iter().any(|c| c.name == format!("{}_{}", base, n)) {
                n += 1;
            }
            spec.label.get_or_insert_with(|| base.clone());
            spec.name = format!("{}_{}", base, n);
        }
        self.columns.push(spec);
        self
    }

    /// Separator placed between columns
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Column specs in order
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The full anchored expression, e.g. `^(?P<id>[^,\n]*),(?P<name>.*)$`
    pub fn expression(&self) -> String {
        let parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                format!(
                    "{}{}{}",
                    regex::escape(&c.prefix),
                    self.group(&c.name, &c.layout),
                    regex::escape(&c.suffix)
                )
            })
            .collect();
        format!("^{}$", parts.join(&regex::escape(&self.separator)))
    }

    /// An expression matching a header line with one group per column, named like the columns.
    ///
    /// Returns `None` without a separator, since fixed or free layouts say nothing about where
    /// header names start and end.
    pub fn header_expression(&self) -> Option<String> {
        if self.separator.is_empty() || self.columns.is_empty() {
            return None;
        }
        let last = self.columns.len() - 1;
        let parts: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let layout = if i == last {
                    ColumnLayout::Rest
                } else {
                    ColumnLayout::Delimited
                };
                self.group(&c.name, &layout)
            })
            .collect();
        Some(format!(
            "^{}$",
            parts.join(&regex::escape(&self.separator))
        ))
    }

    /// Column definitions in order, with acceptance patterns compiled
    pub fn definitions(&self) -> Result<Vec<ColumnDefinition>> {
        self.columns.iter().map(ColumnSpec::definition).collect()
    }

    /// Compile the expression for `table`
    pub fn build(&self, table: impl Into<String>) -> Result<PatternSpec> {
        PatternSpec::new(&self.expression(), table, &self.definitions()?)
    }

    fn group(&self, name: &str, layout: &ColumnLayout) -> String {
        let body = match layout {
            ColumnLayout::Delimited => match self.separator.chars().next() {
                Some(sep) => format!("[^{}\\n]*", regex::escape(&sep.to_string())),
                None => ".*".to_string(),
            },
            ColumnLayout::Rest => ".*".to_string(),
            ColumnLayout::Quoted => return format!("\"(?P<{}>[^\"]*)\"", name),
            ColumnLayout::Fixed(len) => format!(".{{{}}}", len),
            ColumnLayout::Custom(expr) => expr.clone(),
        };
        format!("(?P<{}>{})", name, body)
    }
}

/// Turn arbitrary text into a valid capture group name.
///
/// Characters other than ASCII letters, digits and `_` become `_`; a leading digit gets a `_`
/// in front.
pub fn group_name(raw: &str) -> String {
    let mut name: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// The field separator of a header line: its first character that is not a letter, digit,
/// `_` or `"`.
pub fn sniff_separator(line: &str) -> Option<char> {
    line.chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '"'))
}

/// Split a header line into names, honoring double quotes for single-byte separators
pub fn split_header(line: &str, separator: char) -> Result<Vec<String>> {
    if !separator.is_ascii() {
        return Ok(line.split(separator).map(str::to_string).collect());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(separator as u8)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(str::to_string).collect()),
        None => Ok(Vec::new()),
    }
}

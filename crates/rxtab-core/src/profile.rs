//! Declarative parser profiles
//!
//! A profile is a tree of named nodes with string attributes, stored as JSON:
//!
//! ```text
//! {
//!   "name": "orders",
//!   "attributes": { "separator": ",", "tablename": "orders", "hasheader": "false" },
//!   "children": [
//!     { "name": "id", "attributes": { "type": "integer", "condition": "^[0-9]+$" } },
//!     { "name": "item" },
//!     { "name": "IF", "attributes": { "condition": "^#", "tablename": "comments" },
//!       "children": [ { "name": "text", "attributes": { "prefix": "#" } } ] }
//!   ]
//! }
//! ```
//!
//! Root attributes: `separator`, `tablename`, `hasheader`, `skipfirstrow`, `coercion`.
//! `IF` nodes open a conditional branch (`separator`, `condition`, `tablename`) whose children
//! form its content pattern. Every other node is a column (`separator`, `prefix`, `suffix`,
//! `quotes`, `length`, `type`, `condition`). Attribute keys are case-insensitive.

use crate::builder::{ColumnBuilder, ColumnLayout, ColumnSpec};
use crate::error::{Error, Result};
use crate::parser::{HeaderMode, ParserOptions, RegexParser};
use crate::pattern::{ConditionalPattern, Pattern};
use crate::table::ColumnType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Node name that opens a conditional branch
pub const CONDITIONAL_NODE: &str = "IF";

/// A node of a profile tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileNode {
    /// Node name: `IF` or a column name
    pub name: String,
    /// Attributes by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Child nodes in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ProfileNode>,
}

impl ProfileNode {
    /// Create a node without attributes or children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Append a child node
    pub fn with_child(mut self, child: ProfileNode) -> Self {
        self.children.push(child);
        self
    }

    /// Look up an attribute ignoring key case
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Whether this node opens a conditional branch
    pub fn is_conditional(&self) -> bool {
        self.name.eq_ignore_ascii_case(CONDITIONAL_NODE)
    }

    /// Load a profile from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the profile to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Parser options from the root attributes
    pub fn options(&self) -> Result<ParserOptions> {
        let mut options = ParserOptions::default();
        if let Some(table) = self.attribute("tablename") {
            options.table_name = table.to_string();
        }
        if let Some(separator) = self.attribute("separator").filter(|s| !s.is_empty()) {
            options.separator = Some(separator.to_string());
        }
        if let Some(policy) = self.attribute("coercion") {
            options.coercion = policy.parse()?;
        }

        let has_header = self.bool_attribute("hasheader")?.unwrap_or(false);
        let skip_first_row = self.bool_attribute("skipfirstrow")?.unwrap_or(false);
        options.header = if skip_first_row {
            HeaderMode::Skip
        } else if has_header {
            HeaderMode::Names
        } else {
            HeaderMode::None
        };
        Ok(options)
    }

    /// Build a parser from this root node.
    ///
    /// Column children form the primary pattern; a root without column children has no primary
    /// pattern (only conditionals, or names read from a header line).
    pub fn build_parser(&self) -> Result<RegexParser> {
        let options = self.options()?;
        let separator = options.separator.clone().unwrap_or_default();
        let table_name = options.table_name.clone();

        let mut columns = ColumnBuilder::new(separator.clone());
        let mut conditionals = Vec::new();
        add_children(&self.children, &separator, &table_name, &mut columns, &mut conditionals)?;

        let mut parser = RegexParser::new(options);
        if !columns.is_empty() {
            parser.set_column_builder(columns)?;
        }
        for conditional in conditionals {
            parser.add_conditional(conditional);
        }
        Ok(parser)
    }

    fn bool_attribute(&self, key: &str) -> Result<Option<bool>> {
        self.attribute(key).map(|v| parse_bool(key, v)).transpose()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" | "" => Ok(false),
        _ => Err(Error::Profile(format!(
            "attribute '{}' expects true or false, got '{}'",
            key, value
        ))),
    }
}

/// Add column children to `columns` and register IF children as conditionals.
///
/// The last column child takes the rest of the line when a separator is in effect.
fn add_children(
    nodes: &[ProfileNode],
    separator: &str,
    default_table: &str,
    columns: &mut ColumnBuilder,
    conditionals: &mut Vec<ConditionalPattern>,
) -> Result<()> {
    let last_column = nodes.iter().rposition(|n| !n.is_conditional());

    for (i, node) in nodes.iter().enumerate() {
        if node.is_conditional() {
            conditional_from(node, separator, default_table, conditionals)?;
        } else {
            columns.add_column(column_from(node, separator, Some(i) == last_column)?);
        }
    }
    Ok(())
}

fn column_from(node: &ProfileNode, separator: &str, is_last: bool) -> Result<ColumnSpec> {
    if node.name.trim().is_empty() {
        return Err(Error::Profile("column node without a name".to_string()));
    }

    let own_separator = node.attribute("separator");
    let separator = own_separator.unwrap_or(separator);
    let quoted = node.bool_attribute("quotes")?.unwrap_or(false);
    let length = match node.attribute("length") {
        Some(v) => v.trim().parse::<usize>().map_err(|_| {
            Error::Profile(format!("column '{}': invalid length '{}'", node.name, v))
        })?,
        None => 0,
    };

    let layout = match separator.chars().next() {
        Some(_) if quoted => ColumnLayout::Quoted,
        Some(_) if is_last => ColumnLayout::Rest,
        Some(sep) if own_separator.is_some() => {
            ColumnLayout::Custom(format!("[^{}\\n]*", regex::escape(&sep.to_string())))
        }
        Some(_) => ColumnLayout::Delimited,
        None if length > 0 => ColumnLayout::Fixed(length),
        None => ColumnLayout::Rest,
    };

    let mut spec = ColumnSpec::new(&node.name, layout);
    if let Some(prefix) = node.attribute("prefix") {
        spec = spec.with_prefix(prefix);
    }
    if let Some(suffix) = node.attribute("suffix") {
        spec = spec.with_suffix(suffix);
    }
    if let Some(column_type) = node.attribute("type") {
        spec = spec.with_type(column_type.parse::<ColumnType>()?);
    }
    if let Some(condition) = node.attribute("condition").filter(|c| !c.trim().is_empty()) {
        spec = spec.with_condition(condition);
    }
    Ok(spec)
}

/// Register the conditional described by an IF node; nested IFs are registered first
fn conditional_from(
    node: &ProfileNode,
    separator: &str,
    default_table: &str,
    conditionals: &mut Vec<ConditionalPattern>,
) -> Result<()> {
    let separator = node.attribute("separator").unwrap_or(separator);
    let condition = node.attribute("condition").unwrap_or_default();
    let table = node.attribute("tablename").unwrap_or(default_table);

    let mut columns = ColumnBuilder::new(separator);
    add_children(&node.children, separator, default_table, &mut columns, conditionals)?;

    let content = columns.build(table)?;
    conditionals.push(ConditionalPattern::from_parts(Pattern::new(condition)?, content));
    Ok(())
}

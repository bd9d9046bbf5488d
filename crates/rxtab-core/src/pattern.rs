//! Compiled line patterns and the column descriptors reflected from their named groups
//!
//! Group names are read once, when a [`PatternSpec`] is built. Matching afterwards walks the
//! stored [`GroupDescriptor`] list instead of asking the regex for its names again.

use crate::error::{Error, Result};
use crate::table::{ColumnDefinition, ColumnType};
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Name reserved for the whole match; never turned into a column
pub const WHOLE_MATCH_GROUP: &str = "0";

/// A compiled regular expression that compares and serializes by its source text
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile a pattern
    pub fn new(expression: &str) -> Result<Self> {
        Regex::new(expression)
            .map(Pattern)
            .map_err(|source| Error::InvalidPattern {
                pattern: expression.to_string(),
                source,
            })
    }

    /// The source expression
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Test the pattern against a string
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    /// The underlying regex
    pub fn regex(&self) -> &Regex {
        &self.0
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl Serialize for Pattern {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let expression = String::deserialize(deserializer)?;
        Pattern::new(&expression).map_err(de::Error::custom)
    }
}

/// Whether a capture group name should become a column.
///
/// The whole-match sentinel and names that read as plain ordinals are excluded.
pub fn is_column_group(name: &str) -> bool {
    name != WHOLE_MATCH_GROUP && name.parse::<i16>().is_err()
}

/// A named capture group and the column it feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescriptor {
    /// Capture group index within the pattern
    pub index: usize,
    /// Column definition for this group
    pub column: ColumnDefinition,
}

/// Values captured from one line: (column name, captured text).
///
/// `None` means the group did not take part in the match.
pub type CapturedValues<'a> = Vec<(&'a str, Option<&'a str>)>;

/// A compiled content pattern bound to a target table
#[derive(Debug, Clone, PartialEq)]
pub struct PatternSpec {
    pattern: Pattern,
    table: String,
    groups: Vec<GroupDescriptor>,
}

impl PatternSpec {
    /// Compile `expression` for `table`.
    ///
    /// `registry` supplies declared types and acceptance patterns by group name; groups without
    /// an entry become text columns.
    pub fn new(
        expression: &str,
        table: impl Into<String>,
        registry: &[ColumnDefinition],
    ) -> Result<Self> {
        Ok(Self::from_pattern(Pattern::new(expression)?, table, registry))
    }

    /// Build from an already compiled pattern
    pub fn from_pattern(
        pattern: Pattern,
        table: impl Into<String>,
        registry: &[ColumnDefinition],
    ) -> Self {
        let groups = pattern
            .regex()
            .capture_names()
            .enumerate()
            .filter_map(|(index, name)| {
                let name = name.filter(|n| is_column_group(n))?;
                let column = registry
                    .iter()
                    .find(|d| d.name == name)
                    .cloned()
                    .unwrap_or_else(|| ColumnDefinition::new(name, ColumnType::Text));
                Some(GroupDescriptor { index, column })
            })
            .collect();

        Self {
            pattern,
            table: table.into(),
            groups,
        }
    }

    /// The source expression
    pub fn expression(&self) -> &str {
        self.pattern.as_str()
    }

    /// The compiled pattern
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Target table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Named groups in pattern order
    pub fn groups(&self) -> &[GroupDescriptor] {
        &self.groups
    }

    /// Column definitions in pattern order
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.groups.iter().map(|g| &g.column)
    }

    /// Test the pattern against a line
    pub fn is_match(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }

    /// Match a line, returning every named group's captured text
    pub fn captures<'a>(&'a self, line: &'a str) -> Option<CapturedValues<'a>> {
        let caps = self.pattern.regex().captures(line)?;
        Some(
            self.groups
                .iter()
                .map(|g| (g.column.name.as_str(), caps.get(g.index).map(|m| m.as_str())))
                .collect(),
        )
    }
}

/// A content pattern guarded by a condition, used when the primary pattern does not match
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalPattern {
    condition: Pattern,
    content: PatternSpec,
}

impl ConditionalPattern {
    /// Compile a (condition, content, table) triple
    pub fn new(
        condition: &str,
        content: &str,
        table: impl Into<String>,
        registry: &[ColumnDefinition],
    ) -> Result<Self> {
        Ok(Self {
            condition: Pattern::new(condition)?,
            content: PatternSpec::new(content, table, registry)?,
        })
    }

    /// Combine a compiled condition with a content pattern
    pub fn from_parts(condition: Pattern, content: PatternSpec) -> Self {
        Self { condition, content }
    }

    /// The condition tested against the raw line
    pub fn condition(&self) -> &Pattern {
        &self.condition
    }

    /// The content pattern that extracts values
    pub fn content(&self) -> &PatternSpec {
        &self.content
    }

    /// Target table name
    pub fn table(&self) -> &str {
        self.content.table()
    }
}

//! Stream driver: reads text line by line and fills the table set
//!
//! A [`RegexParser`] holds the patterns and options for a run, owns the resulting
//! [`TableSet`] and misread log, and exposes `fill*` entry points for streams, files and
//! strings. Each run:
//!
//! 1. rewinds the input and reads the first line,
//! 2. derives column names from that line when header names are requested and no pattern
//!    exists yet,
//! 3. builds the schema (rebuilding from scratch if the patterns changed since the last run),
//! 4. routes every line to a table, recording lines nothing claims as misreads,
//! 5. applies header labels once the whole stream has been consumed.

use crate::builder::{self, ColumnBuilder};
use crate::error::{CoercionError, Error, Result};
use crate::materialize::{append_row, AppendOutcome};
use crate::pattern::{is_column_group, ConditionalPattern, Pattern, PatternSpec};
use crate::progress::{ProgressEvent, ProgressSink, ProgressStatus};
use crate::router::{MatchOutcome, Router};
use crate::schema::{derive_schema, schema_for};
use crate::table::{ColumnDefinition, Table, TableSet, DEFAULT_TABLE_NAME};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// What to do with the first line of the input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMode {
    /// The first line is data
    #[default]
    None,
    /// The first line is discarded
    Skip,
    /// The first line supplies column names
    Names,
}

impl FromStr for HeaderMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "no" | "false" => Ok(HeaderMode::None),
            "skip" => Ok(HeaderMode::Skip),
            "names" | "yes" | "true" => Ok(HeaderMode::Names),
            other => Err(Error::Configuration(format!(
                "unknown header mode '{}' (expected none, skip or names)",
                other
            ))),
        }
    }
}

/// Header handling state of the current or last run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderState {
    /// The first line is not a header
    #[default]
    NotUsed,
    /// Names are expected from the first line
    PendingFirstLine,
    /// Names were read and staged as column labels
    NamesAssigned,
}

/// What happens when a captured value cannot be converted to its column type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Drop the line, log it and keep going
    #[default]
    Skip,
    /// Stop the run with [`Error::Coercion`]
    Abort,
}

impl FromStr for CoercionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(CoercionPolicy::Skip),
            "abort" => Ok(CoercionPolicy::Abort),
            other => Err(Error::Configuration(format!(
                "unknown coercion policy '{}' (expected skip or abort)",
                other
            ))),
        }
    }
}

/// Parser settings that are not patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Table receiving primary pattern matches
    pub table_name: String,
    /// First-line handling
    pub header: HeaderMode,
    /// Field separator; sniffed from the header line when absent
    pub separator: Option<String>,
    /// Handling of conversion failures
    pub coercion: CoercionPolicy,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            header: HeaderMode::None,
            separator: None,
            coercion: CoercionPolicy::Skip,
        }
    }
}

/// A line dropped because one of its values did not convert
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionFailure {
    pub line_number: usize,
    pub line: String,
    pub error: CoercionError,
}

/// Counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FillSummary {
    /// Lines read, header included
    pub lines_read: usize,
    /// Rows appended across all tables
    pub rows_added: usize,
    /// Matched lines dropped by an acceptance pattern
    pub rows_rejected: usize,
    /// Lines no pattern claimed
    pub misreads: usize,
    /// Lines dropped because a value did not convert
    pub coercion_failures: usize,
}

/// Regex-driven line parser producing one or more tables
pub struct RegexParser {
    options: ParserOptions,
    primary: Option<PatternSpec>,
    column_builder: Option<ColumnBuilder>,
    first_row_pattern: Option<Pattern>,
    conditionals: Vec<ConditionalPattern>,
    tables: TableSet,
    misreads: Vec<String>,
    coercion_failures: Vec<CoercionFailure>,
    header_state: HeaderState,
    schema_dirty: bool,
    sinks: Vec<Box<dyn ProgressSink>>,
}

impl fmt::Debug for RegexParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexParser")
            .field("options", &self.options)
            .field("primary", &self.primary.as_ref().map(PatternSpec::expression))
            .field("conditionals", &self.conditionals.len())
            .field("tables", &self.tables.names())
            .field("misreads", &self.misreads.len())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Default for RegexParser {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

impl RegexParser {
    /// Create a parser with no patterns
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            primary: None,
            column_builder: None,
            first_row_pattern: None,
            conditionals: Vec::new(),
            tables: TableSet::new(),
            misreads: Vec::new(),
            coercion_failures: Vec::new(),
            header_state: HeaderState::NotUsed,
            schema_dirty: true,
            sinks: Vec::new(),
        }
    }

    /// Create a parser from a primary expression targeting the default table
    pub fn with_pattern(expression: &str, registry: &[ColumnDefinition]) -> Result<Self> {
        let mut parser = Self::default();
        parser.set_primary_pattern(expression, registry)?;
        Ok(parser)
    }

    /// Replace the primary pattern.
    ///
    /// A pattern that differs from the current one discards every table at the start of the
    /// next run.
    pub fn set_primary_pattern(
        &mut self,
        expression: &str,
        registry: &[ColumnDefinition],
    ) -> Result<()> {
        let spec = PatternSpec::new(expression, self.options.table_name.clone(), registry)?;
        self.column_builder = None;
        self.replace_primary(Some(spec));
        Ok(())
    }

    /// Replace the primary pattern with one built from column specs
    pub fn set_column_builder(&mut self, builder: ColumnBuilder) -> Result<()> {
        let spec = builder.build(self.options.table_name.clone())?;
        self.column_builder = Some(builder);
        self.replace_primary(Some(spec));
        Ok(())
    }

    /// Change the table receiving primary matches, re-targeting the current primary pattern
    pub fn set_table_name(&mut self, table_name: impl Into<String>) {
        self.options.table_name = table_name.into();
        let retargeted = self.primary.as_ref().map(|primary| {
            let columns: Vec<ColumnDefinition> = primary.columns().cloned().collect();
            PatternSpec::from_pattern(
                primary.pattern().clone(),
                self.options.table_name.clone(),
                &columns,
            )
        });
        if retargeted.is_some() {
            self.replace_primary(retargeted);
        }
    }

    fn replace_primary(&mut self, spec: Option<PatternSpec>) {
        if self.primary != spec {
            self.primary = spec;
            self.schema_dirty = true;
        }
    }

    /// Register a conditional pattern after those already registered
    pub fn add_conditional(&mut self, conditional: ConditionalPattern) {
        self.conditionals.push(conditional);
        self.schema_dirty = true;
    }

    /// Pattern matched against the first line when header names are requested
    pub fn set_first_row_pattern(&mut self, expression: &str) -> Result<()> {
        self.first_row_pattern = Some(Pattern::new(expression)?);
        Ok(())
    }

    pub fn set_header_mode(&mut self, header: HeaderMode) {
        self.options.header = header;
    }

    pub fn set_separator(&mut self, separator: impl Into<String>) {
        self.options.separator = Some(separator.into());
    }

    pub fn set_coercion_policy(&mut self, policy: CoercionPolicy) {
        self.options.coercion = policy;
    }

    /// Subscribe to per-line progress events
    pub fn add_progress_sink(&mut self, sink: impl ProgressSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn primary(&self) -> Option<&PatternSpec> {
        self.primary.as_ref()
    }

    pub fn column_builder(&self) -> Option<&ColumnBuilder> {
        self.column_builder.as_ref()
    }

    pub fn conditionals(&self) -> &[ConditionalPattern] {
        &self.conditionals
    }

    /// Tables built so far
    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    /// The table receiving primary matches, if it exists yet
    pub fn default_table(&self) -> Option<&Table> {
        self.tables.get(&self.options.table_name)
    }

    /// Lines no pattern claimed, in input order
    pub fn misreads(&self) -> &[String] {
        &self.misreads
    }

    /// Lines dropped under [`CoercionPolicy::Skip`]
    pub fn coercion_failures(&self) -> &[CoercionFailure] {
        &self.coercion_failures
    }

    pub fn header_state(&self) -> HeaderState {
        self.header_state
    }

    /// Take the table set and misread log
    pub fn into_parts(self) -> (TableSet, Vec<String>) {
        (self.tables, self.misreads)
    }

    /// Row-less tables implied by the current patterns
    pub fn schema(&self) -> TableSet {
        schema_for(self.primary.as_ref(), &self.conditionals)
    }

    /// Parse a file
    pub fn fill_path<P: AsRef<Path>>(&mut self, path: P) -> Result<FillSummary> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.fill(file)
    }

    /// Parse text held in memory
    pub fn fill_str(&mut self, content: &str) -> Result<FillSummary> {
        self.fill(Cursor::new(content.as_bytes()))
    }

    /// Parse a stream from its beginning
    pub fn fill<R: Read + Seek>(&mut self, mut input: R) -> Result<FillSummary> {
        input.seek(SeekFrom::Start(0))?;
        let mut lines = BufReader::new(input).lines();

        self.notify(0, ProgressStatus::LoadingFirstLine);
        let first = lines.next().transpose()?;
        let sniffed = match first.as_deref() {
            Some(first) => self.columns_from_header(first)?,
            None => false,
        };

        self.notify(1, ProgressStatus::BuildingSchema);
        self.ensure_schema()?;
        let first_row = self.resolve_first_row()?;
        self.header_state = if sniffed {
            HeaderState::NamesAssigned
        } else if first_row.is_some() {
            HeaderState::PendingFirstLine
        } else {
            HeaderState::NotUsed
        };

        let mut summary = FillSummary::default();
        let mut labels = Vec::new();

        for (index, line) in first.map(Ok).into_iter().chain(lines).enumerate() {
            let line = line?;
            let line_number = index + 1;
            summary.lines_read += 1;

            match (line_number, &first_row) {
                (1, Some(pattern)) => {
                    self.notify(line_number, ProgressStatus::ReadingHeader);
                    labels = self.header_labels(pattern, &line)?;
                    self.header_state = HeaderState::NamesAssigned;
                }
                (1, None) if self.options.header == HeaderMode::Skip => {
                    debug!("skipping first line");
                }
                _ => self.load_line(&line, line_number, &mut summary)?,
            }

            self.notify(line_number, ProgressStatus::LineProcessed);
        }

        if let Some(table) = self.tables.get_mut(&self.options.table_name) {
            for (name, label) in labels {
                table.relabel_column(&name, label);
            }
        }

        info!(
            lines = summary.lines_read,
            rows = summary.rows_added,
            rejected = summary.rows_rejected,
            misreads = summary.misreads,
            coercion_failures = summary.coercion_failures,
            "fill complete"
        );
        Ok(summary)
    }

    /// Route and store each non-empty line of `text`, without header handling
    pub fn load_lines(&mut self, text: &str) -> Result<FillSummary> {
        self.ensure_schema()?;
        let mut summary = FillSummary::default();
        for (index, line) in text.lines().enumerate() {
            summary.lines_read += 1;
            self.load_line(line, index + 1, &mut summary)?;
        }
        Ok(summary)
    }

    fn load_line(&mut self, line: &str, line_number: usize, summary: &mut FillSummary) -> Result<()> {
        if line.is_empty() {
            return Ok(());
        }

        let router = Router::new(self.primary.as_ref(), &self.conditionals);
        let (table, values) = match router.route(line) {
            MatchOutcome::Primary { table, values } | MatchOutcome::Conditional { table, values } => {
                (table, values)
            }
            MatchOutcome::NoMatch => {
                self.misreads.push(line.to_string());
                summary.misreads += 1;
                return Ok(());
            }
        };

        match append_row(&mut self.tables, table, &values) {
            Ok(AppendOutcome::Appended) => summary.rows_added += 1,
            Ok(AppendOutcome::Rejected { .. }) => summary.rows_rejected += 1,
            Err(error) => match self.options.coercion {
                CoercionPolicy::Abort => {
                    return Err(Error::Coercion {
                        line_number,
                        source: error,
                    })
                }
                CoercionPolicy::Skip => {
                    warn!(line_number, %error, "skipping line with unconvertible value");
                    self.coercion_failures.push(CoercionFailure {
                        line_number,
                        line: line.to_string(),
                        error,
                    });
                    summary.coercion_failures += 1;
                }
            },
        }
        Ok(())
    }

    /// Rebuild the tables when the patterns changed, then make sure every column exists
    fn ensure_schema(&mut self) -> Result<()> {
        if self.primary.is_none() && self.conditionals.is_empty() {
            return Err(Error::EmptyPatternSet);
        }
        if self.schema_dirty {
            debug!("patterns changed, rebuilding schema");
            self.tables.clear();
            self.misreads.clear();
            self.coercion_failures.clear();
            self.schema_dirty = false;
        }
        derive_schema(self.primary.as_ref(), &self.conditionals, &mut self.tables);
        Ok(())
    }

    /// With header names requested and no columns known yet, build the primary pattern from
    /// the names in `first`; the line is then skipped instead of read as a header. Returns
    /// whether names were taken.
    fn columns_from_header(&mut self, first: &str) -> Result<bool> {
        let has_columns = self.primary.as_ref().is_some_and(|p| !p.groups().is_empty());
        if self.options.header != HeaderMode::Names
            || self.first_row_pattern.is_some()
            || has_columns
        {
            return Ok(false);
        }

        let separator = self
            .options
            .separator
            .as_deref()
            .and_then(|s| s.chars().next())
            .or_else(|| builder::sniff_separator(first));

        let columns = match separator {
            Some(sep) => {
                let names = builder::split_header(first, sep)?;
                ColumnBuilder::from_names(sep.to_string(), &names)
            }
            None => ColumnBuilder::from_names("", &[first]),
        };
        debug!(
            separator = ?separator,
            columns = columns.columns().len(),
            "column names taken from header line"
        );

        self.set_column_builder(columns)?;
        if let Some(sep) = separator {
            self.options.separator = Some(sep.to_string());
        }
        self.options.header = HeaderMode::Skip;
        Ok(true)
    }

    /// The pattern the first line must match, when header names are requested
    fn resolve_first_row(&self) -> Result<Option<Pattern>> {
        if self.options.header != HeaderMode::Names {
            return Ok(None);
        }
        if let Some(pattern) = &self.first_row_pattern {
            return Ok(Some(pattern.clone()));
        }

        let from_builder = self.column_builder.as_ref().and_then(|layout| {
            match (layout.separator().is_empty(), &self.options.separator) {
                (true, Some(separator)) => {
                    let names: Vec<&str> = layout.columns().iter().map(|c| c.name.as_str()).collect();
                    ColumnBuilder::from_names(separator.clone(), &names).header_expression()
                }
                _ => layout.header_expression(),
            }
        });

        match from_builder {
            Some(expression) => Pattern::new(&expression).map(Some),
            None => Err(Error::Configuration(
                "header names requested but no first-row pattern is set and none can be \
                 derived from a separator and columns"
                    .to_string(),
            )),
        }
    }

    /// Match the header line and pair each captured name with the column it labels.
    ///
    /// Named groups label the column with the same name; unnamed group `i` labels column `i`.
    fn header_labels(&self, pattern: &Pattern, line: &str) -> Result<Vec<(String, String)>> {
        let caps = pattern
            .regex()
            .captures(line)
            .ok_or_else(|| Error::HeaderMismatch {
                pattern: pattern.as_str().to_string(),
                line: line.to_string(),
            })?;

        let Some(table) = self.default_table() else {
            return Ok(Vec::new());
        };

        let mut labels = Vec::new();
        for (index, name) in pattern.regex().capture_names().enumerate().skip(1) {
            let Some(value) = caps.get(index) else {
                continue;
            };
            let column = match name {
                Some(name) if is_column_group(name) => table.find_column(name),
                _ => table.columns.get(index - 1),
            };
            match column {
                Some(column) => labels.push((column.name.clone(), value.as_str().to_string())),
                None => debug!(group = index, "header group has no matching column"),
            }
        }
        Ok(labels)
    }

    fn notify(&mut self, line_number: usize, status: ProgressStatus) {
        let event = ProgressEvent {
            line_number,
            status,
        };
        for sink in &mut self.sinks {
            sink.on_progress(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnType, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    const PEOPLE: &str = r"^(?P<id>\d+),(?P<name>[^,]+),(?P<age>.*)$";

    fn typed_people() -> RegexParser {
        let registry = vec![ColumnDefinition::new("age", ColumnType::Integer)];
        RegexParser::with_pattern(PEOPLE, &registry).unwrap()
    }

    #[test]
    fn test_fill_simple() {
        let mut parser = typed_people();
        let summary = parser.fill_str("1,ann,31\n2,bob,42\n").unwrap();

        assert_eq!(summary.lines_read, 2);
        assert_eq!(summary.rows_added, 2);
        let table = parser.default_table().unwrap();
        assert_eq!(table.name, DEFAULT_TABLE_NAME);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, "age"), Some(&Value::Integer(42)));
        assert!(parser.misreads().is_empty());
    }

    #[test]
    fn test_row_count_matches_line_count_minus_header() {
        let input = "header line\n1,a,1\n2,b,2\n3,c,3\n";
        let mut parser = typed_people();
        parser.set_header_mode(HeaderMode::Skip);
        parser.fill_str(input).unwrap();

        assert_eq!(parser.default_table().unwrap().row_count(), 3);
    }

    #[test]
    fn test_misreads_are_recorded_in_order() {
        let mut parser = typed_people();
        let summary = parser.fill_str("1,a,1\nnoise\n2,b,2\nmore noise\n").unwrap();

        assert_eq!(summary.misreads, 2);
        assert_eq!(parser.misreads(), ["noise", "more noise"]);
    }

    #[test]
    fn test_empty_lines_are_ignored() {
        let mut parser = typed_people();
        let summary = parser.fill_str("1,a,1\n\n2,b,2\r\n").unwrap();

        assert_eq!(summary.rows_added, 2);
        assert_eq!(summary.misreads, 0);
    }

    #[test]
    fn test_conditional_routing() {
        let mut parser = typed_people();
        parser.add_conditional(
            ConditionalPattern::new("^#", r"^#\s*(?P<comment>.*)$", "comments", &[]).unwrap(),
        );
        parser
            .fill_str("# roster\n1,a,1\n# end of roster\n")
            .unwrap();

        assert_eq!(parser.tables().names(), vec![DEFAULT_TABLE_NAME, "comments"]);
        let comments = parser.tables().get("comments").unwrap();
        assert_eq!(comments.row_count(), 2);
        assert_eq!(
            comments.cell(1, "comment"),
            Some(&Value::Text("end of roster".to_string()))
        );
    }

    #[test]
    fn test_condition_without_content_match_is_a_misread() {
        let mut parser = typed_people();
        parser.add_conditional(
            ConditionalPattern::new("^ERR", r"^ERR (?P<code>\d+)$", "errors", &[]).unwrap(),
        );
        parser.add_conditional(
            ConditionalPattern::new("^E", r"^(?P<text>.*)$", "other", &[]).unwrap(),
        );
        parser.fill_str("ERR not-a-code\n").unwrap();

        assert_eq!(parser.tables().total_rows(), 0);
        assert_eq!(parser.misreads(), ["ERR not-a-code"]);
    }

    #[test]
    fn test_acceptance_rejection_is_silent() {
        let registry = vec![ColumnDefinition::new("id", ColumnType::Text)
            .with_acceptance("^[0-9]+$")
            .unwrap()];
        let mut parser =
            RegexParser::with_pattern(r"^(?P<id>[^,]*),(?P<name>.*)$", &registry).unwrap();
        let summary = parser.fill_str("12a,bad\n12,good\n").unwrap();

        assert_eq!(summary.rows_rejected, 1);
        assert_eq!(summary.misreads, 0);
        let table = parser.default_table().unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.cell(0, "name"), Some(&Value::Text("good".to_string())));
    }

    #[test]
    fn test_coercion_failure_skips_line_by_default() {
        let mut parser = typed_people();
        let summary = parser.fill_str("1,a,42\n2,b,4x\n3,c,7\n").unwrap();

        assert_eq!(summary.rows_added, 2);
        assert_eq!(summary.coercion_failures, 1);
        let failure = &parser.coercion_failures()[0];
        assert_eq!(failure.line_number, 2);
        assert_eq!(failure.error.value, "4x");
        assert!(parser.misreads().is_empty());
    }

    #[test]
    fn test_coercion_failure_can_abort() {
        let mut parser = typed_people();
        parser.set_coercion_policy(CoercionPolicy::Abort);
        let err = parser.fill_str("1,a,42\n2,b,4x\n3,c,7\n").unwrap_err();

        match err {
            Error::Coercion {
                line_number,
                source,
            } => {
                assert_eq!(line_number, 2);
                assert_eq!(source.column, "age");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_header_names_sniffed() {
        let mut parser = RegexParser::default();
        parser.set_header_mode(HeaderMode::Names);
        parser.fill_str("id,name,age\n1,ann,31\n").unwrap();

        assert_eq!(parser.options().separator.as_deref(), Some(","));
        assert_eq!(parser.header_state(), HeaderState::NamesAssigned);
        let table = parser.default_table().unwrap();
        let names: Vec<&str> = table.columns.iter().map(|c| c.display_name()).collect();
        assert_eq!(names, vec!["id", "name", "age"]);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.cell(0, "name"), Some(&Value::Text("ann".to_string())));
    }

    #[test]
    fn test_sniffed_names_keep_raw_labels() {
        let mut parser = RegexParser::default();
        parser.set_header_mode(HeaderMode::Names);
        parser.set_separator(";");
        parser.fill_str("Full Name;Zip Code\nAnn Lee;12345\n").unwrap();

        let table = parser.default_table().unwrap();
        assert_eq!(table.columns[0].name, "Full_Name");
        assert_eq!(table.columns[0].display_name(), "Full Name");
        assert_eq!(table.cell(0, "Zip_Code"), Some(&Value::Text("12345".to_string())));
    }

    #[test]
    fn test_header_labels_applied_after_stream() {
        let mut parser = RegexParser::default();
        parser
            .set_column_builder(ColumnBuilder::from_names(",", &["c1", "c2"]))
            .unwrap();
        parser.set_header_mode(HeaderMode::Names);

        let positions = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&positions);
        parser.add_progress_sink(move |event: ProgressEvent| {
            seen.borrow_mut().push((event.line_number, event.status));
        });

        parser.fill_str("Code,Description\nA1,first\n").unwrap();

        assert_eq!(parser.header_state(), HeaderState::NamesAssigned);
        let table = parser.default_table().unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.columns[0].name, "c1");
        assert_eq!(table.columns[0].display_name(), "Code");
        assert_eq!(table.columns[1].display_name(), "Description");
        assert!(positions
            .borrow()
            .contains(&(1, ProgressStatus::ReadingHeader)));
    }

    #[test]
    fn test_explicit_first_row_pattern_mismatch_is_fatal() {
        let mut parser = typed_people();
        parser.set_header_mode(HeaderMode::Names);
        parser
            .set_first_row_pattern(r"^(?P<id>\w+),(?P<name>\w+),(?P<age>\w+)$")
            .unwrap();

        let err = parser.fill_str("just one header\n1,a,1\n").unwrap_err();
        assert!(matches!(err, Error::HeaderMismatch { .. }));
    }

    #[test]
    fn test_positional_first_row_groups() {
        let mut parser = typed_people();
        parser.set_header_mode(HeaderMode::Names);
        parser.set_first_row_pattern(r"^(\w+),(\w+),(\w+)$").unwrap();
        parser.fill_str("Key,Who,Years\n1,a,1\n").unwrap();

        let labels: Vec<&str> = parser
            .default_table()
            .unwrap()
            .columns
            .iter()
            .map(|c| c.display_name())
            .collect();
        assert_eq!(labels, vec!["Key", "Who", "Years"]);
    }

    #[test]
    fn test_header_names_without_resolvable_pattern() {
        let mut parser = typed_people();
        parser.set_header_mode(HeaderMode::Names);

        let err = parser.fill_str("id,name,age\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_empty_pattern_set() {
        let mut parser = RegexParser::default();
        assert!(matches!(
            parser.fill_str("x\n").unwrap_err(),
            Error::EmptyPatternSet
        ));
    }

    #[test]
    fn test_progress_events() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut parser = typed_people();
        parser.add_progress_sink(move |event: ProgressEvent| sink.borrow_mut().push(event));

        parser.fill_str("1,a,1\nnoise\n").unwrap();

        let processed: Vec<usize> = events
            .borrow()
            .iter()
            .filter(|e| e.status == ProgressStatus::LineProcessed)
            .map(|e| e.line_number)
            .collect();
        assert_eq!(processed, vec![1, 2]);
        assert_eq!(events.borrow()[0].status, ProgressStatus::LoadingFirstLine);
    }

    #[test]
    fn test_unchanged_schema_appends_across_runs() {
        let mut parser = typed_people();
        parser.fill_str("1,a,1\n").unwrap();
        parser.set_primary_pattern(PEOPLE, &[ColumnDefinition::new("age", ColumnType::Integer)])
            .unwrap();
        parser.fill_str("2,b,2\n").unwrap();

        assert_eq!(parser.default_table().unwrap().row_count(), 2);
    }

    #[test]
    fn test_changed_pattern_rebuilds_tables() {
        let mut parser = typed_people();
        parser.fill_str("1,a,1\nnoise\n").unwrap();

        parser
            .set_primary_pattern(r"^(?P<word>\w+)$", &[])
            .unwrap();
        parser.fill_str("hello\n").unwrap();

        let table = parser.default_table().unwrap();
        assert_eq!(table.column_count(), 1);
        assert_eq!(table.row_count(), 1);
        assert!(parser.misreads().is_empty());
    }

    #[test]
    fn test_set_table_name_retargets_primary() {
        let mut parser = typed_people();
        parser.fill_str("1,a,1\n").unwrap();

        parser.set_table_name("people");
        assert_eq!(parser.primary().unwrap().table(), "people");
        parser.fill_str("2,b,2\n").unwrap();

        assert_eq!(parser.tables().names(), vec!["people"]);
        assert!(parser.tables().get(DEFAULT_TABLE_NAME).is_none());
        let table = parser.default_table().unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.columns[2].column_type, ColumnType::Integer);
    }

    #[test]
    fn test_schema_is_stable() {
        let mut parser = typed_people();
        parser.add_conditional(
            ConditionalPattern::new("^#", r"^#(?P<c>.*)$", "comments", &[]).unwrap(),
        );

        let first = serde_json::to_string(&parser.schema()).unwrap();
        let second = serde_json::to_string(&parser.schema()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fill_rewinds_stream() {
        let mut cursor = Cursor::new(b"1,a,1\n2,b,2\n".to_vec());
        cursor.seek(SeekFrom::End(0)).unwrap();

        let mut parser = typed_people();
        let summary = parser.fill(&mut cursor).unwrap();
        assert_eq!(summary.rows_added, 2);
    }

    #[test]
    fn test_fill_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.txt");
        std::fs::write(&path, "1,a,1\n2,b,2\n").unwrap();

        let mut parser = typed_people();
        parser.fill_path(&path).unwrap();
        assert_eq!(parser.default_table().unwrap().row_count(), 2);

        let missing = parser.fill_path(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(missing, Error::FileRead { .. }));
    }

    #[test]
    fn test_load_lines() {
        let mut parser = typed_people();
        let summary = parser.load_lines("1,a,1\n\nnope").unwrap();

        assert_eq!(summary.rows_added, 1);
        assert_eq!(parser.misreads(), ["nope"]);
    }
}

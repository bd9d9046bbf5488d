//! rxtab-core: regex-driven parsing of line-oriented text into typed tables
//!
//! This library provides functionality to:
//! - Describe lines with a primary regular expression whose named groups become columns
//! - Route other lines to further tables through conditional patterns
//! - Build patterns from column layouts or declarative JSON profiles
//! - Read column names from a header line, sniffing the separator when needed
//! - Convert captured text to integers, floats and timestamps, keeping unmatched lines as misreads

pub mod builder;
pub mod coerce;
pub mod error;
pub mod materialize;
pub mod parser;
pub mod pattern;
pub mod profile;
pub mod progress;
pub mod router;
pub mod scanner;
pub mod schema;
pub mod table;

pub use builder::{ColumnBuilder, ColumnLayout, ColumnSpec};
pub use error::{CoercionError, Error, Result};
pub use parser::{
    CoercionFailure, CoercionPolicy, FillSummary, HeaderMode, HeaderState, ParserOptions,
    RegexParser,
};
pub use pattern::{ConditionalPattern, GroupDescriptor, Pattern, PatternSpec};
pub use profile::ProfileNode;
pub use progress::{ProgressEvent, ProgressSink, ProgressStatus};
pub use router::{MatchOutcome, Router};
pub use scanner::{scan_inputs, ScanResult};
pub use schema::{derive_schema, schema_for};
pub use table::{Column, ColumnDefinition, ColumnType, Row, Table, TableSet, Value, DEFAULT_TABLE_NAME};

//! rxtab CLI
//!
//! Command-line tool for parsing line-oriented text into tables with regular expressions.

use clap::{Args, Parser, Subcommand};
use rxtab_core::{
    scan_inputs, ColumnDefinition, ColumnType, ConditionalPattern, Error, ProfileNode, RegexParser,
    Table, DEFAULT_TABLE_NAME,
};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rxtab")]
#[command(about = "Regex-driven line parser producing typed tables", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// How lines are matched, shared by every command that builds a parser
#[derive(Args)]
struct ParserArgs {
    /// Primary regular expression; named groups become columns
    #[arg(short, long)]
    pattern: Option<String>,

    /// Declared column type as name:type (text, integer, float, timestamp)
    #[arg(short = 't', long = "type")]
    types: Vec<String>,

    /// Conditional pattern as TABLE:CONDITION:CONTENT
    #[arg(short, long)]
    when: Vec<String>,

    /// First-line handling (none, skip or names)
    #[arg(long)]
    header: Option<String>,

    /// Field separator used for header names
    #[arg(short, long)]
    separator: Option<String>,

    /// Table receiving primary pattern matches
    #[arg(long)]
    table: Option<String>,

    /// Conversion failures: skip the line or abort the run
    #[arg(long)]
    coercion: Option<String>,

    /// Profile (JSON) describing the patterns
    #[arg(long)]
    profile: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and display the resulting tables
    Parse {
        #[command(flatten)]
        parser: ParserArgs,

        /// Input file
        #[arg(short, long)]
        file: PathBuf,

        /// Maximum number of rows to display per table
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print the table set as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the tables and columns the patterns produce, without reading input
    Schema {
        #[command(flatten)]
        parser: ParserArgs,
    },

    /// Parse every matching file under one or more roots
    Scan {
        #[command(flatten)]
        parser: ParserArgs,

        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Only files with this extension
        #[arg(short, long)]
        extension: Option<String>,
    },

    /// Create a profile template
    CreateProfile {
        /// Output path for the profile
        #[arg(short, long)]
        output: PathBuf,

        /// Field separator
        #[arg(short, long, default_value = ",")]
        separator: String,

        /// Columns as name or name:type
        #[arg(short, long)]
        column: Vec<String>,

        /// Table name
        #[arg(long)]
        table: Option<String>,

        /// The first line of the input holds column names
        #[arg(long)]
        has_header: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> rxtab_core::Result<()> {
    match command {
        Commands::Parse {
            parser,
            file,
            limit,
            json,
        } => cmd_parse(&parser, &file, limit, json),
        Commands::Schema { parser } => cmd_schema(&parser),
        Commands::Scan {
            parser,
            root,
            extension,
        } => cmd_scan(&parser, &root, extension.as_deref()),
        Commands::CreateProfile {
            output,
            separator,
            column,
            table,
            has_header,
        } => cmd_create_profile(&output, &separator, &column, table.as_deref(), has_header),
    }
}

/// Build a parser from a profile and/or command-line patterns; flags override the profile
fn build_parser(args: &ParserArgs) -> rxtab_core::Result<RegexParser> {
    let mut parser = match &args.profile {
        Some(path) => {
            debug!(profile = %path.display(), "loading profile");
            ProfileNode::load(path)?.build_parser()?
        }
        None => RegexParser::default(),
    };

    if let Some(table) = &args.table {
        parser.set_table_name(table.clone());
    }
    if let Some(header) = &args.header {
        parser.set_header_mode(header.parse()?);
    }
    if let Some(separator) = &args.separator {
        parser.set_separator(separator.clone());
    }
    if let Some(policy) = &args.coercion {
        parser.set_coercion_policy(policy.parse()?);
    }

    let registry = parse_types(&args.types)?;
    if let Some(pattern) = &args.pattern {
        parser.set_primary_pattern(pattern, &registry)?;
    }
    for when in &args.when {
        let (table, condition, content) = split_when(when)?;
        parser.add_conditional(ConditionalPattern::new(condition, content, table, &registry)?);
    }

    Ok(parser)
}

/// Parse `name:type` declarations
fn parse_types(declarations: &[String]) -> rxtab_core::Result<Vec<ColumnDefinition>> {
    declarations
        .iter()
        .map(|d| -> rxtab_core::Result<ColumnDefinition> {
            let (name, column_type) = d.split_once(':').ok_or_else(|| {
                Error::Configuration(format!("invalid type '{}', expected 'name:type'", d))
            })?;
            Ok(ColumnDefinition::new(name.trim(), column_type.parse()?))
        })
        .collect()
}

/// Split `TABLE:CONDITION:CONTENT`; the content may itself contain ':'
fn split_when(spec: &str) -> rxtab_core::Result<(&str, &str, &str)> {
    let mut parts = spec.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(table), Some(condition), Some(content)) if !table.is_empty() => {
            Ok((table, condition, content))
        }
        _ => Err(Error::Configuration(format!(
            "invalid conditional '{}', expected 'TABLE:CONDITION:CONTENT'",
            spec
        ))),
    }
}

fn cmd_parse(args: &ParserArgs, file: &Path, limit: Option<usize>, json: bool) -> rxtab_core::Result<()> {
    let mut parser = build_parser(args)?;
    let summary = parser.fill_path(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(parser.tables())?);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!("Tables: {}", parser.tables().len());

    for table in parser.tables() {
        println!();
        print_table(table, limit);
    }

    if !parser.misreads().is_empty() {
        println!();
        println!("Misreads ({}):", parser.misreads().len());
        for line in parser.misreads().iter().take(limit.unwrap_or(usize::MAX)) {
            println!("  {}", line);
        }
    }

    if !parser.coercion_failures().is_empty() {
        println!();
        println!("Skipped lines ({}):", parser.coercion_failures().len());
        for failure in parser.coercion_failures() {
            println!("  line {}: {}", failure.line_number, failure.error);
        }
    }

    println!();
    println!(
        "{} lines read, {} rows added, {} rejected, {} misreads",
        summary.lines_read, summary.rows_added, summary.rows_rejected, summary.misreads
    );

    Ok(())
}

fn print_table(table: &Table, limit: Option<usize>) {
    println!("Table: {} ({} rows)", table.name, table.row_count());

    let header: Vec<&str> = table.columns.iter().map(|c| c.display_name()).collect();
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    let row_limit = limit.unwrap_or(table.row_count());
    for row in table.rows.iter().take(row_limit) {
        let values: Vec<String> = row.cells.iter().map(|c| c.to_string_value()).collect();
        println!("{}", values.join("\t"));
    }

    if table.row_count() > row_limit {
        println!("... ({} more rows)", table.row_count() - row_limit);
    }
}

fn cmd_schema(args: &ParserArgs) -> rxtab_core::Result<()> {
    let parser = build_parser(args)?;
    let schema = parser.schema();

    if schema.is_empty() {
        println!("No patterns defined.");
        return Ok(());
    }

    for table in &schema {
        println!("Table: {}", table.name);
        for column in &table.columns {
            let mut line = format!("  {} ({})", column.name, column.column_type);
            if let Some(label) = &column.label {
                line.push_str(&format!(" label=\"{}\"", label));
            }
            if let Some(acceptance) = &column.acceptance {
                line.push_str(&format!(" accept={}", acceptance));
            }
            println!("{}", line);
        }
    }

    Ok(())
}

fn cmd_scan(args: &ParserArgs, roots: &[PathBuf], extension: Option<&str>) -> rxtab_core::Result<()> {
    let result = scan_inputs(roots, extension)?;

    println!("Scanned {} root(s):", result.roots.len());
    for root in &result.roots {
        println!("  {}", root.display());
    }
    println!();
    println!("Found {} files", result.total_files());
    println!();

    let mut total_rows = 0;
    let mut errors = Vec::new();

    for path in &result.files {
        let outcome = build_parser(args).and_then(|mut parser| parser.fill_path(path));
        match outcome {
            Ok(summary) => {
                total_rows += summary.rows_added;
                println!(
                    "  {}: {} rows, {} misreads",
                    path.display(),
                    summary.rows_added,
                    summary.misreads
                );
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "file failed");
                errors.push((path.clone(), e.to_string()));
            }
        }
    }

    println!();
    println!("Scan complete: {} rows from {} files", total_rows, result.total_files() - errors.len());

    if !errors.is_empty() {
        println!("\nErrors ({}):", errors.len());
        for (path, err) in &errors {
            println!("  {}: {}", path.display(), err);
        }
    }

    Ok(())
}

fn cmd_create_profile(
    output: &Path,
    separator: &str,
    columns: &[String],
    table: Option<&str>,
    has_header: bool,
) -> rxtab_core::Result<()> {
    let mut profile = ProfileNode::new("profile")
        .with_attribute("separator", separator)
        .with_attribute("tablename", table.unwrap_or(DEFAULT_TABLE_NAME))
        .with_attribute("hasheader", has_header.to_string());

    for column in columns {
        let (name, column_type) = match column.split_once(':') {
            Some((name, column_type)) => (name, Some(column_type.parse::<ColumnType>()?)),
            None => (column.as_str(), None),
        };
        let mut node = ProfileNode::new(name);
        if let Some(column_type) = column_type {
            node = node.with_attribute("type", column_type.to_string());
        }
        profile = profile.with_child(node);
    }

    // Placeholder so the template shows the column layout
    if profile.children.is_empty() {
        profile = profile.with_child(ProfileNode::new("Column1"));
    }

    profile.save(output)?;
    println!("Created profile: {}", output.display());
    println!("Columns: {}", profile.children.len());
    println!();
    println!("Edit the file to adjust columns and conditions, then run:");
    println!("  rxtab parse --profile {} --file <input>", output.display());

    Ok(())
}

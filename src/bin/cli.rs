//! mdbsql - interactive shell

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mdbsql::catalog::ObjectKinds;
use mdbsql::executor::ResultSet;
use mdbsql::{ConnectOptions, Connection, Feature};

const PROMPT: &str = "mdbsql> ";
const CONTINUATION_PROMPT: &str = "   ...> ";

/// mdbsql interactive shell
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "mdbsql",
    version,
    about = "Query an Access database file with SQL"
)]
struct ShellConfig {
    /// Database path or `mdb://` URL
    database: String,

    /// Execute a single SQL statement and exit
    #[arg(short = 'e', long, value_name = "SQL")]
    execute: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help              Show this help message
  .quit, .exit       Leave the shell
  .tables            List user tables
  .system            List system tables
  .views             List saved queries
  .schema [table]    Show table columns
  .features          Show driver features

Queries:
  SELECT [TOP n] columns FROM table [WHERE condition] [LIMIT n];

Examples:
  SELECT * FROM [Order Details];
  SELECT Title, Published FROM Books WHERE Published >= #2015-01-01#;
"#
    );
}

/// Format query results as a table
fn format_results(result: &ResultSet) -> String {
    let columns: Vec<&str> = result.columns().iter().map(|c| c.name.as_str()).collect();
    let rows: Vec<Vec<String>> = result
        .rows()
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    let mut output = String::new();
    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c, width = *w))
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    for row in &rows {
        let line: String = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:<width$} ", v, width = *w))
            .collect::<Vec<_>>()
            .join("|");
        output.push_str(&format!("|{}|\n", line));
    }
    if !rows.is_empty() {
        output.push_str(&separator);
    }

    output.push_str(&format!("{} row(s) returned\n", rows.len()));
    for warning in result.warnings() {
        output.push_str(&format!("warning: {}\n", warning));
    }
    output
}

fn print_names(title: &str, names: Vec<String>) {
    if names.is_empty() {
        println!("No {} found.", title);
        return;
    }
    for name in names {
        println!("  {}", name);
    }
}

fn print_schema(conn: &Connection, table: &str) {
    match conn.open_table(table) {
        Ok(definition) => {
            println!("{}", definition.name());
            for column in definition.columns() {
                let mut flags = Vec::new();
                if column.is_auto_increment {
                    flags.push("auto");
                }
                if column.is_short_date() {
                    flags.push("short date");
                }
                println!(
                    "  {:<24} {:<9} {:>5}  {}",
                    column.name,
                    column.column_type.to_string(),
                    column.byte_size,
                    flags.join(", ")
                );
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}

/// Handle special dot commands. Returns false when the shell should exit.
fn handle_special_command(cmd: &str, conn: &Connection) -> bool {
    let parts: Vec<&str> = cmd.split_whitespace().collect();

    match parts.first().copied() {
        Some(".help") => print_help(),
        Some(".quit") | Some(".exit") => return false,
        Some(".tables") => print_names("tables", conn.tables(ObjectKinds::TABLES)),
        Some(".system") => print_names("system tables", conn.tables(ObjectKinds::SYSTEM_TABLES)),
        Some(".views") => print_names("views", conn.tables(ObjectKinds::VIEWS)),
        Some(".schema") => {
            let rest = cmd[".schema".len()..].trim();
            if rest.is_empty() {
                for table in conn.tables(ObjectKinds::TABLES) {
                    print_schema(conn, &table);
                }
            } else {
                print_schema(conn, rest);
            }
        }
        Some(".features") => {
            for feature in Feature::ALL {
                println!("  {:<24} {}", format!("{:?}", feature), conn.has_feature(feature));
            }
        }
        Some(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            eprintln!("Type '.help' for available commands.");
        }
        None => {}
    }
    true
}

/// Run one statement and print its result
fn execute_sql(conn: &mut Connection, sql: &str, json: bool) -> Result<()> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Ok(());
    }

    let result = conn.materialize(sql)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", format_results(&result));
    }
    Ok(())
}

/// Main REPL loop
fn run_repl(conn: &mut Connection, json: bool) -> Result<()> {
    let mut editor = DefaultEditor::new().context("cannot start line editor")?;
    println!("Connected. Type '.help' for help, '.quit' to exit.");

    let mut input_buffer = String::new();
    loop {
        let prompt = if input_buffer.is_empty() { PROMPT } else { CONTINUATION_PROMPT };
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                input_buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let trimmed = line.trim();
        if !trimmed.is_empty() {
            if let Err(e) = editor.add_history_entry(trimmed) {
                debug!("Cannot record history: {}", e);
            }
        }

        if input_buffer.is_empty() && trimmed.starts_with('.') {
            if !handle_special_command(trimmed, conn) {
                break;
            }
            continue;
        }

        // Empty line ends a multi-line statement
        if trimmed.is_empty() {
            if !input_buffer.is_empty() {
                let sql = std::mem::take(&mut input_buffer);
                if let Err(e) = execute_sql(conn, &sql, json) {
                    eprintln!("Error: {}", e);
                }
            }
            continue;
        }

        input_buffer.push_str(&line);
        input_buffer.push('\n');
        if trimmed.ends_with(';') {
            let sql = std::mem::take(&mut input_buffer);
            if let Err(e) = execute_sql(conn, &sql, json) {
                eprintln!("Error: {}", e);
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let config = ShellConfig::parse();
    init_logging();

    let options = ConnectOptions::parse(&config.database)?;
    let mut conn: Connection = Connection::new();
    conn.open(&options)
        .with_context(|| format!("cannot open {}", options.path().display()))?;

    let outcome = match &config.execute {
        Some(sql) => execute_sql(&mut conn, sql, config.json),
        None => run_repl(&mut conn, config.json),
    };
    conn.close()?;
    outcome
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

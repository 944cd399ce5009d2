//! Query result materializer
//!
//! Runs a query on the engine and decodes the whole result into an owned
//! [`ResultSet`] in one pass. The engine cannot scroll or re-enter a
//! query, so every later access is served from this copy.

use serde::Serialize;
use tracing::{debug, warn};

use super::decoder::{decode, decode_text, DecodeWarning};
use super::value::Value;
use crate::catalog::{ColumnDefinition, ColumnType, TableDefinition, ValueKind};
use crate::engine::Engine;
use crate::error::{Error, Result};

/// First number used for unnamed expression columns
const UNNAMED_COLUMN_BASE: usize = 1000;

/// Metadata of one result column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultColumn {
    /// Display name
    pub name: String,
    /// Table the query reads
    pub table_name: String,
    /// Access column type; `Text` for unmatched columns
    pub column_type: ColumnType,
    /// Declared length
    pub length: u32,
    pub precision: u32,
    pub read_only: bool,
    pub auto_value: bool,
    /// Index of the matching table column, if any
    #[serde(skip)]
    source: Option<usize>,
    #[serde(skip)]
    definition: Option<ColumnDefinition>,
}

impl ResultColumn {
    /// A column resolved against the table definition
    pub fn from_definition(definition: &ColumnDefinition, source: usize) -> Self {
        Self {
            name: definition.name.clone(),
            table_name: definition.table_name.clone(),
            column_type: definition.column_type,
            length: definition.byte_size,
            precision: definition.precision,
            read_only: definition.is_fixed_width,
            auto_value: definition.is_auto_increment,
            source: Some(source),
            definition: Some(definition.clone()),
        }
    }

    /// A computed or aliased column with no table counterpart
    pub fn unmatched(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            column_type: ColumnType::Text,
            length: 0,
            precision: 0,
            read_only: true,
            auto_value: false,
            source: None,
            definition: None,
        }
    }

    /// The resolved table column definition
    pub fn definition(&self) -> Option<&ColumnDefinition> {
        self.definition.as_ref()
    }

    /// Whether the column matched a table column
    pub fn is_resolved(&self) -> bool {
        self.source.is_some()
    }

    /// Client-facing value kind
    pub fn value_kind(&self) -> ValueKind {
        self.column_type.value_kind()
    }
}

/// An owned, fully decoded query result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    columns: Vec<ResultColumn>,
    rows: Vec<Vec<Value>>,
    #[serde(skip)]
    warnings: Vec<DecodeWarning>,
}

impl ResultSet {
    pub fn columns(&self) -> &[ResultColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Get number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of a column by name, ignoring ASCII case
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Cells that failed to decode
    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }
}

/// Run `sql` and materialize the complete result.
///
/// On an engine error the engine is reset before the error is returned. On
/// success the engine is reset after the last row, so it is ready for the
/// next query either way.
pub fn execute<E: Engine>(engine: &mut E, sql: &str) -> Result<ResultSet> {
    if let Err(err) = engine.run_query(sql) {
        engine.reset();
        debug!("Query failed: {}", err);
        return Err(Error::statement("Cannot run query", err.message));
    }

    let columns = resolve_columns(engine.query_columns(), engine.query_sources(), engine.query_table());
    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    while engine.fetch_next_row() {
        let row_index = rows.len();
        let mut row = Vec::with_capacity(columns.len());
        for (output, column) in columns.iter().enumerate() {
            match decode_output(&*engine, column, output) {
                Ok(value) => row.push(value),
                Err(err) => {
                    warn!("Cannot decode row {} column {}: {}", row_index, column.name, err);
                    warnings.push(DecodeWarning {
                        row: row_index,
                        column: column.name.clone(),
                        message: err.to_string(),
                    });
                    row.push(Value::Null);
                }
            }
        }
        rows.push(row);
    }
    engine.reset();

    debug!("Materialized {} rows x {} columns", rows.len(), columns.len());
    Ok(ResultSet {
        columns,
        rows,
        warnings,
    })
}

/// Match each output column to a table column, once per query.
///
/// An output is resolved only when its name matches the table column it
/// reads; an alias naming some other column stays unmatched.
fn resolve_columns(
    names: &[String],
    sources: &[Option<usize>],
    table: Option<&TableDefinition>,
) -> Vec<ResultColumn> {
    let table_name = table.map(TableDefinition::name).unwrap_or_default();
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let matched = table.and_then(|t| {
                let index = t.column_index(name)?;
                if sources.get(i).copied().flatten() != Some(index) {
                    return None;
                }
                Some((index, t.column_at(index)?))
            });
            match matched {
                Some((index, definition)) => ResultColumn::from_definition(definition, index),
                None if name.is_empty() => {
                    ResultColumn::unmatched(format!("Expr{}", UNNAMED_COLUMN_BASE + i), table_name)
                }
                None => ResultColumn::unmatched(name.clone(), table_name),
            }
        })
        .collect()
}

fn decode_output<E: Engine>(engine: &E, column: &ResultColumn, output: usize) -> Result<Value> {
    let bound = engine.bound_value(output);
    match (column.source, column.definition()) {
        (Some(source), Some(definition)) => {
            let cell = engine
                .cell(source)
                .ok_or_else(|| Error::Decode(format!("engine has no cell for column {}", source)))?;
            decode(engine, definition, &cell, bound)
        }
        _ => decode_text(bound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SHORT_DATE_FORMAT;
    use crate::engine::memory::MemoryDatabase;
    use crate::engine::MemoryEngine;
    use chrono::NaiveDate;
    use serde_json::json;

    fn engine() -> MemoryEngine {
        let db = MemoryDatabase::builder()
            .table(
                "Books",
                vec![
                    ColumnDefinition::new("Id", ColumnType::Int32).auto_increment(true),
                    ColumnDefinition::new("Title", ColumnType::Text).size(100),
                    ColumnDefinition::new("Published", ColumnType::DateTime).format(SHORT_DATE_FORMAT),
                    ColumnDefinition::new("InPrint", ColumnType::Bool),
                ],
                vec![
                    vec![json!(1), json!("Go"), json!("2015-01-01"), json!(true)],
                    vec![json!(2), json!("Rust"), json!(null), json!(false)],
                ],
            )
            .build();
        let mut engine = MemoryEngine::from_database(db);
        assert!(engine.read_catalog());
        engine
    }

    #[test]
    fn test_materialize_books() {
        let mut engine = engine();
        let result = execute(&mut engine, "select * from Books").unwrap();

        assert_eq!(result.row_count(), 2);
        assert_eq!(result.column_count(), 4);
        let day = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        assert_eq!(
            result.rows()[0],
            vec![Value::Int64(1), Value::Text("Go".into()), Value::Date(day), Value::Bool(true)]
        );
        assert_eq!(result.rows()[1][2], Value::Null);
        assert_eq!(result.rows()[1][3], Value::Bool(false));
        assert!(result.warnings().is_empty());

        let id = &result.columns()[0];
        assert_eq!(id.table_name, "Books");
        assert!(id.auto_value);
        assert!(id.read_only);
        assert_eq!(id.value_kind(), ValueKind::LongLong);
        assert_eq!(result.columns()[1].length, 100);
    }

    #[test]
    fn test_columns_matched_ignoring_case() {
        let mut engine = engine();
        let result = execute(&mut engine, "SELECT TITLE, id FROM books").unwrap();
        assert_eq!(result.columns()[0].name, "Title");
        assert!(result.columns()[0].is_resolved());
        assert_eq!(result.rows()[1], vec![Value::Text("Rust".into()), Value::Int64(2)]);
    }

    #[test]
    fn test_unmatched_columns_fall_back_to_text() {
        let mut engine = engine();
        let result = execute(&mut engine, "SELECT Id AS Key, 7 FROM Books").unwrap();

        let key = &result.columns()[0];
        assert_eq!(key.name, "Key");
        assert!(!key.is_resolved());
        assert_eq!(key.column_type, ColumnType::Text);
        assert_eq!(key.table_name, "Books");
        assert!(key.read_only);
        assert_eq!(result.columns()[1].name, "Expr1001");
        assert_eq!(result.rows()[0], vec![Value::Text("1".into()), Value::Text("7".into())]);
        assert_eq!(result.column_index("expr1001"), Some(1));
    }

    #[test]
    fn test_alias_naming_another_column() {
        let mut engine = engine();
        let result = execute(&mut engine, "SELECT Title AS Id, Id AS Title FROM Books").unwrap();

        let id = &result.columns()[0];
        assert_eq!(id.name, "Id");
        assert!(!id.is_resolved());
        assert_eq!(id.column_type, ColumnType::Text);
        assert!(!result.columns()[1].is_resolved());
        assert_eq!(result.rows()[0], vec![Value::Text("Go".into()), Value::Text("1".into())]);
        assert_eq!(result.rows()[1], vec![Value::Text("Rust".into()), Value::Text("2".into())]);

        // an alias repeating the column's own name still resolves
        let result = execute(&mut engine, "SELECT Id AS ID FROM Books").unwrap();
        assert!(result.columns()[0].is_resolved());
        assert_eq!(result.rows()[0], vec![Value::Int64(1)]);
    }

    #[test]
    fn test_undecodable_cell_becomes_null() {
        let db = MemoryDatabase::builder()
            .table(
                "Readings",
                vec![
                    ColumnDefinition::new("Id", ColumnType::Int32),
                    ColumnDefinition::new("Taken", ColumnType::DateTime),
                    ColumnDefinition::new("Label", ColumnType::Text),
                ],
                vec![
                    vec![json!(1), json!(1.0e12), json!("bad")],
                    vec![json!(2), json!("2015-01-01"), json!("ok")],
                ],
            )
            .build();
        let mut engine = MemoryEngine::from_database(db);
        assert!(engine.read_catalog());

        let result = execute(&mut engine, "SELECT * FROM Readings").unwrap();
        assert_eq!(result.row_count(), 2);
        assert_eq!(
            result.rows()[0],
            vec![Value::Int64(1), Value::Null, Value::Text("bad".into())]
        );
        let day = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        assert_eq!(result.rows()[1][1], Value::DateTime(day.and_hms_opt(0, 0, 0).unwrap()));

        assert_eq!(result.warnings().len(), 1);
        let warning = &result.warnings()[0];
        assert_eq!(warning.row, 0);
        assert_eq!(warning.column, "Taken");
        assert!(warning.message.contains("out of range"));
    }

    #[test]
    fn test_engine_error() {
        let mut engine = engine();
        let err = execute(&mut engine, "SELECT * FROM Nope").unwrap_err();
        assert_eq!(err.code(), Some(crate::error::STATEMENT_ERROR_CODE));
        assert_eq!(err.engine_message(), Some("Couldn't find table Nope"));
        assert_eq!(err.to_string(), "Cannot run query: Couldn't find table Nope");

        // engine is usable again
        assert_eq!(execute(&mut engine, "SELECT Id FROM Books").unwrap().row_count(), 2);
    }

    #[test]
    fn test_engine_reset_after_materializing() {
        let mut engine = engine();
        execute(&mut engine, "SELECT * FROM Books").unwrap();
        assert!(engine.query_table().is_none());
        assert!(!engine.fetch_next_row());
    }

    #[test]
    fn test_idempotent() {
        let mut engine = engine();
        let first = execute(&mut engine, "SELECT * FROM Books").unwrap();
        let second = execute(&mut engine, "SELECT * FROM Books").unwrap();
        assert_eq!(first, second);
    }
}

//! Memory engine
//!
//! A page-buffered engine over JSON database files. Opening a file encodes
//! every table into slotted pages; queries scan those pages and copy each
//! matching row into one shared row buffer, overwriting the previous row.

pub mod database;
pub mod eval;
pub mod page;
pub mod row;
pub mod storage;

use std::path::Path;

use tracing::{debug, warn};

use self::eval::{literal_scalar, referenced_columns, test};
use self::page::PageStore;
use self::row::{read_directory, read_long_value, read_scalar, render_cell, CellSlot};
use self::storage::Storage;
use super::{Engine, EngineError, EngineResult, OleBuffer, RawCell, ResourceTracker, TableHandle};
use crate::catalog::{CatalogEntry, ColumnDefinition, TableDefinition};
use crate::error::{Error, Result};
use crate::sql::{self, Expr, SelectItem};

pub use database::{DatabaseObject, MemoryDatabase, MemoryDatabaseBuilder, ObjectTypeSpec};

/// Where an output column gets its value
#[derive(Debug, Clone)]
enum Output {
    /// Table column at this index
    Column(usize),
    /// Constant text
    Literal(String),
}

#[derive(Debug)]
struct RunningQuery {
    table: usize,
    columns: Vec<String>,
    outputs: Vec<Output>,
    sources: Vec<Option<usize>>,
    filter: Option<Expr>,
    limit: Option<u64>,
    next_row: usize,
    returned: u64,
}

/// Engine over a [`MemoryDatabase`]
#[derive(Debug, Default)]
pub struct MemoryEngine {
    database: Option<MemoryDatabase>,
    storage: Option<Storage>,
    tracker: ResourceTracker,
    query: Option<RunningQuery>,
    row_buffer: Vec<u8>,
    cells: Vec<CellSlot>,
    bound: Vec<String>,
}

impl MemoryEngine {
    /// Wrap a database built in code; the catalog is read on demand
    pub fn from_database(database: MemoryDatabase) -> Self {
        Self {
            database: Some(database),
            ..Self::default()
        }
    }

    /// Lease accounting for table handles and OLE buffers
    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    fn clear_row(&mut self) {
        self.row_buffer.clear();
        self.cells.clear();
        self.bound.clear();
    }

    fn prepare(&self, sql_text: &str) -> EngineResult<RunningQuery> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| EngineError::new("You must connect to a database first"))?;
        let statement = sql::parse(sql_text)?;

        let table = storage
            .find_table(&statement.table)
            .ok_or_else(|| EngineError::new(format!("Couldn't find table {}", statement.table)))?;
        let definition = &storage
            .table(table)
            .ok_or_else(|| EngineError::new(format!("Couldn't find table {}", statement.table)))?
            .definition;

        let column_index = |name: &str| {
            definition
                .column_index(name)
                .ok_or_else(|| EngineError::new(format!("Column {} not found", name)))
        };

        let mut columns = Vec::new();
        let mut outputs = Vec::new();
        for item in &statement.columns {
            match item {
                SelectItem::Wildcard => {
                    for (i, column) in definition.columns().enumerate() {
                        columns.push(column.name.clone());
                        outputs.push(Output::Column(i));
                    }
                }
                SelectItem::Column { name, .. } => {
                    outputs.push(Output::Column(column_index(name)?));
                    columns.push(item.output_name());
                }
                SelectItem::Literal { value, .. } => {
                    // reject malformed date literals up front
                    literal_scalar(value)?;
                    outputs.push(Output::Literal(value.to_string()));
                    columns.push(item.output_name());
                }
            }
        }

        if let Some(filter) = &statement.where_clause {
            for name in referenced_columns(filter) {
                column_index(name)?;
            }
        }

        let sources = outputs
            .iter()
            .map(|output| match output {
                Output::Column(index) => Some(*index),
                Output::Literal(_) => None,
            })
            .collect();

        Ok(RunningQuery {
            table,
            columns,
            outputs,
            sources,
            limit: statement.row_limit(),
            filter: statement.where_clause,
            next_row: 0,
            returned: 0,
        })
    }
}

/// Check a stored row against the query and render its bound values.
/// `None` when the filter rejects the row.
fn prepare_row(
    store: &PageStore,
    table: &TableDefinition,
    query: &RunningQuery,
    record: &[u8],
) -> Result<Option<(Vec<CellSlot>, Vec<String>)>> {
    let slots = read_directory(record)?;
    if slots.len() != table.column_count() {
        return Err(Error::Decode(format!(
            "row has {} columns, table {} has {}",
            slots.len(),
            table.name(),
            table.column_count()
        )));
    }
    let cell = |index: usize| {
        let slot = slots[index];
        RawCell::new(record, slot.offset, slot.length, slot.is_null)
    };

    if let Some(filter) = &query.filter {
        let lookup = |name: &str| {
            let index = table
                .column_index(name)
                .ok_or_else(|| Error::ColumnNotFound(name.to_string(), table.name().to_string()))?;
            let column = table
                .column_at(index)
                .ok_or_else(|| Error::ColumnNotFound(name.to_string(), table.name().to_string()))?;
            read_scalar(store, column, &cell(index))
        };
        if test(filter, &lookup)? != Some(true) {
            return Ok(None);
        }
    }

    let bound = query
        .outputs
        .iter()
        .map(|output| match output {
            Output::Literal(text) => text.clone(),
            Output::Column(index) => {
                let Some(column) = table.column_at(*index) else {
                    return String::new();
                };
                render_cell(store, column, &cell(*index)).unwrap_or_else(|err| {
                    warn!("Cannot bind {}.{}: {}", table.name(), column.name, err);
                    String::new()
                })
            }
        })
        .collect();

    Ok(Some((slots, bound)))
}

impl Engine for MemoryEngine {
    fn open(path: &Path) -> EngineResult<Self> {
        let database = MemoryDatabase::load(path)
            .map_err(|err| EngineError::new(format!("Couldn't open file {}: {}", path.display(), err)))?;
        debug!("Opened {}", path.display());
        Ok(Self::from_database(database))
    }

    fn read_catalog(&mut self) -> bool {
        if self.storage.is_some() {
            return true;
        }
        let Some(objects) = self.database.as_ref().and_then(|db| db.objects.as_deref()) else {
            return false;
        };
        match Storage::build(objects) {
            Ok(storage) => {
                debug!("Read catalog with {} objects", storage.catalog().len());
                self.storage = Some(storage);
                true
            }
            Err(err) => {
                warn!("Unreadable catalog: {}", err);
                false
            }
        }
    }

    fn catalog(&self) -> Option<&[CatalogEntry]> {
        self.storage.as_ref().map(Storage::catalog)
    }

    fn read_table(&self, name: &str) -> Option<TableHandle> {
        let storage = self.storage.as_ref()?;
        let table = storage.table(storage.find_table(name)?)?;
        Some(TableHandle::new(table.definition.clone(), self.tracker.acquire()))
    }

    fn run_query(&mut self, sql_text: &str) -> EngineResult<()> {
        self.reset();
        let query = self.prepare(sql_text)?;
        debug!("Running query on table #{}: {}", query.table, sql_text);
        self.query = Some(query);
        Ok(())
    }

    fn query_columns(&self) -> &[String] {
        self.query.as_ref().map(|q| q.columns.as_slice()).unwrap_or(&[])
    }

    fn query_sources(&self) -> &[Option<usize>] {
        self.query.as_ref().map(|q| q.sources.as_slice()).unwrap_or(&[])
    }

    fn query_table(&self) -> Option<&TableDefinition> {
        let query = self.query.as_ref()?;
        Some(&self.storage.as_ref()?.table(query.table)?.definition)
    }

    fn fetch_next_row(&mut self) -> bool {
        let (Some(storage), Some(query)) = (self.storage.as_ref(), self.query.as_mut()) else {
            return false;
        };
        let Some(table) = storage.table(query.table) else {
            return false;
        };

        loop {
            let exhausted = query.limit.is_some_and(|limit| query.returned >= limit);
            let pointer = match table.rows.get(query.next_row) {
                Some(pointer) if !exhausted => *pointer,
                _ => break,
            };
            query.next_row += 1;

            let Some(record) = storage.store().record(pointer) else {
                warn!("Row {} of {} is missing", query.next_row - 1, table.definition.name());
                continue;
            };
            match prepare_row(storage.store(), &table.definition, query, record) {
                Ok(Some((cells, bound))) => {
                    self.row_buffer.clear();
                    self.row_buffer.extend_from_slice(record);
                    self.cells = cells;
                    self.bound = bound;
                    query.returned += 1;
                    return true;
                }
                Ok(None) => continue,
                Err(err) => {
                    warn!("Skipping row {} of {}: {}", query.next_row - 1, table.definition.name(), err);
                    continue;
                }
            }
        }

        self.clear_row();
        false
    }

    fn cell(&self, column: usize) -> Option<RawCell<'_>> {
        let slot = self.cells.get(column)?;
        Some(RawCell::new(&self.row_buffer, slot.offset, slot.length, slot.is_null))
    }

    fn bound_value(&self, output: usize) -> Option<&str> {
        self.bound.get(output).map(String::as_str)
    }

    fn read_ole(&self, column: &ColumnDefinition, cell: &RawCell<'_>) -> EngineResult<OleBuffer> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| EngineError::new("You must connect to a database first"))?;
        let header = cell
            .bytes()
            .ok_or_else(|| EngineError::new(format!("Column {}: OLE header out of range", column.name)))?;
        let data = read_long_value(storage.store(), header)?;
        Ok(OleBuffer::new(data, self.tracker.acquire()))
    }

    fn reset(&mut self) {
        self.query = None;
        self.clear_row();
    }

    fn close(&mut self) -> EngineResult<()> {
        self.reset();
        self.storage = None;
        self.database = None;
        debug!("Closed database");
        Ok(())
    }
}

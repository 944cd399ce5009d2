//! Engine module
//!
//! The driver sits on top of a lower-level parsing engine that understands the
//! on-disk layout of the database file. This module defines the contract the
//! driver consumes:
//! - `Engine`: catalog, table definitions, query execution and row fetching
//! - `RawCell`: a borrowed view of one column inside the shared row buffer
//! - `TableHandle` / `OleBuffer`: engine allocations released on drop
//!
//! `memory` provides a page-buffered engine backed by JSON database files.

pub mod lease;
pub mod memory;

use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;

use crate::catalog::{CatalogEntry, ColumnDefinition, TableDefinition};

pub use lease::{Lease, ResourceTracker};
pub use memory::{MemoryDatabase, MemoryEngine};

/// Seconds in one day
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Largest day offset a date/time column can hold (9999-12-31)
const MAX_DAY_OFFSET: f64 = 2_958_465.0;

/// Smallest day offset a date/time column can hold (0100-01-01)
const MIN_DAY_OFFSET: f64 = -657_434.0;

/// An error reported by the engine, carried verbatim
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    /// Engine message
    pub message: String,
}

impl EngineError {
    /// Create a new engine error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<crate::error::Error> for EngineError {
    fn from(err: crate::error::Error) -> Self {
        EngineError::new(err.to_string())
    }
}

/// Result type alias for engine calls
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// The lower-level parsing engine consumed by the driver.
///
/// One engine instance owns one open file and at most one running query.
/// Row data is exposed through a single buffer that `fetch_next_row`
/// overwrites in place; `cell` and `bound_value` borrow that buffer, so the
/// borrow checker rejects any attempt to hold them across a fetch.
pub trait Engine {
    /// Open a database file
    fn open(path: &Path) -> EngineResult<Self>
    where
        Self: Sized;

    /// Read the system catalog; `false` when the file is not a database
    fn read_catalog(&mut self) -> bool;

    /// Catalog entries in on-disk order, `None` until the catalog is read
    fn catalog(&self) -> Option<&[CatalogEntry]>;

    /// Look up a table by name and read its column definitions
    fn read_table(&self, name: &str) -> Option<TableHandle>;

    /// Run a query; on error the engine must be reset before reuse
    fn run_query(&mut self, sql: &str) -> EngineResult<()>;

    /// Names of the output columns of the running query
    fn query_columns(&self) -> &[String];

    /// Table column each output column reads, `None` for computed outputs
    fn query_sources(&self) -> &[Option<usize>];

    /// Definition of the table the running query reads
    fn query_table(&self) -> Option<&TableDefinition>;

    /// Advance to the next row of the running query
    fn fetch_next_row(&mut self) -> bool;

    /// Raw cell of a column of the query table, in table column order
    fn cell(&self, column: usize) -> Option<RawCell<'_>>;

    /// Text the engine bound for an output column of the current row
    fn bound_value(&self, output: usize) -> Option<&str>;

    /// Stream a full out-of-row OLE value into a scratch buffer
    fn read_ole(&self, column: &ColumnDefinition, cell: &RawCell<'_>) -> EngineResult<OleBuffer>;

    /// Convert a stored day count to a calendar date and time
    fn date_from_days(&self, days: f64) -> Option<NaiveDateTime> {
        days_to_datetime(days)
    }

    /// Drop the running query; calling it twice is harmless
    fn reset(&mut self);

    /// Close the file
    fn close(&mut self) -> EngineResult<()>;
}

/// A borrowed view of one column value inside the shared row buffer
#[derive(Debug, Clone, Copy)]
pub struct RawCell<'a> {
    buffer: &'a [u8],
    offset: usize,
    length: usize,
    is_null: bool,
}

impl<'a> RawCell<'a> {
    /// Create a cell over `buffer[offset..offset + length]`
    pub fn new(buffer: &'a [u8], offset: usize, length: usize, is_null: bool) -> Self {
        Self {
            buffer,
            offset,
            length,
            is_null,
        }
    }

    /// Byte offset of the cell within the buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Stored length in bytes
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the stored length is zero
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whether the engine marked the cell null
    pub fn is_null(&self) -> bool {
        self.is_null
    }

    /// The cell's bytes, `None` if the cell points outside the buffer
    pub fn bytes(&self) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(self.length)?;
        self.buffer.get(self.offset..end)
    }

    fn slice(&self, at: usize, width: usize) -> Option<&'a [u8]> {
        let end = at.checked_add(width)?;
        if end > self.length {
            return None;
        }
        self.bytes()?.get(at..end)
    }

    pub fn get_u8(&self, at: usize) -> Option<u8> {
        self.slice(at, 1).map(|b| b[0])
    }

    pub fn get_i16(&self, at: usize) -> Option<i16> {
        self.slice(at, 2).map(LittleEndian::read_i16)
    }

    pub fn get_u16(&self, at: usize) -> Option<u16> {
        self.slice(at, 2).map(LittleEndian::read_u16)
    }

    pub fn get_i32(&self, at: usize) -> Option<i32> {
        self.slice(at, 4).map(LittleEndian::read_i32)
    }

    pub fn get_u32(&self, at: usize) -> Option<u32> {
        self.slice(at, 4).map(LittleEndian::read_u32)
    }

    pub fn get_i64(&self, at: usize) -> Option<i64> {
        self.slice(at, 8).map(LittleEndian::read_i64)
    }

    pub fn get_f32(&self, at: usize) -> Option<f32> {
        self.slice(at, 4).map(LittleEndian::read_f32)
    }

    pub fn get_f64(&self, at: usize) -> Option<f64> {
        self.slice(at, 8).map(LittleEndian::read_f64)
    }
}

/// A table definition handed out by the engine
#[derive(Debug)]
pub struct TableHandle {
    definition: TableDefinition,
    _lease: Lease,
}

impl TableHandle {
    /// Wrap a definition together with the lease that keeps it alive
    pub fn new(definition: TableDefinition, lease: Lease) -> Self {
        Self {
            definition,
            _lease: lease,
        }
    }

    /// The column definitions
    pub fn definition(&self) -> &TableDefinition {
        &self.definition
    }
}

/// Engine-allocated scratch buffer holding a streamed OLE value
#[derive(Debug)]
pub struct OleBuffer {
    data: Vec<u8>,
    _lease: Lease,
}

impl OleBuffer {
    /// Wrap streamed bytes together with the lease of the scratch allocation
    pub fn new(data: Vec<u8>, lease: Lease) -> Self {
        Self { data, _lease: lease }
    }

    /// Streamed bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take the bytes and release the scratch allocation
    pub fn into_bytes(self) -> Vec<u8> {
        let OleBuffer { data, _lease } = self;
        data
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// Convert a day count relative to 1899-12-30 into a date and time.
///
/// The integral part selects the day (negative counts go backwards); the
/// magnitude of the fractional part is the time of day.
pub fn days_to_datetime(days: f64) -> Option<NaiveDateTime> {
    // whole days run from MIN_DAY_OFFSET to MAX_DAY_OFFSET, any time of day included
    if !days.is_finite() || days <= MIN_DAY_OFFSET - 1.0 || days >= MAX_DAY_OFFSET + 1.0 {
        return None;
    }

    let whole = days.trunc();
    let mut seconds = ((days - whole).abs() * SECONDS_PER_DAY).round() as i64;
    let mut day_offset = whole as i64;
    if seconds >= SECONDS_PER_DAY as i64 {
        seconds -= SECONDS_PER_DAY as i64;
        day_offset += if days < 0.0 { -1 } else { 1 };
    }

    let date = epoch().checked_add_signed(Duration::days(day_offset))?;
    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::seconds(seconds))
}

/// Convert a date and time into a day count relative to 1899-12-30
pub fn datetime_to_days(value: NaiveDateTime) -> f64 {
    let day_offset = (value.date() - epoch()).num_days() as f64;
    let fraction = value.time().num_seconds_from_midnight() as f64 / SECONDS_PER_DAY;
    if day_offset < 0.0 {
        day_offset - fraction
    } else {
        day_offset + fraction
    }
}

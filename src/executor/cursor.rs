//! Row cursor
//!
//! Random-access iteration over a materialized [`ResultSet`]. Every field
//! was decoded when the query ran, so moving the cursor and reading fields
//! never touches the engine again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use super::decoder::DecodeWarning;
use super::materializer::{ResultColumn, ResultSet};
use super::value::Value;
use crate::catalog::ValueKind;
use crate::driver::Connection;
use crate::engine::Engine;
use crate::error::Error;

/// Where the cursor stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    BeforeFirst,
    Row(usize),
    AfterLast,
}

/// Cursor over the result of one query
#[derive(Debug)]
pub struct Cursor {
    result: ResultSet,
    active: bool,
    at: Position,
    /// Cleared by the owning connection when it closes
    session: Arc<AtomicBool>,
    last_error: Option<Error>,
}

impl Cursor {
    /// An inactive cursor tied to a connection's session flag
    pub fn new(session: Arc<AtomicBool>) -> Self {
        Self {
            result: ResultSet::default(),
            active: false,
            at: Position::BeforeFirst,
            session,
            last_error: None,
        }
    }

    /// An active cursor positioned before the first row
    pub fn with_result(result: ResultSet, session: Arc<AtomicBool>) -> Self {
        Self {
            result,
            active: true,
            ..Self::new(session)
        }
    }

    /// Run `sql` on the connection and replace this cursor's result.
    ///
    /// On failure the cursor becomes inactive and keeps the error.
    pub fn reset<E: Engine>(&mut self, connection: &mut Connection<E>, sql: &str) -> bool {
        self.result = ResultSet::default();
        self.active = false;
        self.at = Position::BeforeFirst;
        self.last_error = None;
        self.session = connection.session();

        match connection.materialize(sql) {
            Ok(result) => {
                self.result = result;
                self.active = true;
                true
            }
            Err(err) => {
                self.last_error = Some(err);
                false
            }
        }
    }

    fn is_session_open(&self) -> bool {
        self.session.load(Ordering::Acquire)
    }

    /// Move to a row; fails without moving when the row does not exist
    pub fn fetch(&mut self, index: usize) -> bool {
        if !self.is_session_open() || !self.active {
            return false;
        }
        if self.at == Position::Row(index) {
            return true;
        }
        if index >= self.result.row_count() {
            return false;
        }
        self.at = Position::Row(index);
        true
    }

    pub fn fetch_first(&mut self) -> bool {
        self.fetch(0)
    }

    pub fn fetch_last(&mut self) -> bool {
        match self.result.row_count() {
            0 => false,
            count => self.fetch(count - 1),
        }
    }

    /// Advance one row; stepping past the last row leaves the cursor after it
    pub fn next(&mut self) -> bool {
        let target = match self.at {
            Position::BeforeFirst => 0,
            Position::Row(index) => index + 1,
            Position::AfterLast => return false,
        };
        if self.fetch(target) {
            return true;
        }
        if self.active && self.is_session_open() {
            self.at = Position::AfterLast;
        }
        false
    }

    /// Step back one row; stepping before the first row leaves the cursor before it
    pub fn previous(&mut self) -> bool {
        match self.at {
            Position::BeforeFirst => false,
            Position::Row(0) => {
                if self.active && self.is_session_open() {
                    self.at = Position::BeforeFirst;
                }
                false
            }
            Position::Row(index) => self.fetch(index - 1),
            Position::AfterLast => self.fetch_last(),
        }
    }

    pub fn at(&self) -> Position {
        self.at
    }

    /// Whether the cursor is positioned on a row
    pub fn is_valid(&self) -> bool {
        matches!(self.at, Position::Row(_))
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Decoded value of a field of the current row
    pub fn field(&self, index: usize) -> Option<&Value> {
        let Position::Row(row) = self.at else {
            warn!("Cursor is not positioned on a row");
            return None;
        };
        let value = self.result.row(row).and_then(|values| values.get(index));
        if value.is_none() {
            warn!("Column {} out of range", index);
        }
        value
    }

    /// True for NULL values and for fields that do not exist
    pub fn is_null(&self, index: usize) -> bool {
        let Position::Row(row) = self.at else {
            return true;
        };
        self.result
            .row(row)
            .and_then(|values| values.get(index))
            .map_or(true, Value::is_null)
    }

    /// Field as display text, `None` for NULL or a missing field
    pub fn text(&self, index: usize) -> Option<String> {
        self.field(index).and_then(Value::to_text)
    }

    /// Client-facing kind of a column
    pub fn value_kind(&self, index: usize) -> Option<ValueKind> {
        self.result.columns().get(index).map(ResultColumn::value_kind)
    }

    /// Number of rows in the result
    pub fn row_count(&self) -> usize {
        self.result.row_count()
    }

    /// Result columns; empty unless the cursor is active
    pub fn record(&self) -> &[ResultColumn] {
        if self.active {
            self.result.columns()
        } else {
            &[]
        }
    }

    /// Queries never modify the database
    pub fn num_rows_affected(&self) -> Option<usize> {
        None
    }

    /// Cells that failed to decode
    pub fn warnings(&self) -> &[DecodeWarning] {
        self.result.warnings()
    }

    /// Error from the last failed [`Cursor::reset`]
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// The underlying result
    pub fn result(&self) -> &ResultSet {
        &self.result
    }
}

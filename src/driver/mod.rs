//! Driver module
//!
//! The interface a SQL client uses: open and close a database, list its
//! objects, read table metadata and run queries into cursors.

pub mod config;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::{self, list_objects, strip_delimiters, ObjectKinds, TableDefinition};
use crate::engine::{Engine, MemoryEngine};
use crate::error::{Error, Result, CLOSE_ERROR_CODE, NOT_A_DATABASE_CODE, OPEN_ERROR_CODE};
use crate::executor::{execute, Cursor, ResultColumn, ResultSet};

pub use config::ConnectOptions;

/// Optional capabilities a client may ask about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Transactions,
    QuerySize,
    Blob,
    Unicode,
    PreparedQueries,
    NamedPlaceholders,
    PositionalPlaceholders,
    LastInsertId,
    BatchOperations,
    SimpleLocking,
    LowPrecisionNumbers,
    EventNotifications,
    FinishQuery,
    MultipleResultSets,
    CancelQuery,
}

impl Feature {
    /// Every feature, in declaration order
    pub const ALL: [Feature; 15] = [
        Feature::Transactions,
        Feature::QuerySize,
        Feature::Blob,
        Feature::Unicode,
        Feature::PreparedQueries,
        Feature::NamedPlaceholders,
        Feature::PositionalPlaceholders,
        Feature::LastInsertId,
        Feature::BatchOperations,
        Feature::SimpleLocking,
        Feature::LowPrecisionNumbers,
        Feature::EventNotifications,
        Feature::FinishQuery,
        Feature::MultipleResultSets,
        Feature::CancelQuery,
    ];
}

/// A connection to one database file.
///
/// The connection owns the engine and therefore its single running query;
/// callers that need concurrent queries open more connections.
#[derive(Debug)]
pub struct Connection<E: Engine = MemoryEngine> {
    engine: Option<E>,
    /// Shared with cursors; cleared on close
    session: Arc<AtomicBool>,
    open_error: bool,
    last_error: Option<Error>,
}

impl<E: Engine> Default for Connection<E> {
    fn default() -> Self {
        Self {
            engine: None,
            session: Arc::new(AtomicBool::new(false)),
            open_error: false,
            last_error: None,
        }
    }
}

impl<E: Engine> Connection<E> {
    /// Create a closed connection
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a database file, closing any database already open
    pub fn open(&mut self, options: &ConnectOptions) -> Result<()> {
        self.reset_for_open();
        options.log_ignored();

        let engine = match E::open(options.path()) {
            Ok(engine) => engine,
            Err(err) => {
                return self.fail_open(|| Error::connection("Error opening database", err.message.clone(), OPEN_ERROR_CODE))
            }
        };
        debug!("Opening {}", options.path().display());
        self.attach(engine)
    }

    /// Use an engine that is already open
    pub fn open_engine(&mut self, engine: E) -> Result<()> {
        self.reset_for_open();
        self.attach(engine)
    }

    fn reset_for_open(&mut self) {
        if self.is_open() {
            if let Err(err) = self.close() {
                debug!("Closing before reopening failed: {}", err);
            }
        }
        self.open_error = false;
        self.last_error = None;
    }

    fn attach(&mut self, mut engine: E) -> Result<()> {
        if !engine.read_catalog() {
            if let Err(err) = engine.close() {
                debug!("Closing rejected file failed: {}", err);
            }
            return self.fail_open(|| {
                Error::connection("File does not appear to be an Access database", "", NOT_A_DATABASE_CODE)
            });
        }

        self.engine = Some(engine);
        self.session = Arc::new(AtomicBool::new(true));
        Ok(())
    }

    fn fail_open(&mut self, error: impl Fn() -> Error) -> Result<()> {
        self.open_error = true;
        self.last_error = Some(error());
        Err(error())
    }

    /// Close the database. A failure is also kept as the last error.
    pub fn close(&mut self) -> Result<()> {
        self.open_error = false;
        let Some(mut engine) = self.engine.take() else {
            return Ok(());
        };
        self.session.store(false, Ordering::Release);
        engine.reset();

        match engine.close() {
            Ok(()) => {
                debug!("Database closed");
                Ok(())
            }
            Err(err) => {
                warn!("Error closing database: {}", err);
                let error = || Error::connection("Error closing database", err.message.clone(), CLOSE_ERROR_CODE);
                self.last_error = Some(error());
                Err(error())
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.engine.is_some()
    }

    /// Whether the last open attempt failed
    pub fn is_open_error(&self) -> bool {
        self.open_error
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Names of catalog objects of the requested kinds, in catalog order.
    /// Empty when the connection is closed.
    pub fn tables(&self, kinds: ObjectKinds) -> Vec<String> {
        list_objects(self.engine.as_ref().and_then(Engine::catalog), kinds)
    }

    /// Field metadata of a table; empty when closed or the table is absent
    pub fn record(&self, table: &str) -> Vec<ResultColumn> {
        match self.open_table(table) {
            Ok(definition) => definition
                .columns()
                .enumerate()
                .map(|(i, column)| ResultColumn::from_definition(column, i))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Full definition of a table; `"..."` and `[...]` quoting is removed
    pub fn open_table(&self, table: &str) -> Result<TableDefinition> {
        let engine = self.engine.as_ref().ok_or(Error::NotOpen)?;
        catalog::open_table(engine, strip_delimiters(table))
    }

    /// Primary index of a table; the file format's indexes are not read
    pub fn primary_index(&self, table: &str) -> Vec<ResultColumn> {
        debug!("Primary index of {} requested; indexes are not supported", table);
        Vec::new()
    }

    /// Run a query and materialize its result
    pub fn materialize(&mut self, sql: &str) -> Result<ResultSet> {
        let engine = self.engine.as_mut().ok_or(Error::NotOpen)?;
        execute(engine, sql)
    }

    /// Run a query and return an active cursor over its result
    pub fn execute(&mut self, sql: &str) -> Result<Cursor> {
        let result = self.materialize(sql)?;
        Ok(Cursor::with_result(result, self.session()))
    }

    /// An inactive cursor bound to this connection
    pub fn create_cursor(&self) -> Cursor {
        Cursor::new(self.session())
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        matches!(feature, Feature::QuerySize | Feature::Unicode)
    }

    /// The open engine
    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub(crate) fn session(&self) -> Arc<AtomicBool> {
        self.session.clone()
    }
}

impl<E: Engine> Drop for Connection<E> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!("Closing on drop failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, ColumnDefinition, ColumnType, ObjectType};
    use crate::engine::{EngineError, EngineResult, OleBuffer, RawCell, TableHandle};
    use crate::engine::memory::MemoryDatabase;
    use crate::error::ErrorKind;
    use crate::executor::Value;
    use serde_json::json;
    use std::path::Path;

    fn books() -> MemoryEngine {
        MemoryEngine::from_database(
            MemoryDatabase::builder()
                .system_table("MSysObjects", vec![])
                .table(
                    "Books",
                    vec![
                        ColumnDefinition::new("Id", ColumnType::Int32),
                        ColumnDefinition::new("Title", ColumnType::Text),
                    ],
                    vec![vec![json!(1), json!("Go")]],
                )
                .build(),
        )
    }

    fn connection() -> Connection {
        let mut conn = Connection::new();
        conn.open_engine(books()).unwrap();
        conn
    }

    /// Engine whose behaviour is picked by the file name
    #[derive(Debug)]
    struct ScriptedEngine {
        name: String,
        catalog: Vec<CatalogEntry>,
    }

    impl Engine for ScriptedEngine {
        fn open(path: &Path) -> EngineResult<Self> {
            let name = path.to_string_lossy().into_owned();
            if name == "missing" {
                return Err(EngineError::new("No such file"));
            }
            Ok(Self {
                name,
                catalog: vec![CatalogEntry::new("T", ObjectType::Table, 0)],
            })
        }

        fn read_catalog(&mut self) -> bool {
            self.name != "not-a-db"
        }

        fn catalog(&self) -> Option<&[CatalogEntry]> {
            Some(&self.catalog)
        }

        fn read_table(&self, _name: &str) -> Option<TableHandle> {
            None
        }

        fn run_query(&mut self, _sql: &str) -> EngineResult<()> {
            Err(EngineError::new("syntax error"))
        }

        fn query_columns(&self) -> &[String] {
            &[]
        }

        fn query_sources(&self) -> &[Option<usize>] {
            &[]
        }

        fn query_table(&self) -> Option<&TableDefinition> {
            None
        }

        fn fetch_next_row(&mut self) -> bool {
            false
        }

        fn cell(&self, _column: usize) -> Option<RawCell<'_>> {
            None
        }

        fn bound_value(&self, _output: usize) -> Option<&str> {
            None
        }

        fn read_ole(&self, _column: &ColumnDefinition, _cell: &RawCell<'_>) -> EngineResult<OleBuffer> {
            Err(EngineError::new("no OLE"))
        }

        fn reset(&mut self) {}

        fn close(&mut self) -> EngineResult<()> {
            if self.name == "bad-close" {
                Err(EngineError::new("disk on fire"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_open_errors() {
        let mut conn: Connection<ScriptedEngine> = Connection::new();
        let err = conn.open(&ConnectOptions::new("missing")).unwrap_err();
        assert_eq!(err.code(), Some(-1));
        assert_eq!(err.to_string(), "Error opening database: No such file");
        assert!(conn.is_open_error());
        assert!(!conn.is_open());

        let err = conn.open(&ConnectOptions::new("not-a-db")).unwrap_err();
        assert_eq!(err.code(), Some(-2));
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(conn.last_error().is_some());

        conn.open(&ConnectOptions::new("fine")).unwrap();
        assert!(conn.is_open());
        assert!(!conn.is_open_error());
        assert!(conn.last_error().is_none());
    }

    #[test]
    fn test_close_error() {
        let mut conn: Connection<ScriptedEngine> = Connection::new();
        conn.open(&ConnectOptions::new("bad-close").username("ignored")).unwrap();
        let err = conn.close().unwrap_err();
        assert_eq!(err.code(), Some(-2));
        assert_eq!(conn.last_error().and_then(Error::engine_message), Some("disk on fire"));
        assert!(!conn.is_open());
        // closing again is a no-op
        conn.close().unwrap();
    }

    #[test]
    fn test_statement_error() {
        let mut conn: Connection<ScriptedEngine> = Connection::new();
        conn.open(&ConnectOptions::new("fine")).unwrap();
        let err = conn.execute("SELECT").unwrap_err();
        assert_eq!(err.code(), Some(-11));
        assert_eq!(err.engine_message(), Some("syntax error"));
    }

    #[test]
    fn test_closed_connection() {
        let mut conn: Connection = Connection::new();
        assert!(conn.tables(ObjectKinds::ALL).is_empty());
        assert!(conn.record("Books").is_empty());
        assert!(matches!(conn.open_table("Books"), Err(Error::NotOpen)));
        assert!(matches!(conn.execute("SELECT * FROM Books"), Err(Error::NotOpen)));
    }

    #[test]
    fn test_tables_and_record() {
        let conn = connection();
        assert_eq!(conn.tables(ObjectKinds::TABLES), vec!["Books"]);
        assert_eq!(conn.tables(ObjectKinds::SYSTEM_TABLES), vec!["MSysObjects"]);
        assert!(conn.tables(ObjectKinds::VIEWS).is_empty());

        let record = conn.record("[Books]");
        assert_eq!(record.len(), 2);
        assert_eq!(record[1].name, "Title");
        assert!(conn.record("\"Nope\"").is_empty());
        assert!(matches!(conn.open_table("Nope"), Err(Error::TableNotFound(_))));
        assert!(conn.primary_index("Books").is_empty());
    }

    #[test]
    fn test_features() {
        let conn = connection();
        let supported: Vec<Feature> = Feature::ALL.into_iter().filter(|f| conn.has_feature(*f)).collect();
        assert_eq!(supported, vec![Feature::QuerySize, Feature::Unicode]);
    }

    #[test]
    fn test_cursor_lifecycle() {
        let mut conn = connection();
        let mut cursor = conn.execute("SELECT * FROM Books").unwrap();
        assert!(cursor.next());
        assert_eq!(cursor.field(1), Some(&Value::Text("Go".into())));

        let mut other = conn.create_cursor();
        assert!(!other.is_active());
        assert!(!other.reset(&mut conn, "SELECT * FROM Nope"));
        assert!(!other.is_active());
        assert!(other.last_error().is_some());
        assert!(other.reset(&mut conn, "SELECT Title FROM Books"));
        assert_eq!(other.row_count(), 1);

        conn.close().unwrap();
        assert!(!cursor.fetch(0));
        // values already read stay available
        assert_eq!(cursor.field(0), Some(&Value::Int64(1)));
        assert!(!other.fetch(0));
    }

    #[test]
    fn test_reopen_closes_first() {
        let mut conn = connection();
        let mut cursor = conn.execute("SELECT * FROM Books").unwrap();
        conn.open_engine(books()).unwrap();
        assert!(conn.is_open());
        // cursors of the previous session are dead
        assert!(!cursor.fetch(0));
    }
}

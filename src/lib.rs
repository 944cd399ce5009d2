//! mdbsql - a read-only SQL driver over Microsoft Access database files
//!
//! The driver core is engine-agnostic: it reads the catalog, decodes column
//! values and serves cursors over any [`engine::Engine`]. The bundled
//! memory engine reads JSON database files; `.mdb`/`.accdb` files need an
//! engine for the Jet page format.
//!
//! This library provides the core components of the driver:
//! - System catalog enumeration and table definitions
//! - The engine contract and a page-buffered memory engine
//! - SQL parsing for the engine's query language
//! - Column value decoding, result materialization and cursors
//! - Connections and connect options

pub mod catalog;
pub mod driver;
pub mod engine;
pub mod error;
pub mod executor;
pub mod sql;

pub use driver::{ConnectOptions, Connection, Feature};
pub use error::{Error, ErrorKind, Result};
pub use executor::{Cursor, ResultSet, Value};

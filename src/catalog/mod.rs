//! Catalog module
//!
//! This module contains catalog enumeration, table definitions and column types.

pub mod catalog;
pub mod schema;
pub mod types;

pub use catalog::{
    list_objects, open_table, strip_delimiters, CatalogEntry, ObjectKind, ObjectKinds, ObjectType,
    SYSTEM_OBJECT_FLAGS,
};
pub use schema::{ColumnDefinition, TableDefinition, SHORT_DATE_FORMAT};
pub use types::{ColumnType, ValueKind};

//! Loaded database contents
//!
//! Builds the catalog and encodes every table's rows into pages when a
//! database file is opened.

use super::database::DatabaseObject;
use super::page::{PageStore, PageType, RecordPointer};
use super::row::encode_row;
use crate::catalog::{CatalogEntry, ObjectType, TableDefinition};
use crate::error::Result;

/// A table and the locations of its rows
#[derive(Debug)]
pub struct StoredTable {
    pub definition: TableDefinition,
    pub rows: Vec<RecordPointer>,
}

/// Catalog, tables and pages of one open database
#[derive(Debug, Default)]
pub struct Storage {
    catalog: Vec<CatalogEntry>,
    tables: Vec<StoredTable>,
    store: PageStore,
}

impl Storage {
    /// Encode all objects; fails on the first malformed object or row
    pub fn build(objects: &[DatabaseObject]) -> Result<Self> {
        let mut storage = Storage::default();

        for object in objects {
            let object_type = object.object_type.resolve()?;
            storage
                .catalog
                .push(CatalogEntry::new(object.name.clone(), object_type, object.flags));

            if object_type != ObjectType::Table {
                continue;
            }

            let definition = TableDefinition::from_columns(object.name.clone(), object.columns.clone());
            let mut rows = Vec::with_capacity(object.rows.len());
            for values in &object.rows {
                let row = encode_row(&mut storage.store, &definition, values)?;
                rows.push(storage.store.append(PageType::Data, &row)?);
            }
            storage.tables.push(StoredTable { definition, rows });
        }

        Ok(storage)
    }

    /// Catalog entries in file order
    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    /// Index of a table by name, ignoring ASCII case
    pub fn find_table(&self, name: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|t| t.definition.name().eq_ignore_ascii_case(name))
    }

    pub fn table(&self, index: usize) -> Option<&StoredTable> {
        self.tables.get(index)
    }

    /// The page store
    pub fn store(&self) -> &PageStore {
        &self.store
    }
}

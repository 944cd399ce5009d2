//! Database files for the memory engine
//!
//! These are not Access files. They describe an Access catalog and its
//! tables so the memory engine can lay them out in pages.
//!
//! A database file is a JSON document listing the catalog in on-disk order:
//!
//! ```json
//! {
//!   "objects": [
//!     { "name": "MSysObjects", "type": "table", "flags": 2147483648 },
//!     { "name": "Books", "type": "table",
//!       "columns": [ { "name": "Id", "type": "int32" } ],
//!       "rows": [ [1] ] },
//!     { "name": "qryAll", "type": "query", "sql": "SELECT * FROM Books" }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::catalog::{ColumnDefinition, ObjectType, SYSTEM_OBJECT_FLAGS};
use crate::error::{Error, Result};

/// Object type as written in a database file: a name or a raw code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectTypeSpec {
    Code(u8),
    Name(String),
}

impl ObjectTypeSpec {
    /// Resolve to an object type
    pub fn resolve(&self) -> Result<ObjectType> {
        match self {
            ObjectTypeSpec::Code(code) => Ok(ObjectType::from_code(*code)),
            ObjectTypeSpec::Name(name) => ObjectType::from_name(name)
                .ok_or_else(|| Error::InvalidDatabase(format!("unknown object type '{}'", name))),
        }
    }
}

impl From<ObjectType> for ObjectTypeSpec {
    fn from(object_type: ObjectType) -> Self {
        ObjectTypeSpec::Code(object_type.code())
    }
}

/// One catalog object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseObject {
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: ObjectTypeSpec,
    #[serde(default)]
    pub flags: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

impl DatabaseObject {
    /// Create an object with no columns, rows or SQL
    pub fn new(name: impl Into<String>, object_type: ObjectType, flags: u32) -> Self {
        Self {
            name: name.into(),
            object_type: object_type.into(),
            flags,
            columns: Vec::new(),
            rows: Vec::new(),
            sql: None,
        }
    }
}

/// The contents of a database file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDatabase {
    /// Catalog in on-disk order; absent in files that are not databases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<DatabaseObject>>,
}

impl MemoryDatabase {
    /// Start building a database in code
    pub fn builder() -> MemoryDatabaseBuilder {
        MemoryDatabaseBuilder::default()
    }

    /// Parse a database from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a database file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Save to a database file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}

/// Builder for [`MemoryDatabase`]
#[derive(Debug, Default)]
pub struct MemoryDatabaseBuilder {
    objects: Vec<DatabaseObject>,
}

impl MemoryDatabaseBuilder {
    /// Add a user table
    pub fn table(
        mut self,
        name: impl Into<String>,
        columns: Vec<ColumnDefinition>,
        rows: Vec<Vec<JsonValue>>,
    ) -> Self {
        let mut object = DatabaseObject::new(name, ObjectType::Table, 0);
        object.columns = columns;
        object.rows = rows;
        self.objects.push(object);
        self
    }

    /// Add a system table
    pub fn system_table(mut self, name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        let mut object = DatabaseObject::new(name, ObjectType::Table, SYSTEM_OBJECT_FLAGS);
        object.columns = columns;
        self.objects.push(object);
        self
    }

    /// Add a saved query
    pub fn query(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        let mut object = DatabaseObject::new(name, ObjectType::Query, 0);
        object.sql = Some(sql.into());
        self.objects.push(object);
        self
    }

    /// Add any other catalog object (forms, reports, ...)
    pub fn object(mut self, name: impl Into<String>, object_type: ObjectType, flags: u32) -> Self {
        self.objects.push(DatabaseObject::new(name, object_type, flags));
        self
    }

    /// Finish building
    pub fn build(self) -> MemoryDatabase {
        MemoryDatabase {
            objects: Some(self.objects),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnType;
    use serde_json::json;

    #[test]
    fn test_parse_database_file() {
        let db = MemoryDatabase::from_json(
            r#"{
                "objects": [
                    {"name": "MSysObjects", "type": "table", "flags": 2147483648},
                    {"name": "Books", "type": 1,
                     "columns": [{"name": "Id", "type": "longint"}],
                     "rows": [[1], [2]]},
                    {"name": "qryAll", "type": "query", "sql": "SELECT * FROM Books"}
                ]
            }"#,
        )
        .unwrap();

        let objects = db.objects.unwrap();
        assert_eq!(objects.len(), 3);
        assert_eq!(objects[0].object_type.resolve().unwrap(), ObjectType::Table);
        assert_eq!(objects[1].columns[0].column_type, ColumnType::Int32);
        assert_eq!(objects[1].rows.len(), 2);
        assert_eq!(objects[2].sql.as_deref(), Some("SELECT * FROM Books"));
    }

    #[test]
    fn test_not_a_database() {
        let db = MemoryDatabase::from_json(r#"{"hello": "world"}"#).unwrap();
        assert!(db.objects.is_none());
        assert!(MemoryDatabase::from_json("not json").is_err());
    }

    #[test]
    fn test_unknown_object_type_name() {
        let spec = ObjectTypeSpec::Name("spreadsheet".to_string());
        assert!(spec.resolve().is_err());
    }

    #[test]
    fn test_builder_save_and_load() {
        let db = MemoryDatabase::builder()
            .system_table("MSysObjects", vec![])
            .table(
                "Books",
                vec![ColumnDefinition::new("Id", ColumnType::Int32)],
                vec![vec![json!(1)]],
            )
            .query("qryAll", "SELECT * FROM Books")
            .object("frmMain", ObjectType::Form, 0)
            .build();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.json");
        db.save(&path).unwrap();

        let loaded = MemoryDatabase::load(&path).unwrap();
        let objects = loaded.objects.unwrap();
        assert_eq!(objects.len(), 4);
        assert_eq!(objects[0].flags, SYSTEM_OBJECT_FLAGS);
        assert_eq!(objects[1].rows, vec![vec![json!(1)]]);
        assert_eq!(objects[3].object_type.resolve().unwrap(), ObjectType::Form);
    }
}

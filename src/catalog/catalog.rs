//! System Catalog for mdbsql
//!
//! This module classifies the entries of the database's system catalog and
//! resolves table names to their column definitions.

use super::schema::TableDefinition;
use crate::engine::Engine;
use crate::error::{Error, Result};
use std::fmt;
use std::ops::BitOr;
use tracing::debug;

/// Catalog flag bits that mark a table as a system table
pub const SYSTEM_OBJECT_FLAGS: u32 = 0x8000_0002;

/// Object type code of a catalog record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Form,
    Table,
    Macro,
    SystemTable,
    Report,
    Query,
    LinkedTable,
    Module,
    Relationship,
    DatabaseProperty,
    Other(u8),
}

impl ObjectType {
    /// Map a raw object type code
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => ObjectType::Form,
            0x01 => ObjectType::Table,
            0x02 => ObjectType::Macro,
            0x03 => ObjectType::SystemTable,
            0x04 => ObjectType::Report,
            0x05 => ObjectType::Query,
            0x06 => ObjectType::LinkedTable,
            0x07 => ObjectType::Module,
            0x08 => ObjectType::Relationship,
            0x0b => ObjectType::DatabaseProperty,
            other => ObjectType::Other(other),
        }
    }

    /// Map an object type name as written in database files
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "form" => Some(ObjectType::Form),
            "table" => Some(ObjectType::Table),
            "macro" => Some(ObjectType::Macro),
            "system_table" => Some(ObjectType::SystemTable),
            "report" => Some(ObjectType::Report),
            "query" => Some(ObjectType::Query),
            "linked_table" => Some(ObjectType::LinkedTable),
            "module" => Some(ObjectType::Module),
            "relationship" => Some(ObjectType::Relationship),
            "database_property" => Some(ObjectType::DatabaseProperty),
            _ => None,
        }
    }

    /// The raw object type code
    pub fn code(&self) -> u8 {
        match self {
            ObjectType::Form => 0x00,
            ObjectType::Table => 0x01,
            ObjectType::Macro => 0x02,
            ObjectType::SystemTable => 0x03,
            ObjectType::Report => 0x04,
            ObjectType::Query => 0x05,
            ObjectType::LinkedTable => 0x06,
            ObjectType::Module => 0x07,
            ObjectType::Relationship => 0x08,
            ObjectType::DatabaseProperty => 0x0b,
            ObjectType::Other(code) => *code,
        }
    }
}

/// One record of the system catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Object name
    pub name: String,
    /// Raw object type
    pub object_type: ObjectType,
    /// Raw catalog flags
    pub flags: u32,
}

impl CatalogEntry {
    /// Create a new catalog entry
    pub fn new(name: impl Into<String>, object_type: ObjectType, flags: u32) -> Self {
        Self {
            name: name.into(),
            object_type,
            flags,
        }
    }

    /// A table that is not flagged as a system object
    pub fn is_user_table(&self) -> bool {
        self.object_type == ObjectType::Table && self.flags & SYSTEM_OBJECT_FLAGS == 0
    }

    /// A table flagged as a system object
    pub fn is_system_table(&self) -> bool {
        self.object_type == ObjectType::Table && self.flags & SYSTEM_OBJECT_FLAGS != 0
    }

    /// A saved query
    pub fn is_view(&self) -> bool {
        self.object_type == ObjectType::Query
    }

    /// Check this entry against one requested kind
    pub fn matches(&self, kind: ObjectKind) -> bool {
        match kind {
            ObjectKind::UserTable => self.is_user_table(),
            ObjectKind::SystemTable => self.is_system_table(),
            ObjectKind::View => self.is_view(),
        }
    }
}

/// Kind of catalog object a caller can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    UserTable,
    SystemTable,
    View,
}

impl ObjectKind {
    fn bit(self) -> u8 {
        match self {
            ObjectKind::UserTable => 0x01,
            ObjectKind::SystemTable => 0x02,
            ObjectKind::View => 0x04,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::UserTable => write!(f, "table"),
            ObjectKind::SystemTable => write!(f, "system table"),
            ObjectKind::View => write!(f, "view"),
        }
    }
}

/// A set of requested object kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectKinds(u8);

impl ObjectKinds {
    pub const NONE: ObjectKinds = ObjectKinds(0);
    pub const TABLES: ObjectKinds = ObjectKinds(0x01);
    pub const SYSTEM_TABLES: ObjectKinds = ObjectKinds(0x02);
    pub const VIEWS: ObjectKinds = ObjectKinds(0x04);
    pub const ALL: ObjectKinds = ObjectKinds(0x07);

    /// Check whether a kind is requested
    pub fn contains(&self, kind: ObjectKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Check whether nothing is requested
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl From<ObjectKind> for ObjectKinds {
    fn from(kind: ObjectKind) -> Self {
        ObjectKinds(kind.bit())
    }
}

impl BitOr for ObjectKinds {
    type Output = ObjectKinds;

    fn bitor(self, rhs: ObjectKinds) -> ObjectKinds {
        ObjectKinds(self.0 | rhs.0)
    }
}

impl BitOr<ObjectKind> for ObjectKinds {
    type Output = ObjectKinds;

    fn bitor(self, rhs: ObjectKind) -> ObjectKinds {
        ObjectKinds(self.0 | rhs.bit())
    }
}

/// List catalog object names matching the requested kinds.
///
/// Every entry is visited once, in catalog order. Kinds are tested
/// independently, so an entry matching two requested kinds is listed twice.
/// A missing catalog yields an empty list.
pub fn list_objects(catalog: Option<&[CatalogEntry]>, kinds: ObjectKinds) -> Vec<String> {
    let mut names = Vec::new();
    let Some(entries) = catalog else {
        return names;
    };

    for entry in entries {
        for kind in [ObjectKind::UserTable, ObjectKind::SystemTable, ObjectKind::View] {
            if kinds.contains(kind) && entry.matches(kind) {
                names.push(entry.name.clone());
            }
        }
    }
    names
}

/// Resolve a table name to its fully populated definition.
///
/// The engine's table handle is released before returning on every path.
pub fn open_table<E: Engine>(engine: &E, table_name: &str) -> Result<TableDefinition> {
    let Some(handle) = engine.read_table(table_name) else {
        debug!("Error: Table {} does not exist in this database.", table_name);
        return Err(Error::TableNotFound(table_name.to_string()));
    };

    let definition = handle.definition();
    if definition.column_count() == 0 {
        debug!("Table {} has no columns", table_name);
        return Err(Error::TableNotFound(table_name.to_string()));
    }

    Ok(definition.clone())
}

/// Remove one level of `"..."` or `[...]` quoting from an identifier
pub fn strip_delimiters(identifier: &str) -> &str {
    let trimmed = identifier.trim();
    let quoted = (trimmed.starts_with('"') && trimmed.ends_with('"'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if quoted && trimmed.len() >= 2 {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

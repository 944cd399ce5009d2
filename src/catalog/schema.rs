//! Schema definitions for mdbsql
//!
//! This module defines table definitions and column metadata as read from
//! the database file.

use super::types::{ColumnType, ValueKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Display-format property value that marks a date/time column as date-only
pub const SHORT_DATE_FORMAT: &str = "Short Date";

/// Column definition in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// Name of the owning table
    #[serde(skip)]
    pub table_name: String,
    /// Logical type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Declared size in bytes
    #[serde(default, rename = "size")]
    pub byte_size: u32,
    /// Numeric precision
    #[serde(default)]
    pub precision: u32,
    /// Numeric scale
    #[serde(default)]
    pub scale: u32,
    /// Lives in the fixed-width part of the row
    #[serde(default, rename = "fixed")]
    pub is_fixed_width: bool,
    /// Long-integer auto-number column
    #[serde(default, rename = "auto_increment")]
    pub is_auto_increment: bool,
    /// Display-format property ("Short Date", "General Number", ...)
    #[serde(default)]
    pub format: Option<String>,
}

impl ColumnDefinition {
    /// Create a new column with the defaults implied by its type
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            table_name: String::new(),
            column_type,
            byte_size: column_type.size().unwrap_or(255) as u32,
            precision: 0,
            scale: 0,
            is_fixed_width: column_type.is_fixed_width(),
            is_auto_increment: false,
            format: None,
        }
    }

    /// Set the declared size
    pub fn size(mut self, byte_size: u32) -> Self {
        self.byte_size = byte_size;
        self
    }

    /// Set precision and scale
    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Set the auto-increment flag
    pub fn auto_increment(mut self, auto: bool) -> Self {
        self.is_auto_increment = auto;
        self
    }

    /// Set the display-format property
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Whether the display format asks for a date without time
    pub fn is_short_date(&self) -> bool {
        self.format.as_deref() == Some(SHORT_DATE_FORMAT)
    }

    /// Client-facing value kind
    pub fn value_kind(&self) -> ValueKind {
        self.column_type.value_kind()
    }

    /// Fill in whatever a serialized definition left at its default
    pub(crate) fn normalize(&mut self, table_name: &str) {
        self.table_name = table_name.to_string();
        if self.byte_size == 0 {
            self.byte_size = self.column_type.size().unwrap_or(255) as u32;
        }
        if self.column_type.is_fixed_width() {
            self.is_fixed_width = true;
        }
    }
}

/// Table definition - ordered column metadata for one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDefinition {
    /// Table name
    name: String,
    /// Columns keyed by ASCII-lowercased name, in on-disk order
    columns: IndexMap<String, ColumnDefinition>,
}

impl TableDefinition {
    /// Create a new empty table definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
        }
    }

    /// Create a table definition from a list of columns
    pub fn from_columns(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        let mut table = Self::new(name);
        for col in columns {
            table.add_column(col);
        }
        table
    }

    /// Add a column to the table
    pub fn add_column(&mut self, mut column: ColumnDefinition) {
        column.normalize(&self.name);
        self.columns
            .insert(column.name.to_ascii_lowercase(), column);
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get column by name, ignoring ASCII case
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.get(&name.to_ascii_lowercase())
    }

    /// Get column index by name, ignoring ASCII case
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(&name.to_ascii_lowercase())
    }

    /// Get column by position
    pub fn column_at(&self, index: usize) -> Option<&ColumnDefinition> {
        self.columns.get_index(index).map(|(_, col)| col)
    }

    /// Iterate columns in on-disk order
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.values()
    }

    /// Get number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.values().map(|c| c.name.as_str()).collect()
    }

    /// Consume the definition, keeping only the columns
    pub fn into_columns(self) -> Vec<ColumnDefinition> {
        self.columns.into_values().collect()
    }
}

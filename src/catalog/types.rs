//! Column types for mdbsql
//!
//! This module defines the closed set of Access column types and the
//! client-facing value kinds they map to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access column types, as stored in the table definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Yes/No, stored in the row's null mask
    Bool,
    /// Unsigned 8-bit integer
    Byte,
    /// Signed 16-bit integer ("Integer")
    #[serde(alias = "int")]
    Int16,
    /// Signed 32-bit integer ("Long Integer")
    #[serde(alias = "longint")]
    Int32,
    /// Currency, a scaled 64-bit integer
    Money,
    /// Single-precision floating point
    #[serde(alias = "float")]
    Float32,
    /// Double-precision floating point
    #[serde(alias = "double")]
    Float64,
    /// Days since 1899-12-30 stored as a double
    #[serde(alias = "datetime")]
    DateTime,
    /// Fixed-length binary
    Binary,
    /// Variable-length text
    Text,
    /// Out-of-row binary object
    #[serde(alias = "ole")]
    OleBlob,
    /// Out-of-row long text
    Memo,
    /// Replication id (GUID)
    #[serde(alias = "repid")]
    RepId,
    /// Fixed-point decimal
    Numeric,
    /// Attachment and multi-value columns
    Complex,
    /// Any type code the driver does not know
    Unknown,
}

impl ColumnType {
    /// Map a raw type code from the table definition
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => ColumnType::Bool,
            0x02 => ColumnType::Byte,
            0x03 => ColumnType::Int16,
            0x04 => ColumnType::Int32,
            0x05 => ColumnType::Money,
            0x06 => ColumnType::Float32,
            0x07 => ColumnType::Float64,
            0x08 => ColumnType::DateTime,
            0x09 => ColumnType::Binary,
            0x0a => ColumnType::Text,
            0x0b => ColumnType::OleBlob,
            0x0c => ColumnType::Memo,
            0x0f => ColumnType::RepId,
            0x10 => ColumnType::Numeric,
            0x12 => ColumnType::Complex,
            _ => ColumnType::Unknown,
        }
    }

    /// The raw type code, `None` for [`ColumnType::Unknown`]
    pub fn code(&self) -> Option<u8> {
        match self {
            ColumnType::Bool => Some(0x01),
            ColumnType::Byte => Some(0x02),
            ColumnType::Int16 => Some(0x03),
            ColumnType::Int32 => Some(0x04),
            ColumnType::Money => Some(0x05),
            ColumnType::Float32 => Some(0x06),
            ColumnType::Float64 => Some(0x07),
            ColumnType::DateTime => Some(0x08),
            ColumnType::Binary => Some(0x09),
            ColumnType::Text => Some(0x0a),
            ColumnType::OleBlob => Some(0x0b),
            ColumnType::Memo => Some(0x0c),
            ColumnType::RepId => Some(0x0f),
            ColumnType::Numeric => Some(0x10),
            ColumnType::Complex => Some(0x12),
            ColumnType::Unknown => None,
        }
    }

    /// Get the in-row size in bytes for this type (for fixed-size types)
    pub fn size(&self) -> Option<usize> {
        match self {
            ColumnType::Bool => Some(0),
            ColumnType::Byte => Some(1),
            ColumnType::Int16 => Some(2),
            ColumnType::Int32 => Some(4),
            ColumnType::Money => Some(8),
            ColumnType::Float32 => Some(4),
            ColumnType::Float64 => Some(8),
            ColumnType::DateTime => Some(8),
            ColumnType::RepId => Some(16),
            ColumnType::Numeric => Some(17),
            ColumnType::Complex => Some(4),
            ColumnType::OleBlob | ColumnType::Memo => Some(12),
            ColumnType::Binary | ColumnType::Text | ColumnType::Unknown => None,
        }
    }

    /// Check if values of this type live in the fixed-width part of a row
    pub fn is_fixed_width(&self) -> bool {
        !matches!(
            self,
            ColumnType::Binary
                | ColumnType::Text
                | ColumnType::OleBlob
                | ColumnType::Memo
                | ColumnType::Unknown
        )
    }

    /// Client-facing value kind for this column type
    pub fn value_kind(&self) -> ValueKind {
        match self {
            ColumnType::Bool => ValueKind::Bool,
            ColumnType::Byte => ValueKind::Char,
            ColumnType::Int16 => ValueKind::Int,
            ColumnType::Int32 | ColumnType::RepId => ValueKind::LongLong,
            ColumnType::Money | ColumnType::Float32 | ColumnType::Float64 | ColumnType::Numeric => {
                ValueKind::Double
            }
            ColumnType::DateTime => ValueKind::DateTime,
            ColumnType::Binary | ColumnType::OleBlob => ValueKind::Bytes,
            ColumnType::Text | ColumnType::Memo | ColumnType::Complex | ColumnType::Unknown => {
                ValueKind::String
            }
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Bool => "BOOL",
            ColumnType::Byte => "BYTE",
            ColumnType::Int16 => "INT",
            ColumnType::Int32 => "LONGINT",
            ColumnType::Money => "MONEY",
            ColumnType::Float32 => "FLOAT",
            ColumnType::Float64 => "DOUBLE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Binary => "BINARY",
            ColumnType::Text => "TEXT",
            ColumnType::OleBlob => "OLE",
            ColumnType::Memo => "MEMO",
            ColumnType::RepId => "REPID",
            ColumnType::Numeric => "NUMERIC",
            ColumnType::Complex => "COMPLEX",
            ColumnType::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// The type a client sees for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Char,
    Int,
    LongLong,
    Double,
    DateTime,
    Bytes,
    String,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Char => "char",
            ValueKind::Int => "int",
            ValueKind::LongLong => "qlonglong",
            ValueKind::Double => "double",
            ValueKind::DateTime => "datetime",
            ValueKind::Bytes => "bytes",
            ValueKind::String => "string",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        assert_eq!(ColumnType::from_code(0x04), ColumnType::Int32);
        assert_eq!(ColumnType::from_code(0x0b), ColumnType::OleBlob);
        assert_eq!(ColumnType::from_code(0x42), ColumnType::Unknown);
        assert_eq!(ColumnType::Complex.code(), Some(0x12));
        assert_eq!(ColumnType::Unknown.code(), None);
    }

    #[test]
    fn test_type_size() {
        assert_eq!(ColumnType::Int32.size(), Some(4));
        assert_eq!(ColumnType::DateTime.size(), Some(8));
        assert_eq!(ColumnType::Text.size(), None);
        assert!(ColumnType::Money.is_fixed_width());
        assert!(!ColumnType::Memo.is_fixed_width());
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(ColumnType::Byte.value_kind(), ValueKind::Char);
        assert_eq!(ColumnType::Money.value_kind(), ValueKind::Double);
        assert_eq!(ColumnType::OleBlob.value_kind(), ValueKind::Bytes);
        assert_eq!(ColumnType::Unknown.value_kind(), ValueKind::String);
        assert_eq!(ColumnType::Int32.to_string(), "LONGINT");
    }
}

//! Error types for mdbsql
//!
//! This module defines all error types surfaced by the driver, the catalog
//! readers and the bundled memory engine.

use thiserror::Error;

/// Code reported when the database file cannot be opened
pub const OPEN_ERROR_CODE: i32 = -1;
/// Code reported when the file is not a database, or closing it failed
pub const NOT_A_DATABASE_CODE: i32 = -2;
/// Code reported when closing the database failed
pub const CLOSE_ERROR_CODE: i32 = -2;
/// Code reported when the engine rejects a query
pub const STATEMENT_ERROR_CODE: i32 = -11;

/// The main error type for mdbsql
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lexer error: unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Lexer error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Lexer error: invalid number format at position {0}")]
    InvalidNumber(usize),

    // ========== Parser Errors ==========
    #[error("Parse error: unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    // ========== Driver Errors ==========
    #[error("{description}: {engine_message}")]
    Connection {
        description: String,
        engine_message: String,
        code: i32,
    },

    #[error("{description}: {engine_message}")]
    Statement {
        description: String,
        engine_message: String,
        code: i32,
    },

    #[error("Connection error: database is not open")]
    NotOpen,

    // ========== Catalog Errors ==========
    #[error("Catalog error: table '{0}' not found")]
    TableNotFound(String),

    #[error("Catalog error: column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    // ========== Decode Errors ==========
    #[error("Decode error: {0}")]
    Decode(String),

    // ========== Storage Errors ==========
    #[error("Storage error: page {0} is full")]
    PageFull(u32),

    #[error("Storage error: corrupted page {0}")]
    CorruptedPage(u32),

    #[error("Storage error: invalid database file - {0}")]
    InvalidDatabase(String),

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// File missing, not a recognized database, catalog unreadable
    Connection,
    /// Query text rejected by the engine
    Statement,
    /// Named table or column absent
    NotFound,
    /// Query text could not be tokenized or parsed
    Parse,
    /// Underlying I/O or file format failure
    Io,
    /// Anything else
    Internal,
}

impl Error {
    /// Build a connection error from an engine message
    pub fn connection(description: impl Into<String>, engine_message: impl Into<String>, code: i32) -> Self {
        Error::Connection {
            description: description.into(),
            engine_message: engine_message.into(),
            code,
        }
    }

    /// Build a statement error from an engine message
    pub fn statement(description: impl Into<String>, engine_message: impl Into<String>) -> Self {
        Error::Statement {
            description: description.into(),
            engine_message: engine_message.into(),
            code: STATEMENT_ERROR_CODE,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection { .. } | Error::NotOpen => ErrorKind::Connection,
            Error::Statement { .. } => ErrorKind::Statement,
            Error::TableNotFound(_) | Error::ColumnNotFound(_, _) => ErrorKind::NotFound,
            Error::UnexpectedCharacter(_, _)
            | Error::UnterminatedString(_)
            | Error::InvalidNumber(_)
            | Error::UnexpectedToken { .. }
            | Error::ParseError(_) => ErrorKind::Parse,
            Error::PageFull(_)
            | Error::CorruptedPage(_)
            | Error::InvalidDatabase(_)
            | Error::IoError(_)
            | Error::Json(_) => ErrorKind::Io,
            Error::Decode(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Numeric code carried by driver-level errors
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Connection { code, .. } | Error::Statement { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The message reported by the engine, verbatim, if any
    pub fn engine_message(&self) -> Option<&str> {
        match self {
            Error::Connection { engine_message, .. } | Error::Statement { engine_message, .. } => {
                Some(engine_message)
            }
            _ => None,
        }
    }
}

/// Result type alias for mdbsql operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TableNotFound("Books".to_string());
        assert_eq!(err.to_string(), "Catalog error: table 'Books' not found");

        let err = Error::UnexpectedCharacter('@', 5);
        assert_eq!(
            err.to_string(),
            "Lexer error: unexpected character '@' at position 5"
        );
    }

    #[test]
    fn test_statement_error_carries_engine_message() {
        let err = Error::statement("Cannot run query", "Couldn't find table Nope");
        assert_eq!(err.kind(), ErrorKind::Statement);
        assert_eq!(err.code(), Some(STATEMENT_ERROR_CODE));
        assert_eq!(err.engine_message(), Some("Couldn't find table Nope"));
        assert_eq!(err.to_string(), "Cannot run query: Couldn't find table Nope");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::TableNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::connection("Error opening database", "no such file", OPEN_ERROR_CODE).code(),
            Some(-1)
        );
        assert_eq!(Error::ParseError("bad".into()).kind(), ErrorKind::Parse);
        assert_eq!(Error::NotOpen.code(), None);
    }
}

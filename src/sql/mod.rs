//! SQL module
//!
//! The read-only query language run by the memory engine: a single-table
//! SELECT with optional TOP, WHERE and LIMIT.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{BinaryOperator, Expr, Literal, SelectItem, SelectStatement};
pub use parser::{parse, Parser};

//! SQL Abstract Syntax Tree (AST)
//!
//! This module defines the AST nodes for the read-only query language.

use std::fmt;

/// SELECT statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    /// `TOP n`
    pub top: Option<u64>,
    /// Select list
    pub columns: Vec<SelectItem>,
    /// Table read by the query
    pub table: String,
    /// WHERE clause
    pub where_clause: Option<Expr>,
    /// `LIMIT n`
    pub limit: Option<u64>,
}

impl SelectStatement {
    /// Row cap from `TOP` and `LIMIT`, whichever is smaller
    pub fn row_limit(&self) -> Option<u64> {
        match (self.top, self.limit) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// A single item in the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// All columns (*)
    Wildcard,
    /// A column of the table
    Column { name: String, alias: Option<String> },
    /// A constant
    Literal { value: Literal, alias: Option<String> },
}

impl SelectItem {
    /// Name the result column is reported under
    pub fn output_name(&self) -> String {
        match self {
            SelectItem::Wildcard => "*".to_string(),
            SelectItem::Column { name, alias } => alias.clone().unwrap_or_else(|| name.clone()),
            SelectItem::Literal { alias, .. } => alias.clone().unwrap_or_default(),
        }
    }
}

/// SQL Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference
    Column(String),
    /// Literal value
    Literal(Literal),
    /// Binary operation
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// NOT
    Not(Box<Expr>),
    /// IS NULL
    IsNull(Box<Expr>),
    /// IS NOT NULL
    IsNotNull(Box<Expr>),
    /// LIKE
    Like {
        expr: Box<Expr>,
        pattern: String,
        negated: bool,
    },
    /// Nested expression (in parentheses)
    Nested(Box<Expr>),
}

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// `#...#` date, as written
    Date(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => Ok(()),
            // Access reports True as -1
            Literal::Boolean(b) => write!(f, "{}", if *b { -1 } else { 0 }),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Float(n) => write!(f, "{}", n),
            Literal::String(s) | Literal::Date(s) => write!(f, "{}", s),
        }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
}

impl BinaryOperator {
    /// Check if this operator compares two values
    pub fn is_comparison(&self) -> bool {
        !matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

//! WHERE clause evaluation for the memory engine
//!
//! Conditions use three-valued logic: a comparison involving NULL is unknown
//! (`None`), and only rows whose condition is `Some(true)` are returned.
//! Text compares case-insensitively, as Jet does.

use std::cmp::Ordering;

use super::row::parse_datetime;
use crate::engine::datetime_to_days;
use crate::error::{Error, Result};
use crate::sql::{BinaryOperator, Expr, Literal};

/// A stored value as seen by the query evaluator
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Days since 1899-12-30
    DateTime(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Scalar {
    fn as_number(&self) -> Option<f64> {
        match self {
            // Access stores True as -1
            Scalar::Bool(b) => Some(if *b { -1.0 } else { 0.0 }),
            Scalar::Int(n) => Some(*n as f64),
            Scalar::Float(f) | Scalar::DateTime(f) => Some(*f),
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Null | Scalar::Bytes(_) => None,
        }
    }

    fn truth(&self) -> Option<bool> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(b) => Some(*b),
            other => Some(other.as_number().is_some_and(|n| n != 0.0)),
        }
    }
}

/// Convert a literal to a scalar
pub fn literal_scalar(literal: &Literal) -> Result<Scalar> {
    let scalar = match literal {
        Literal::Null => Scalar::Null,
        Literal::Boolean(b) => Scalar::Bool(*b),
        Literal::Integer(n) => Scalar::Int(*n),
        Literal::Float(f) => Scalar::Float(*f),
        Literal::String(s) => Scalar::Text(s.clone()),
        Literal::Date(s) => parse_datetime(s)
            .map(|dt| Scalar::DateTime(datetime_to_days(dt)))
            .ok_or_else(|| Error::ParseError(format!("invalid date literal #{}#", s)))?,
    };
    Ok(scalar)
}

/// Compare two scalars; `None` when either is NULL or they are incomparable
pub fn compare(left: &Scalar, right: &Scalar) -> Option<Ordering> {
    match (left, right) {
        (Scalar::Null, _) | (_, Scalar::Null) => None,
        (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
        (Scalar::Text(a), Scalar::Text(b)) => Some(a.to_lowercase().cmp(&b.to_lowercase())),
        (Scalar::Bytes(a), Scalar::Bytes(b)) => Some(a.cmp(b)),
        (Scalar::DateTime(a), Scalar::Text(s)) => {
            let b = parse_datetime(s).map(datetime_to_days)?;
            a.partial_cmp(&b)
        }
        (Scalar::Text(_), Scalar::DateTime(_)) => compare(right, left).map(Ordering::reverse),
        (a, b) => a.as_number()?.partial_cmp(&b.as_number()?),
    }
}

/// Evaluate an expression to a scalar
pub fn evaluate<F>(expr: &Expr, column: &F) -> Result<Scalar>
where
    F: Fn(&str) -> Result<Scalar>,
{
    match expr {
        Expr::Column(name) => column(name),
        Expr::Literal(literal) => literal_scalar(literal),
        Expr::Nested(inner) => evaluate(inner, column),
        other => Ok(match test(other, column)? {
            Some(b) => Scalar::Bool(b),
            None => Scalar::Null,
        }),
    }
}

/// Evaluate an expression as a condition
pub fn test<F>(expr: &Expr, column: &F) -> Result<Option<bool>>
where
    F: Fn(&str) -> Result<Scalar>,
{
    match expr {
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And => {
                let l = test(left, column)?;
                if l == Some(false) {
                    return Ok(Some(false));
                }
                Ok(match (l, test(right, column)?) {
                    (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                })
            }
            BinaryOperator::Or => {
                let l = test(left, column)?;
                if l == Some(true) {
                    return Ok(Some(true));
                }
                Ok(match (l, test(right, column)?) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                })
            }
            op => {
                let ordering = compare(&evaluate(left, column)?, &evaluate(right, column)?);
                Ok(ordering.map(|o| match op {
                    BinaryOperator::Eq => o == Ordering::Equal,
                    BinaryOperator::Neq => o != Ordering::Equal,
                    BinaryOperator::Lt => o == Ordering::Less,
                    BinaryOperator::Gt => o == Ordering::Greater,
                    BinaryOperator::Lte => o != Ordering::Greater,
                    BinaryOperator::Gte => o != Ordering::Less,
                    BinaryOperator::And | BinaryOperator::Or => false,
                }))
            }
        },
        Expr::Not(inner) => Ok(test(inner, column)?.map(|b| !b)),
        Expr::IsNull(inner) => Ok(Some(evaluate(inner, column)? == Scalar::Null)),
        Expr::IsNotNull(inner) => Ok(Some(evaluate(inner, column)? != Scalar::Null)),
        Expr::Like {
            expr,
            pattern,
            negated,
        } => {
            let text = match evaluate(expr, column)? {
                Scalar::Null => return Ok(None),
                Scalar::Text(s) => s,
                Scalar::Int(n) => n.to_string(),
                Scalar::Float(f) | Scalar::DateTime(f) => f.to_string(),
                Scalar::Bool(b) => (if b { "-1" } else { "0" }).to_string(),
                Scalar::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
            };
            Ok(Some(like(&text, pattern) != *negated))
        }
        Expr::Nested(inner) => test(inner, column),
        Expr::Column(_) | Expr::Literal(_) => Ok(evaluate(expr, column)?.truth()),
    }
}

/// Names of all columns an expression reads
pub fn referenced_columns(expr: &Expr) -> Vec<&str> {
    let mut names = Vec::new();
    collect_columns(expr, &mut names);
    names
}

fn collect_columns<'a>(expr: &'a Expr, names: &mut Vec<&'a str>) {
    match expr {
        Expr::Column(name) => names.push(name),
        Expr::Literal(_) => {}
        Expr::BinaryOp { left, right, .. } => {
            collect_columns(left, names);
            collect_columns(right, names);
        }
        Expr::Not(inner) | Expr::IsNull(inner) | Expr::IsNotNull(inner) | Expr::Nested(inner) => {
            collect_columns(inner, names)
        }
        Expr::Like { expr, .. } => collect_columns(expr, names),
    }
}

/// Match text against a LIKE pattern, ignoring case.
///
/// `%` and `*` match any run of characters, `_` and `?` one character,
/// `#` one digit.
pub fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();

    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%' | '*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some('_' | '?') => {
                t += 1;
                p += 1;
            }
            Some('#') if text[t].is_ascii_digit() => {
                t += 1;
                p += 1;
            }
            Some(c) if *c != '#' && *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| matches!(c, '%' | '*'))
}

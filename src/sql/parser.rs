//! SQL Parser
//!
//! This module parses SQL tokens into an AST.

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::error::{Error, Result};

/// SQL Parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse a single SELECT statement; nothing but a `;` may follow it
    pub fn parse(&mut self) -> Result<SelectStatement> {
        let stmt = self.parse_select()?;

        if self.check(&Token::Semicolon) {
            self.advance();
        }
        if !self.is_at_end() {
            return Err(Error::UnexpectedToken {
                expected: "end of statement".to_string(),
                found: format!("{}", self.current()),
            });
        }

        Ok(stmt)
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let mut stmt = SelectStatement::default();

        if self.check(&Token::Top) {
            self.advance();
            stmt.top = Some(self.expect_count()?);
        }

        stmt.columns = self.parse_select_list()?;

        self.expect(&Token::From)?;
        stmt.table = self.expect_identifier()?;

        if self.check(&Token::Where) {
            self.advance();
            stmt.where_clause = Some(self.parse_expr()?);
        }

        if self.check(&Token::Limit) {
            self.advance();
            stmt.limit = Some(self.expect_count()?);
        }

        Ok(stmt)
    }

    fn parse_select_list(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = Vec::new();

        loop {
            items.push(self.parse_select_item()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        if self.check(&Token::Asterisk) {
            self.advance();
            return Ok(SelectItem::Wildcard);
        }

        if let Token::Identifier(name) = self.current().clone() {
            self.advance();
            let alias = self.parse_alias()?;
            return Ok(SelectItem::Column { name, alias });
        }

        let value = self.parse_literal()?;
        let alias = self.parse_alias()?;
        Ok(SelectItem::Literal { value, alias })
    }

    fn parse_alias(&mut self) -> Result<Option<String>> {
        if self.check(&Token::As) {
            self.advance();
            return self.expect_identifier().map(Some);
        }
        // Alias without AS
        if let Token::Identifier(alias) = self.current().clone() {
            self.advance();
            return Ok(Some(alias));
        }
        Ok(None)
    }

    // ========== Expression Parsing ==========

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_and_expr()?;

        while self.check(&Token::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_not_expr()?;

        while self.check(&Token::And) {
            self.advance();
            let right = self.parse_not_expr()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr> {
        if self.check(&Token::Not) {
            self.advance();
            let expr = self.parse_not_expr()?;
            Ok(Expr::Not(Box::new(expr)))
        } else {
            self.parse_comparison_expr()
        }
    }

    fn parse_comparison_expr(&mut self) -> Result<Expr> {
        let left = self.parse_primary_expr()?;

        // IS NULL / IS NOT NULL
        if self.check(&Token::Is) {
            self.advance();
            let negated = self.check(&Token::Not);
            if negated {
                self.advance();
            }
            self.expect(&Token::Null)?;
            return Ok(if negated {
                Expr::IsNotNull(Box::new(left))
            } else {
                Expr::IsNull(Box::new(left))
            });
        }

        // LIKE / NOT LIKE
        let negated = self.check(&Token::Not) && self.peek() == Some(&Token::Like);
        if negated {
            self.advance();
        }
        if self.check(&Token::Like) {
            self.advance();
            let pattern = match self.current().clone() {
                Token::StringLiteral(s) => {
                    self.advance();
                    s
                }
                other => {
                    return Err(Error::UnexpectedToken {
                        expected: "pattern string".to_string(),
                        found: format!("{}", other),
                    })
                }
            };
            return Ok(Expr::Like {
                expr: Box::new(left),
                pattern,
                negated,
            });
        }

        let op = match self.current() {
            Token::Eq => Some(BinaryOperator::Eq),
            Token::Neq => Some(BinaryOperator::Neq),
            Token::Lt => Some(BinaryOperator::Lt),
            Token::Gt => Some(BinaryOperator::Gt),
            Token::Lte => Some(BinaryOperator::Lte),
            Token::Gte => Some(BinaryOperator::Gte),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let right = self.parse_primary_expr()?;
            Ok(Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            })
        } else {
            Ok(left)
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        match self.current().clone() {
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Nested(Box::new(expr)))
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(Expr::Column(name))
            }
            _ => self.parse_literal().map(Expr::Literal),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let literal = match self.current().clone() {
            Token::IntegerLiteral(n) => Literal::Integer(n),
            Token::FloatLiteral(n) => Literal::Float(n),
            Token::StringLiteral(s) => Literal::String(s),
            Token::DateLiteral(s) => Literal::Date(s),
            Token::True => Literal::Boolean(true),
            Token::False => Literal::Boolean(false),
            Token::Null => Literal::Null,
            other => {
                return Err(Error::UnexpectedToken {
                    expected: "expression".to_string(),
                    found: format!("{}", other),
                })
            }
        };
        self.advance();
        Ok(literal)
    }

    // ========== Helper functions ==========

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position + 1)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(Error::UnexpectedToken {
                expected: format!("{}", token),
                found: format!("{}", self.current()),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(Error::UnexpectedToken {
                expected: "identifier".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    fn expect_count(&mut self) -> Result<u64> {
        match self.current().clone() {
            Token::IntegerLiteral(n) if n >= 0 => {
                self.advance();
                Ok(n as u64)
            }
            _ => Err(Error::UnexpectedToken {
                expected: "row count".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }
}

/// Parse a query string
pub fn parse(sql: &str) -> Result<SelectStatement> {
    Parser::new(sql)?.parse()
}

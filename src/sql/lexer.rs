//! SQL Lexer (Tokenizer)
//!
//! This module converts query text into a stream of tokens. Besides the usual
//! SQL lexemes it accepts the Access spellings: `[bracketed identifiers]` and
//! `#date#` literals.

use super::token::Token;
use crate::error::{Error, Result};

/// SQL Lexer
pub struct Lexer {
    /// Input characters
    input: Vec<char>,
    /// Current position in input
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();

        let Some(ch) = self.current_char() else {
            return Ok(Token::Eof);
        };

        let single = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '*' => Some(Token::Asterisk),
            '=' => Some(Token::Eq),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        match ch {
            '<' => {
                self.advance();
                match self.current_char() {
                    Some('=') => {
                        self.advance();
                        Ok(Token::Lte)
                    }
                    Some('>') => {
                        self.advance();
                        Ok(Token::Neq)
                    }
                    _ => Ok(Token::Lt),
                }
            }
            '>' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    return Ok(Token::Gte);
                }
                Ok(Token::Gt)
            }
            '!' => {
                let start = self.position;
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    return Ok(Token::Neq);
                }
                Err(Error::UnexpectedCharacter('!', start))
            }
            '-' => {
                let start = self.position;
                self.advance();
                match self.current_char() {
                    Some(c) if c.is_ascii_digit() => match self.read_number()? {
                        Token::IntegerLiteral(n) => Ok(Token::IntegerLiteral(-n)),
                        Token::FloatLiteral(n) => Ok(Token::FloatLiteral(-n)),
                        other => Ok(other),
                    },
                    _ => Err(Error::UnexpectedCharacter('-', start)),
                }
            }
            '\'' => self.read_delimited('\'', '\'').map(Token::StringLiteral),
            '"' => self.read_delimited('"', '"').map(Token::Identifier),
            '[' => self.read_delimited('[', ']').map(Token::Identifier),
            '#' => self.read_delimited('#', '#').map(Token::DateLiteral),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_word()),
            c => Err(Error::UnexpectedCharacter(c, self.position)),
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// Skip whitespace and `--` / `/* */` comments
    fn skip_trivia(&mut self) {
        loop {
            while self.current_char().is_some_and(char::is_whitespace) {
                self.advance();
            }

            match (self.current_char(), self.peek_char()) {
                (Some('-'), Some('-')) => {
                    while self.current_char().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.position += 2;
                    while let Some(c) = self.current_char() {
                        if c == '*' && self.peek_char() == Some('/') {
                            self.position += 2;
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    /// Read text between `open` and `close`; a doubled closing delimiter
    /// stands for itself
    fn read_delimited(&mut self, open: char, close: char) -> Result<String> {
        let start = self.position;
        debug_assert_eq!(self.current_char(), Some(open));
        self.advance();

        let mut value = String::new();
        while let Some(ch) = self.current_char() {
            if ch == close {
                if self.peek_char() == Some(close) {
                    value.push(close);
                    self.position += 2;
                    continue;
                }
                self.advance();
                return Ok(value);
            }
            value.push(ch);
            self.advance();
        }

        Err(Error::UnterminatedString(start))
    }

    /// Read a number (integer or float)
    fn read_number(&mut self) -> Result<Token> {
        let start = self.position;
        let mut value = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                value.push(ch);
            } else if ch == '.' && !is_float && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                value.push(ch);
            } else if (ch == 'e' || ch == 'E') && !value.is_empty() {
                is_float = true;
                value.push(ch);
                if let Some(sign @ ('+' | '-')) = self.peek_char() {
                    self.advance();
                    value.push(sign);
                }
            } else {
                break;
            }
            self.advance();
        }

        if is_float {
            value
                .parse::<f64>()
                .map(Token::FloatLiteral)
                .map_err(|_| Error::InvalidNumber(start))
        } else {
            value
                .parse::<i64>()
                .map(Token::IntegerLiteral)
                .map_err(|_| Error::InvalidNumber(start))
        }
    }

    /// Read an identifier or keyword
    fn read_word(&mut self) -> Token {
        let mut value = String::new();
        while let Some(ch) = self.current_char() {
            if !(ch.is_alphanumeric() || ch == '_') {
                break;
            }
            value.push(ch);
            self.advance();
        }

        Token::from_keyword(&value).unwrap_or(Token::Identifier(value))
    }
}

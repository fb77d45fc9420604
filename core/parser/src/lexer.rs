//! FILENAME: core/parser/src/lexer.rs
//! PURPOSE: Scans a raw formula string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, number parsing, string literals, quoted identifiers
//! for sheet names, error literals and multi-character operators like <= and <>.
//! Every token carries the character offset it started at so the parser can
//! report where a formula went wrong.
//!
//! SUPPORTED OPERATORS:
//! - Single char: + - * / ^ & % ( ) , : = < > !
//! - Multi char: <= >= <>
//! - Quoted identifiers: 'Sheet Name'
//! - Error literals: #DIV/0! #VALUE! #REF! #NAME? #N/A #CIRCULAR!

use crate::ast::ERROR_CODES;
use crate::token::{SpannedToken, Token};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.next_spanned().token
    }

    /// Advances the lexer and returns the next token with its start offset.
    pub fn next_spanned(&mut self) -> SpannedToken {
        self.skip_whitespace();
        let position = self.pos;

        let token = match self.bump() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('^') => Token::Caret,
            Some('&') => Token::Ampersand,
            Some('%') => Token::Percent,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some(',') => Token::Comma,
            Some(':') => Token::Colon,
            Some('!') => Token::Exclamation,
            Some('=') => Token::Equals,

            // Handle < and potentially <= or <>
            Some('<') => self.read_less_than_operator(),

            // Handle > and potentially >=
            Some('>') => self.read_greater_than_operator(),

            Some('"') => self.read_string(),

            // Handle single quotes for sheet names with spaces
            Some('\'') => self.read_quoted_identifier(),

            Some('#') => self.read_error_literal(),

            // Handle Numbers (starts with digit or dot)
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),

            // Identifiers, including `$`-prefixed references such as $A$1 or $3
            Some(ch) if is_letter(ch) || ch == '$' => self.read_identifier(ch),

            None => Token::EOF,

            Some(ch) => Token::Illegal(ch),
        };

        SpannedToken { token, position }
    }

    /// Collects every token up to and including EOF.
    pub fn tokenize(mut self) -> Vec<SpannedToken> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_spanned();
            let done = spanned.token == Token::EOF;
            tokens.push(spanned);
            if done {
                return tokens;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    /// Handles operators starting with '<': <, <=, <>
    fn read_less_than_operator(&mut self) -> Token {
        match self.peek() {
            Some('=') => {
                self.pos += 1;
                Token::LessEqual
            }
            Some('>') => {
                self.pos += 1;
                Token::NotEqual
            }
            _ => Token::LessThan,
        }
    }

    /// Handles operators starting with '>': >, >=
    fn read_greater_than_operator(&mut self) -> Token {
        match self.peek() {
            Some('=') => {
                self.pos += 1;
                Token::GreaterEqual
            }
            _ => Token::GreaterThan,
        }
    }

    /// Reads a double-quoted string. A doubled quote ("") is an escaped quote.
    /// An unterminated string is reported as an illegal quote character.
    fn read_string(&mut self) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.bump() {
            if ch == '"' {
                if self.peek() == Some('"') {
                    result.push('"');
                    self.pos += 1;
                    continue;
                }
                return Token::String(result);
            }
            result.push(ch);
        }
        Token::Illegal('"')
    }

    /// Reads a quoted identifier (sheet name with spaces): 'Sheet Name'
    fn read_quoted_identifier(&mut self) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.bump() {
            if ch == '\'' {
                // Escaped single quote ('')
                if self.peek() == Some('\'') {
                    result.push('\'');
                    self.pos += 1;
                } else {
                    return Token::QuotedIdentifier(result);
                }
            } else {
                result.push(ch);
            }
        }
        Token::Illegal('\'')
    }

    /// Matches the longest known error code after the leading '#'.
    fn read_error_literal(&mut self) -> Token {
        for code in ERROR_CODES {
            // Codes are stored with their leading '#'
            let body: Vec<char> = code.chars().skip(1).collect();
            let matches = body.iter().enumerate().all(|(i, expected)| {
                self.peek_at(i)
                    .map(|ch| ch.to_ascii_uppercase() == *expected)
                    .unwrap_or(false)
            });
            if matches {
                self.pos += body.len();
                return Token::Error(code.to_string());
            }
        }
        Token::Illegal('#')
    }

    fn read_number(&mut self, first_char: char) -> Token {
        let mut number_str = String::from(first_char);
        let mut has_dot = first_char == '.';

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.pos += 1;
            } else if ch == '.' && !has_dot {
                has_dot = true;
                number_str.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }

        // Scientific notation: 1e3, 2.5E-4
        if matches!(self.peek(), Some('e') | Some('E')) {
            let digit_at = match self.peek_at(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self.peek_at(digit_at).map_or(false, |c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    if let Some(ch) = self.bump() {
                        number_str.push(ch);
                    }
                }
                while let Some(ch) = self.peek() {
                    if !ch.is_ascii_digit() {
                        break;
                    }
                    number_str.push(ch);
                    self.pos += 1;
                }
            }
        }

        match number_str.parse::<f64>() {
            Ok(n) => Token::Number(n),
            // e.g. a lone "."
            Err(_) => Token::Illegal(first_char),
        }
    }

    fn read_identifier(&mut self, first_char: char) -> Token {
        let mut ident = String::from(first_char);

        while let Some(ch) = self.peek() {
            // '.' supports defined names like "Q1.Sales"; '$' marks absolute parts.
            if is_letter(ch) || ch.is_ascii_digit() || ch == '.' || ch == '$' {
                ident.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }

        match ident.to_uppercase().as_str() {
            "TRUE" => Token::Boolean(true),
            "FALSE" => Token::Boolean(false),
            _ => Token::Identifier(ident.to_uppercase()),
        }
    }
}

/// Returns true if `ch` can start an identifier.
/// Supports: ASCII letters, underscore (for names like _private),
/// and backslash (for Excel-style names like \TaxRate).
fn is_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '\\'
}

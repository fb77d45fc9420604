//! FILENAME: core/parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts a stream of Tokens into an AST.
//! CONTEXT: This is the second stage of the parsing pipeline. It takes tokens
//! from the Lexer and builds an Expression tree that can be evaluated.
//!
//! GRAMMAR:
//!   formula        --> "=" expression EOF
//!   expression     --> comparison
//!   comparison     --> concatenation ( ("=" | "<>" | "<" | ">" | "<=" | ">=") concatenation )*
//!   concatenation  --> additive ( "&" additive )*
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/") unary )*
//!   unary          --> ("-" | "+") unary | power
//!   power          --> postfix ( "^" unary )?
//!   postfix        --> primary "%"*
//!   primary        --> NUMBER | STRING | BOOLEAN | ERROR | reference | name
//!                    | function_call | "(" expression ")"
//!   reference      --> [sheet_prefix] (cell_or_range | column_ref | row_ref)
//!   sheet_prefix   --> (IDENTIFIER | QUOTED_IDENTIFIER) "!"
//!   cell_or_range  --> IDENTIFIER (":" IDENTIFIER)?
//!   column_ref     --> IDENTIFIER ":" IDENTIFIER   // both column-only (e.g., A:B)
//!   row_ref        --> NUMBER ":" NUMBER           // both row-only (e.g., 1:5)
//!   function_call  --> IDENTIFIER "(" arguments? ")"
//!   arguments      --> expression ("," expression)*

use crate::ast::{BinaryOperator, Expression, UnaryOperator, Value};
use crate::functions::BuiltinFunction;
use crate::lexer::Lexer;
use crate::token::{SpannedToken, Token};
use thiserror::Error;

/// The character that marks cell input as a formula.
pub const FORMULA_MARKER: char = '=';

/// Deepest expression tree the parser will build. Parentheses, function
/// calls, prefix operators and each chained binary or percent operator count
/// as one level.
pub const MAX_NESTING: usize = 256;

/// Parser errors with a message and the character offset of the offending token.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[error("Parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// A parsed cell reference split into its parts.
struct CellParts {
    col: String,
    row: u32,
    col_absolute: bool,
    row_absolute: bool,
}

/// The Parser struct holds the token stream and current token state.
pub struct Parser {
    tokens: Vec<SpannedToken>,
    index: usize,
    input_len: usize,
    depth: usize,
}

impl Parser {
    /// Creates a new parser from an input string.
    pub fn new(input: &str) -> Self {
        Parser {
            tokens: Lexer::new(input).tokenize(),
            index: 0,
            input_len: input.chars().count(),
            depth: 0,
        }
    }

    /// Parses the entire input and returns the AST.
    /// The input must start with the formula marker.
    pub fn parse(&mut self) -> ParseResult<Expression> {
        if self.current() != &Token::Equals {
            return Err(ParseError::new(
                format!("Formula must start with '{}'", FORMULA_MARKER),
                self.position(),
            ));
        }
        self.advance();
        self.parse_body()
    }

    /// Parses an expression without a leading marker.
    pub fn parse_expression_only(&mut self) -> ParseResult<Expression> {
        self.parse_body()
    }

    fn parse_body(&mut self) -> ParseResult<Expression> {
        if self.current() == &Token::EOF {
            return Err(ParseError::new("Empty expression", self.position()));
        }

        let expr = self.parse_expression()?;

        // Ensure we consumed all tokens
        if self.current() != &Token::EOF {
            return Err(self.unexpected("after expression"));
        }

        Ok(expr)
    }

    fn current(&self) -> &Token {
        // tokenize() always ends with EOF and advance() never moves past it
        &self.tokens[self.index].token
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.index)
            .map(|t| t.position)
            .unwrap_or(self.input_len)
    }

    fn advance(&mut self) {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
    }

    fn unexpected(&self, context: &str) -> ParseError {
        let message = match self.current() {
            Token::EOF => format!("Unexpected end of formula {}", context),
            Token::Illegal(ch) => format!("Illegal character '{}'", ch),
            token => format!("Unexpected token {} {}", token, context),
        };
        ParseError::new(message, self.position())
    }

    /// Checks if the current token matches the expected token.
    /// If it matches, advances and returns Ok. Otherwise returns an error.
    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("(expected {})", expected)))
        }
    }

    fn descend(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                format!("Formula nested more than {} levels deep", MAX_NESTING),
                self.position(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.descend()?;
        let expr = self.parse_comparison()?;
        self.depth -= 1;
        Ok(expr)
    }

    /// Parses comparison expressions (=, <>, <, >, <=, >=).
    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_concatenation()?;
        let mut nested = 0;

        loop {
            let op = match self.current() {
                Token::Equals => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.advance();
            self.descend()?;
            nested += 1;
            let right = self.parse_concatenation()?;
            left = binary(left, op, right);
        }

        self.depth -= nested;
        Ok(left)
    }

    /// Parses concatenation expressions (&).
    fn parse_concatenation(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_additive()?;
        let mut nested = 0;

        while self.current() == &Token::Ampersand {
            self.advance();
            self.descend()?;
            nested += 1;
            let right = self.parse_additive()?;
            left = binary(left, BinaryOperator::Concat, right);
        }

        self.depth -= nested;
        Ok(left)
    }

    /// Parses additive expressions (+ and -).
    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative()?;
        let mut nested = 0;

        loop {
            let op = match self.current() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.advance();
            self.descend()?;
            nested += 1;
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }

        self.depth -= nested;
        Ok(left)
    }

    /// Parses multiplicative expressions (* and /).
    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary()?;
        let mut nested = 0;

        loop {
            let op = match self.current() {
                Token::Asterisk => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.advance();
            self.descend()?;
            nested += 1;
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }

        self.depth -= nested;
        Ok(left)
    }

    /// Parses prefix unary expressions (negation and unary plus).
    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let op = match self.current() {
            Token::Minus => Some(UnaryOperator::Negate),
            Token::Plus => Some(UnaryOperator::Plus),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            self.descend()?;
            let operand = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expression::UnaryOp {
                op,
                operand: Box::new(operand),
            });
        }

        self.parse_power()
    }

    /// Parses power/exponentiation expressions (^). Right-associative.
    fn parse_power(&mut self) -> ParseResult<Expression> {
        let left = self.parse_postfix()?;

        if self.current() == &Token::Caret {
            self.advance();
            self.descend()?;
            let right = self.parse_unary()?;
            self.depth -= 1;
            return Ok(binary(left, BinaryOperator::Power, right));
        }

        Ok(left)
    }

    /// Parses trailing percent operators (50%, 10%%).
    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_primary()?;
        let mut nested = 0;

        while self.current() == &Token::Percent {
            self.advance();
            self.descend()?;
            nested += 1;
            expr = Expression::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        self.depth -= nested;
        Ok(expr)
    }

    /// Parses primary expressions (literals, cell refs, function calls, parentheses).
    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let start = self.position();

        match self.current().clone() {
            // Number literal - could also be start of row reference (e.g., 1:5)
            Token::Number(n) => {
                self.advance();

                if self.current() == &Token::Colon {
                    return self.parse_row_reference(None, row_number(n, start)?, false, start);
                }

                Ok(Expression::Literal(Value::Number(n)))
            }

            Token::String(s) => {
                self.advance();
                Ok(Expression::Literal(Value::String(s)))
            }

            Token::Boolean(b) => {
                self.advance();
                // TRUE() / FALSE() are also valid function calls
                if self.current() == &Token::LParen {
                    let name = if b { "TRUE" } else { "FALSE" };
                    return self.parse_function_call(name.to_string());
                }
                Ok(Expression::Literal(Value::Boolean(b)))
            }

            Token::Error(code) => {
                self.advance();
                Ok(Expression::Literal(Value::Error(code)))
            }

            // Quoted identifier - must be a sheet reference
            Token::QuotedIdentifier(sheet_name) => {
                self.advance();
                self.expect(Token::Exclamation)?;
                self.parse_sheet_reference(sheet_name)
            }

            // Identifier: could be a cell reference, range, column reference,
            // function call, sheet reference prefix or a defined name
            Token::Identifier(name) => {
                self.advance();

                if self.current() == &Token::Exclamation {
                    self.advance();
                    return self.parse_sheet_reference(name);
                }

                if self.current() == &Token::LParen {
                    return self.parse_function_call(name);
                }

                if self.current() == &Token::Colon {
                    return self.parse_range_or_column_ref(None, name, start);
                }

                if let Some(parts) = split_cell_reference(&name) {
                    return Ok(cell_ref(None, parts));
                }

                if is_row_identifier(&name).is_some() {
                    return Err(ParseError::new(
                        format!("Incomplete row reference: {}", name),
                        start,
                    ));
                }

                if name.contains('$') || has_reference_shape(&name) {
                    return Err(ParseError::new(
                        format!("Invalid reference: {}", name),
                        start,
                    ));
                }

                Ok(Expression::Name(name))
            }

            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }

            _ => Err(self.unexpected("in expression")),
        }
    }

    /// Parses a reference after a sheet prefix (SheetName!).
    fn parse_sheet_reference(&mut self, sheet_name: String) -> ParseResult<Expression> {
        let start = self.position();

        match self.current().clone() {
            // Number - must be a row reference like Sheet1!1:5
            Token::Number(n) => {
                self.advance();
                if self.current() == &Token::Colon {
                    self.parse_row_reference(Some(sheet_name), row_number(n, start)?, false, start)
                } else {
                    Err(ParseError::new(
                        "Expected ':' after row number in sheet reference",
                        self.position(),
                    ))
                }
            }

            Token::Identifier(name) => {
                self.advance();

                if self.current() == &Token::Colon {
                    return self.parse_range_or_column_ref(Some(sheet_name), name, start);
                }

                match split_cell_reference(&name) {
                    Some(parts) => Ok(cell_ref(Some(sheet_name), parts)),
                    None => Err(ParseError::new(
                        format!("Invalid cell reference: {}", name),
                        start,
                    )),
                }
            }

            _ => Err(self.unexpected("after '!'")),
        }
    }

    /// Parses a range, column or row reference after seeing "IDENTIFIER :".
    fn parse_range_or_column_ref(
        &mut self,
        sheet: Option<String>,
        start_identifier: String,
        start_pos: usize,
    ) -> ParseResult<Expression> {
        // `$3:$5` lexes as identifiers; route it to the row-reference path
        if let Some(row) = is_row_identifier(&start_identifier) {
            return self.parse_row_reference(sheet, row, true, start_pos);
        }

        // Consume the ':'
        self.advance();
        let end_pos = self.position();

        let end_identifier = match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                name
            }
            _ => return Err(self.unexpected("after ':' in range reference")),
        };

        if let (Some((start_col, start_abs)), Some((end_col, end_abs))) = (
            split_column_only(&start_identifier),
            split_column_only(&end_identifier),
        ) {
            return Ok(Expression::ColumnRef {
                sheet,
                start_col,
                end_col,
                start_absolute: start_abs,
                end_absolute: end_abs,
            });
        }

        let start = split_cell_reference(&start_identifier).ok_or_else(|| {
            ParseError::new(format!("Invalid cell reference: {}", start_identifier), start_pos)
        })?;
        let end = split_cell_reference(&end_identifier).ok_or_else(|| {
            ParseError::new(format!("Invalid cell reference: {}", end_identifier), end_pos)
        })?;

        Ok(Expression::Range {
            sheet,
            // Sheet is on the Range, not individual cells
            start: Box::new(cell_ref(None, start)),
            end: Box::new(cell_ref(None, end)),
        })
    }

    /// Parses a row reference after seeing "NUMBER :" or "$NUMBER :".
    fn parse_row_reference(
        &mut self,
        sheet: Option<String>,
        start_row: u32,
        start_absolute: bool,
        start_pos: usize,
    ) -> ParseResult<Expression> {
        // Consume the ':'
        self.advance();
        let end_pos = self.position();

        let (end_row, end_absolute) = match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                (row_number(n, end_pos)?, false)
            }
            Token::Identifier(name) => match is_row_identifier(&name) {
                Some(row) => {
                    self.advance();
                    (row, true)
                }
                None => {
                    return Err(ParseError::new(
                        format!("Expected row number after ':', found {}", name),
                        end_pos,
                    ))
                }
            },
            _ => return Err(self.unexpected("after ':' in row reference")),
        };

        if start_row == 0 {
            return Err(ParseError::new("Row numbers must be >= 1", start_pos));
        }

        Ok(Expression::RowRef {
            sheet,
            start_row,
            end_row,
            start_absolute,
            end_absolute,
        })
    }

    /// Parses a function call like SUM(A1, A2, 10).
    fn parse_function_call(&mut self, name: String) -> ParseResult<Expression> {
        // Consume the '('
        self.advance();

        let func = BuiltinFunction::from_name(&name);
        let mut args = Vec::new();

        if self.current() == &Token::RParen {
            self.advance();
            return Ok(Expression::FunctionCall { func, args });
        }

        args.push(self.parse_expression()?);

        while self.current() == &Token::Comma {
            self.advance();
            args.push(self.parse_expression()?);
        }

        self.expect(Token::RParen)?;

        Ok(Expression::FunctionCall { func, args })
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn cell_ref(sheet: Option<String>, parts: CellParts) -> Expression {
    Expression::CellRef {
        sheet,
        col: parts.col,
        row: parts.row,
        col_absolute: parts.col_absolute,
        row_absolute: parts.row_absolute,
    }
}

/// Converts a lexed number into a 1-based row number.
fn row_number(n: f64, position: usize) -> ParseResult<u32> {
    if n.fract() != 0.0 || n < 1.0 || n > u32::MAX as f64 {
        return Err(ParseError::new(format!("Invalid row number: {}", n), position));
    }
    Ok(n as u32)
}

/// Recognizes `$5` style row identifiers and returns the row number.
fn is_row_identifier(identifier: &str) -> Option<u32> {
    let digits = identifier.strip_prefix('$')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().filter(|row| *row >= 1)
}

/// True for identifiers shaped like LETTERS DIGITS (`A0`, `ABCDEFGH1`) that
/// still failed to split into a usable cell reference.
fn has_reference_shape(identifier: &str) -> bool {
    let letters = identifier
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .count();
    let rest = &identifier[letters..];
    letters > 0 && !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

/// Recognizes column-only identifiers (`A`, `$AB`).
fn split_column_only(identifier: &str) -> Option<(String, bool)> {
    let (absolute, rest) = match identifier.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, identifier),
    };
    if rest.is_empty() || rest.len() > 7 || !rest.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((rest.to_uppercase(), absolute))
}

/// Splits a reference like "A1", "$A$1" or "AA100" into its parts.
/// Returns None when the identifier is not shaped like a cell reference,
/// which lets the caller treat it as a defined name instead.
fn split_cell_reference(identifier: &str) -> Option<CellParts> {
    let mut chars = identifier.chars().peekable();

    let col_absolute = chars.peek() == Some(&'$');
    if col_absolute {
        chars.next();
    }

    let mut col = String::new();
    while let Some(&ch) = chars.peek() {
        if ch.is_ascii_alphabetic() {
            col.push(ch);
            chars.next();
        } else {
            break;
        }
    }

    let row_absolute = chars.peek() == Some(&'$');
    if row_absolute {
        chars.next();
    }

    let row_str: String = chars.collect();

    // Columns beyond 7 letters would overflow u32 column indices
    if col.is_empty() || col.len() > 7 || row_str.is_empty() {
        return None;
    }
    if !row_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let row: u32 = row_str.parse().ok()?;
    if row == 0 {
        return None;
    }

    Some(CellParts {
        col: col.to_uppercase(),
        row,
        col_absolute,
        row_absolute,
    })
}

/// Convenience function to parse a formula string directly.
/// The input must begin with the formula marker (`=`).
pub fn parse(input: &str) -> ParseResult<Expression> {
    let mut parser = Parser::new(input);
    parser.parse()
}

/// Returns true if a raw cell input should be treated as a formula.
pub fn is_formula(input: &str) -> bool {
    input.starts_with(FORMULA_MARKER) && input.chars().count() > 1
}

//! Recursive descent parser for filter expressions.

use std::collections::BTreeSet;

use super::ast::{CompareOp, Expr, Value};
use super::error::{ParseError, ParseResult};
use super::lexer::{FilterToken, Lexer, LexerResult, PositionedToken};

/// Deepest parenthesis nesting accepted, counting `HAVING` groups.
pub const MAX_NESTING: usize = 256;

/// Out-of-band facts gathered while parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseMeta {
    /// Columns written with `IN LIST` / `NOT IN LIST`.
    pub list_columns: BTreeSet<String>,
}

/// A parsed filter: the tree plus its metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    /// The root of the tree. Always an [`Expr::And`], possibly empty.
    pub expr: Expr,
    /// Metadata that does not live on tree nodes.
    pub meta: ParseMeta,
}

/// Parser for filter expressions.
///
/// # Grammar
///
/// ```text
/// expression ::= or_expr
/// or_expr    ::= and_expr (OR and_expr)*
/// and_expr   ::= primary (AND primary)*
/// primary    ::= "(" expression ")" | condition
/// condition  ::= column in_op "(" value ("," value)* ")"
///              | column like_op string
///              | column HAVING "(" expression ")"
///              | operand cmp_op operand
/// in_op      ::= (IN | NIN | NOT IN) [LIST]
/// like_op    ::= LIKE | NLIKE | NOT LIKE
/// cmp_op     ::= EQ | NEQ | GT | GTE | LT | LTE
/// column     ::= word | 'single quoted' | "double quoted"
/// value      ::= 'single quoted' | number
/// ```
///
/// Keywords are case-insensitive and only recognized in operator position.
///
/// # Operator Precedence (highest to lowest)
///
/// 1. `AND` - n-ary, flattened
/// 2. `OR` - n-ary, flattened
///
/// # Example
///
/// ```
/// use filter_expr_rs::{Expr, FilterParser, Value};
///
/// let parsed = FilterParser::parse("country IN ('US','CA')").unwrap();
/// assert_eq!(
///     parsed.expr,
///     Expr::and([Expr::in_set("country", vec![Value::from("US"), Value::from("CA")])])
/// );
///
/// // Empty text is the empty filter, not an error.
/// assert!(FilterParser::parse("   ").unwrap().expr.is_empty());
/// ```
pub struct FilterParser<'a> {
    input: &'a str,
    tokens: Vec<PositionedToken>,
    position: usize,
    depth: usize,
    list_columns: BTreeSet<String>,
}

/// Left-hand side of a condition before the operator decides what it is.
enum Operand {
    Column(String),
    Quoted(String),
    Number(Value, String),
}

impl<'a> FilterParser<'a> {
    /// Parses filter text into a tree rooted at an `And`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] describing the first problem found, with a
    /// window of the input text around it.
    pub fn parse(input: &'a str) -> ParseResult<Parsed> {
        if input.trim().is_empty() {
            return Ok(Parsed::default());
        }

        let LexerResult { tokens, errors } = Lexer::new(input).tokenize_with_errors();
        if let Some(err) = errors.into_iter().next() {
            return Err(err.into_parse_error(input));
        }

        let mut parser = Self {
            input,
            tokens,
            position: 0,
            depth: 0,
            list_columns: BTreeSet::new(),
        };
        let expr = parser.parse_expression()?;

        // Check that we consumed all tokens
        if let Some(remaining) = parser.peek() {
            return Err(parser.unexpected(remaining));
        }

        Ok(Parsed {
            expr: expr.into_root(),
            meta: ParseMeta {
                list_columns: parser.list_columns,
            },
        })
    }

    fn peek(&self) -> Option<&PositionedToken> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<PositionedToken> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn check(&self, expected: &FilterToken) -> bool {
        self.peek().map(|t| &t.token) == Some(expected)
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.token.is_keyword(keyword))
    }

    fn unexpected(&self, token: &PositionedToken) -> ParseError {
        ParseError::unexpected_token(token.token.describe(), token.position, self.input)
    }

    /// Consumes the next token, failing at end of input.
    fn expect_any(&mut self) -> ParseResult<PositionedToken> {
        self.advance()
            .ok_or_else(|| ParseError::unexpected_end(self.input))
    }

    /// Consumes the next token if it equals `expected`.
    fn expect(&mut self, expected: &FilterToken) -> ParseResult<PositionedToken> {
        let token = self.expect_any()?;
        if &token.token == expected {
            Ok(token)
        } else {
            Err(self.unexpected(&token))
        }
    }

    /// Consumes a closing parenthesis for the one opened at `open_position`.
    fn expect_close(&mut self, open_position: usize) -> ParseResult<()> {
        match self.advance() {
            Some(PositionedToken {
                token: FilterToken::CloseParen,
                ..
            }) => Ok(()),
            Some(other) => Err(self.unexpected(&other)),
            None => Err(ParseError::unclosed_parenthesis(open_position, self.input)),
        }
    }

    /// Parses the top-level expression (OR expression).
    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_or_expr()
    }

    /// Parses OR expressions: `and_expr (OR and_expr)*`
    fn parse_or_expr(&mut self) -> ParseResult<Expr> {
        let first = self.parse_and_expr()?;
        if !self.check_keyword("OR") {
            return Ok(first);
        }

        let mut operands = vec![first];
        while self.check_keyword("OR") {
            self.advance(); // consume OR
            operands.push(self.parse_and_expr()?);
        }
        Ok(Expr::or(operands))
    }

    /// Parses AND expressions: `primary (AND primary)*`
    fn parse_and_expr(&mut self) -> ParseResult<Expr> {
        let first = self.parse_primary()?;
        if !self.check_keyword("AND") {
            return Ok(first);
        }

        let mut operands = vec![first];
        while self.check_keyword("AND") {
            self.advance(); // consume AND
            operands.push(self.parse_primary()?);
        }
        Ok(Expr::and(operands))
    }

    /// Parses primary expressions: `"(" expression ")" | condition`
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.peek() else {
            return Err(ParseError::unexpected_end(self.input));
        };

        if token.token == FilterToken::OpenParen {
            let open_position = token.position;
            self.advance(); // consume '('
            return self.parse_nested(open_position);
        }

        self.parse_condition()
    }

    /// Parses a single condition: membership, pattern, having or comparison.
    fn parse_condition(&mut self) -> ParseResult<Expr> {
        let first = self.expect_any()?;
        let start = first.position;
        let operand = match first.token {
            FilterToken::Word(word) => Operand::Column(word),
            FilterToken::DoubleQuoted(name) => Operand::Column(name),
            FilterToken::SingleQuoted(text) => Operand::Quoted(text),
            FilterToken::Number(ref text) => Operand::Number(self.number(text, start)?, text.clone()),
            _ => return Err(self.unexpected(&first)),
        };

        let op_token = self.expect_any()?;
        let FilterToken::Word(keyword) = &op_token.token else {
            return Err(self.unexpected(&op_token));
        };

        match keyword.to_ascii_uppercase().as_str() {
            "IN" => {
                let column = self.column(operand, start)?;
                self.parse_in(column, false)
            }
            "NIN" => {
                let column = self.column(operand, start)?;
                self.parse_in(column, true)
            }
            "NOT" => {
                let column = self.column(operand, start)?;
                let next = self.expect_any()?;
                if next.token.is_keyword("IN") {
                    self.parse_in(column, true)
                } else if next.token.is_keyword("LIKE") {
                    self.parse_like(column, true)
                } else {
                    Err(self.unexpected(&next))
                }
            }
            "LIKE" => {
                let column = self.column(operand, start)?;
                self.parse_like(column, false)
            }
            "NLIKE" => {
                let column = self.column(operand, start)?;
                self.parse_like(column, true)
            }
            "HAVING" => {
                let column = self.column(operand, start)?;
                self.parse_having(column)
            }
            other => match CompareOp::from_keyword(other) {
                Some(op) => self.parse_compare(operand, op, start),
                None => Err(self.unexpected(&op_token)),
            },
        }
    }

    /// Requires the left operand to be a column name.
    fn column(&self, operand: Operand, start: usize) -> ParseResult<String> {
        match operand {
            Operand::Column(name) | Operand::Quoted(name) => Ok(name),
            Operand::Number(_, text) => {
                Err(ParseError::unexpected_token(text, start, self.input))
            }
        }
    }

    /// Parses `[LIST] "(" value ("," value)* ")"` after an IN operator.
    fn parse_in(&mut self, column: String, exclude: bool) -> ParseResult<Expr> {
        if self.check_keyword("LIST") {
            self.advance(); // consume LIST
            self.list_columns.insert(column.clone());
        }

        let open = self.expect(&FilterToken::OpenParen)?;
        let mut values = vec![self.parse_value()?];
        while self.check(&FilterToken::Comma) {
            self.advance(); // consume ','
            values.push(self.parse_value()?);
        }
        self.expect_close(open.position)?;

        Ok(Expr::In {
            column,
            values,
            exclude,
        })
    }

    /// Parses the pattern after a LIKE operator.
    fn parse_like(&mut self, column: String, exclude: bool) -> ParseResult<Expr> {
        let token = self.expect_any()?;
        match token.token {
            FilterToken::SingleQuoted(pattern) => Ok(Expr::Like {
                column,
                pattern,
                exclude,
            }),
            _ => Err(self.unexpected(&token)),
        }
    }

    /// Parses `"(" expression ")"` after a HAVING keyword.
    fn parse_having(&mut self, column: String) -> ParseResult<Expr> {
        let open = self.expect(&FilterToken::OpenParen)?;
        let condition = self.parse_nested(open.position)?;
        Ok(Expr::having(column, condition))
    }

    /// Parses an expression and its closing parenthesis, the opening one
    /// at `open_position` having been consumed.
    fn parse_nested(&mut self, open_position: usize) -> ParseResult<Expr> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::nesting_too_deep(open_position, self.input));
        }
        self.depth += 1;
        let inner = self.parse_expression();
        self.depth -= 1;
        let inner = inner?;
        self.expect_close(open_position)?;
        Ok(inner)
    }

    /// Parses the right operand of a comparison.
    fn parse_compare(&mut self, left: Operand, op: CompareOp, start: usize) -> ParseResult<Expr> {
        let right_token = self.expect_any()?;
        let right = match right_token.token {
            FilterToken::Word(ref name) | FilterToken::DoubleQuoted(ref name) => {
                Expr::Identifier(name.clone())
            }
            FilterToken::SingleQuoted(ref text) => Expr::Literal(Value::String(text.clone())),
            FilterToken::Number(ref text) => Expr::Literal(self.number(text, right_token.position)?),
            _ => return Err(self.unexpected(&right_token)),
        };

        let left = match left {
            Operand::Column(name) | Operand::Quoted(name) => Expr::Identifier(name),
            Operand::Number(value, _) => Expr::Literal(value),
        };

        if left.as_identifier().is_none() && right.as_identifier().is_none() {
            return Err(ParseError::missing_column(start, self.input));
        }

        Ok(Expr::compare(op, left, right))
    }

    /// Parses a single literal inside a value list.
    fn parse_value(&mut self) -> ParseResult<Value> {
        let token = self.expect_any()?;
        match token.token {
            FilterToken::SingleQuoted(text) => Ok(Value::String(text)),
            FilterToken::Number(ref text) => self.number(text, token.position),
            _ => Err(self.unexpected(&token)),
        }
    }

    /// Converts number text to a value. Integers that overflow `i64` are
    /// kept as floats.
    fn number(&self, text: &str, position: usize) -> ParseResult<Value> {
        if !text.contains('.') {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::Integer(i));
            }
        }
        text.parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ParseError::unexpected_token(text, position, self.input))
    }
}

/// Parses filter text. Shorthand for [`FilterParser::parse`].
pub fn parse(input: &str) -> ParseResult<Parsed> {
    FilterParser::parse(input)
}

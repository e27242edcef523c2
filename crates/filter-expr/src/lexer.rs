//! Lexer (tokenizer) for filter expressions.
//!
//! Keywords are not recognized here: every bare word comes out as
//! [`FilterToken::Word`] and the parser decides from its position whether it
//! is an operator or a column name. That keeps columns such as `and` or
//! `like` usable without quoting.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::ParseError;

/// What went wrong while tokenizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// A character that cannot start any token.
    UnexpectedCharacter(char),
    /// A quoted string that runs to the end of input.
    UnterminatedString,
    /// A backslash escape that is not recognized.
    InvalidEscape,
}

/// Error encountered during lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerError {
    /// The kind of failure.
    pub kind: LexerErrorKind,
    /// The position (0-indexed byte offset) where the error occurred.
    pub position: usize,
}

impl LexerError {
    /// Converts this error into a [`ParseError`] with a window of `input`.
    pub fn into_parse_error(self, input: &str) -> ParseError {
        match self.kind {
            LexerErrorKind::UnexpectedCharacter(c) => {
                ParseError::unexpected_character(c, self.position, input)
            }
            LexerErrorKind::UnterminatedString => {
                ParseError::unterminated_string(self.position, input)
            }
            LexerErrorKind::InvalidEscape => ParseError::invalid_escape(self.position, input),
        }
    }
}

/// Result of tokenizing a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerResult {
    /// The tokens successfully read, with their positions.
    pub tokens: Vec<PositionedToken>,
    /// Any errors encountered.
    pub errors: Vec<LexerError>,
}

/// A token with its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedToken {
    /// The token.
    pub token: FilterToken,
    /// The byte position where the token starts (0-indexed).
    pub position: usize,
}

/// A token in a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterToken {
    /// A bare word matching `[A-Za-z][A-Za-z0-9_]*`.
    Word(String),

    /// A single-quoted string, unescaped.
    SingleQuoted(String),

    /// A double-quoted string, unescaped. Always a column name.
    DoubleQuoted(String),

    /// A signed integer or decimal, as written.
    Number(String),

    /// Opening parenthesis `(`.
    OpenParen,

    /// Closing parenthesis `)`.
    CloseParen,

    /// Value separator `,`.
    Comma,
}

impl FilterToken {
    /// Returns a short rendering for error messages.
    pub fn describe(&self) -> String {
        match self {
            FilterToken::Word(w) => w.clone(),
            FilterToken::SingleQuoted(s) => format!("'{s}'"),
            FilterToken::DoubleQuoted(s) => format!("\"{s}\""),
            FilterToken::Number(n) => n.clone(),
            FilterToken::OpenParen => "(".to_string(),
            FilterToken::CloseParen => ")".to_string(),
            FilterToken::Comma => ",".to_string(),
        }
    }

    /// Returns `true` if this is a bare word equal to `keyword`, ignoring case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, FilterToken::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}

/// Lexer for tokenizing filter expressions.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    /// Current byte position in the input string.
    position: usize,
    /// Errors encountered during tokenization.
    errors: Vec<LexerError>,
    /// Set once an unterminated string swallowed the rest of the input.
    exhausted: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
            errors: Vec::new(),
            exhausted: false,
        }
    }

    /// Tokenizes the whole input, collecting errors instead of stopping.
    pub fn tokenize_with_errors(mut self) -> LexerResult {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        LexerResult {
            tokens,
            errors: self.errors,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next();
        if let Some(ch) = c {
            self.position += ch.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.next_char();
            } else {
                break;
            }
        }
    }

    /// Reads a bare word. The first character has already been checked.
    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.next_char();
            } else {
                break;
            }
        }
        word
    }

    /// Reads `[+-]?digits(.digits)?`. Returns `None` if no digit follows
    /// the sign or the decimal point.
    fn read_number(&mut self) -> Option<String> {
        let mut text = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            text.push(sign);
            self.next_char();
        }
        if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return None;
        }
        self.push_digits(&mut text);

        if self.peek() == Some('.') {
            text.push('.');
            self.next_char();
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return None;
            }
            self.push_digits(&mut text);
        }
        Some(text)
    }

    fn push_digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.next_char();
            } else {
                break;
            }
        }
    }

    /// Reads a quoted string, resolving backslash escapes.
    ///
    /// Accepts `\\`, `\'`, `\"`, `\/`, `\b`, `\f`, `\n`, `\r`, `\t` and
    /// `\uXXXX`.
    fn read_quoted(&mut self, quote: char) -> Result<String, LexerError> {
        let start = self.position;
        self.next_char();

        let mut result = String::new();
        loop {
            let escape_at = self.position;
            match self.next_char() {
                None => {
                    return Err(LexerError {
                        kind: LexerErrorKind::UnterminatedString,
                        position: start,
                    })
                }
                Some(c) if c == quote => return Ok(result),
                Some('\\') => {
                    let escaped = self.read_escape().ok_or(LexerError {
                        kind: LexerErrorKind::InvalidEscape,
                        position: escape_at,
                    })?;
                    result.push(escaped);
                }
                Some(c) => result.push(c),
            }
        }
    }

    fn read_escape(&mut self) -> Option<char> {
        match self.next_char()? {
            c @ ('\\' | '\'' | '"' | '/') => Some(c),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'u' => {
                let mut code = 0u32;
                for _ in 0..4 {
                    let digit = self.next_char()?.to_digit(16)?;
                    code = code * 16 + digit;
                }
                char::from_u32(code)
            }
            _ => None,
        }
    }

    /// Returns the next token with its position, or None if at end of input.
    ///
    /// Characters that cannot start a token are recorded as errors and
    /// skipped.
    pub fn next_token(&mut self) -> Option<PositionedToken> {
        loop {
            if self.exhausted {
                return None;
            }
            self.skip_whitespace();

            let c = self.peek()?;
            let token_start = self.position;
            let positioned = |token| PositionedToken {
                token,
                position: token_start,
            };

            match c {
                '(' => {
                    self.next_char();
                    return Some(positioned(FilterToken::OpenParen));
                }
                ')' => {
                    self.next_char();
                    return Some(positioned(FilterToken::CloseParen));
                }
                ',' => {
                    self.next_char();
                    return Some(positioned(FilterToken::Comma));
                }

                '\'' | '"' => match self.read_quoted(c) {
                    Ok(text) if c == '\'' => {
                        return Some(positioned(FilterToken::SingleQuoted(text)))
                    }
                    Ok(text) => return Some(positioned(FilterToken::DoubleQuoted(text))),
                    Err(err) => {
                        let unterminated = err.kind == LexerErrorKind::UnterminatedString;
                        self.errors.push(err);
                        if unterminated {
                            self.exhausted = true;
                            return None;
                        }
                        self.skip_to_quote(c);
                    }
                },

                _ if c.is_ascii_alphabetic() => {
                    let word = self.read_word();
                    return Some(positioned(FilterToken::Word(word)));
                }

                _ if c.is_ascii_digit() || c == '+' || c == '-' => {
                    if let Some(text) = self.read_number() {
                        return Some(positioned(FilterToken::Number(text)));
                    }
                    // Report the character that broke the number.
                    let error_pos = self.position;
                    let character = self.next_char().unwrap_or(c);
                    self.errors.push(LexerError {
                        kind: LexerErrorKind::UnexpectedCharacter(character),
                        position: error_pos,
                    });
                }

                _ => {
                    let error_pos = self.position;
                    self.next_char();
                    self.errors.push(LexerError {
                        kind: LexerErrorKind::UnexpectedCharacter(c),
                        position: error_pos,
                    });
                }
            }
        }
    }

    /// Skips past the closing quote after a bad escape so lexing can resume.
    fn skip_to_quote(&mut self, quote: char) {
        while let Some(c) = self.next_char() {
            if c == quote {
                return;
            }
        }
        self.exhausted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<FilterToken> {
        Lexer::new(input)
            .tokenize_with_errors()
            .tokens
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_tokenize_in_expression() {
        assert_eq!(
            tokens("country IN ('US','CA')"),
            vec![
                FilterToken::Word("country".into()),
                FilterToken::Word("IN".into()),
                FilterToken::OpenParen,
                FilterToken::SingleQuoted("US".into()),
                FilterToken::Comma,
                FilterToken::SingleQuoted("CA".into()),
                FilterToken::CloseParen,
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            tokens("-12 +3 4.50"),
            vec![
                FilterToken::Number("-12".into()),
                FilterToken::Number("+3".into()),
                FilterToken::Number("4.50".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_escapes() {
        assert_eq!(
            tokens(r"'it\'s' 'a\\b' 'x\ny' 'A'"),
            vec![
                FilterToken::SingleQuoted("it's".into()),
                FilterToken::SingleQuoted("a\\b".into()),
                FilterToken::SingleQuoted("x\ny".into()),
                FilterToken::SingleQuoted("A".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_double_quoted_column() {
        assert_eq!(
            tokens(r#""my col" IN ('a')"#)[0],
            FilterToken::DoubleQuoted("my col".into())
        );
    }

    #[test]
    fn test_positions_are_byte_offsets() {
        let result = Lexer::new("é IN").tokenize_with_errors();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].position, 0);
        assert_eq!(result.tokens[0].position, 3);
    }

    #[test]
    fn test_unknown_character_is_collected() {
        let result = Lexer::new("a = 'b'").tokenize_with_errors();
        assert_eq!(result.tokens.len(), 2);
        assert_eq!(
            result.errors,
            vec![LexerError {
                kind: LexerErrorKind::UnexpectedCharacter('='),
                position: 2,
            }]
        );
    }

    #[test]
    fn test_unterminated_string_stops_lexing() {
        let result = Lexer::new("a IN ('b").tokenize_with_errors();
        assert_eq!(result.tokens.len(), 3);
        assert_eq!(result.errors[0].kind, LexerErrorKind::UnterminatedString);
        assert_eq!(result.errors[0].position, 6);
    }

    #[test]
    fn test_invalid_escape() {
        let result = Lexer::new(r"'a\qb' x").tokenize_with_errors();
        assert_eq!(result.errors[0].kind, LexerErrorKind::InvalidEscape);
        assert_eq!(result.errors[0].position, 2);
        assert_eq!(result.tokens, vec![PositionedToken {
            token: FilterToken::Word("x".into()),
            position: 7,
        }]);
    }

    #[test]
    fn test_keyword_check_is_case_insensitive() {
        assert!(FilterToken::Word("nIn".into()).is_keyword("NIN"));
        assert!(!FilterToken::SingleQuoted("in".into()).is_keyword("IN"));
    }
}

//! Error types for the filter parser.

use thiserror::Error;

/// A specialized Result type for filter parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum number of characters kept in an error's text window.
const FRAGMENT_WIDTH: usize = 24;

/// Errors that can occur while parsing filter text.
///
/// Every variant carries a short window of the input around the failure so
/// callers can point the user at the offending text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A character that cannot start any token.
    #[error("unexpected character '{character}' at position {position} near \"{fragment}\"")]
    UnexpectedCharacter {
        character: char,
        position: usize,
        fragment: String,
    },

    /// A token that is valid on its own but not where it appears.
    #[error("unexpected '{token}' at position {position} near \"{fragment}\"")]
    UnexpectedToken {
        token: String,
        position: usize,
        fragment: String,
    },

    /// The input ended in the middle of an expression.
    #[error("unexpected end of expression after \"{fragment}\"")]
    UnexpectedEndOfInput { fragment: String },

    /// An opening parenthesis without a matching closing one.
    #[error("unclosed parenthesis at position {position} near \"{fragment}\"")]
    UnclosedParenthesis { position: usize, fragment: String },

    /// A quoted string without its closing quote.
    #[error("unterminated string at position {position} near \"{fragment}\"")]
    UnterminatedString { position: usize, fragment: String },

    /// A backslash followed by a character that is not a known escape.
    #[error("invalid escape sequence at position {position} near \"{fragment}\"")]
    InvalidEscape { position: usize, fragment: String },

    /// A comparison where neither side names a column.
    #[error("comparison at position {position} has no column near \"{fragment}\"")]
    MissingColumn { position: usize, fragment: String },

    /// Parentheses nested deeper than the parser accepts.
    #[error("parentheses nested too deeply at position {position} near \"{fragment}\"")]
    NestingTooDeep { position: usize, fragment: String },
}

impl ParseError {
    /// Creates an unexpected character error.
    pub fn unexpected_character(character: char, position: usize, input: &str) -> Self {
        ParseError::UnexpectedCharacter {
            character,
            position,
            fragment: window(input, position),
        }
    }

    /// Creates an unexpected token error.
    pub fn unexpected_token(token: impl Into<String>, position: usize, input: &str) -> Self {
        ParseError::UnexpectedToken {
            token: token.into(),
            position,
            fragment: window(input, position),
        }
    }

    /// Creates an unexpected end of input error.
    pub fn unexpected_end(input: &str) -> Self {
        ParseError::UnexpectedEndOfInput {
            fragment: tail(input),
        }
    }

    /// Creates an unclosed parenthesis error.
    pub fn unclosed_parenthesis(position: usize, input: &str) -> Self {
        ParseError::UnclosedParenthesis {
            position,
            fragment: window(input, position),
        }
    }

    /// Creates an unterminated string error.
    pub fn unterminated_string(position: usize, input: &str) -> Self {
        ParseError::UnterminatedString {
            position,
            fragment: window(input, position),
        }
    }

    /// Creates an invalid escape error.
    pub fn invalid_escape(position: usize, input: &str) -> Self {
        ParseError::InvalidEscape {
            position,
            fragment: window(input, position),
        }
    }

    /// Creates a missing column error.
    pub fn missing_column(position: usize, input: &str) -> Self {
        ParseError::MissingColumn {
            position,
            fragment: window(input, position),
        }
    }

    /// Creates a nesting depth error.
    pub fn nesting_too_deep(position: usize, input: &str) -> Self {
        ParseError::NestingTooDeep {
            position,
            fragment: window(input, position),
        }
    }

    /// Returns the window of input text around the failure.
    pub fn fragment(&self) -> &str {
        match self {
            ParseError::UnexpectedCharacter { fragment, .. }
            | ParseError::UnexpectedToken { fragment, .. }
            | ParseError::UnexpectedEndOfInput { fragment }
            | ParseError::UnclosedParenthesis { fragment, .. }
            | ParseError::UnterminatedString { fragment, .. }
            | ParseError::InvalidEscape { fragment, .. }
            | ParseError::MissingColumn { fragment, .. }
            | ParseError::NestingTooDeep { fragment, .. } => fragment,
        }
    }

    /// Returns the byte offset of the failure, when one is known.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::UnexpectedEndOfInput { .. } => None,
            ParseError::UnexpectedCharacter { position, .. }
            | ParseError::UnexpectedToken { position, .. }
            | ParseError::UnclosedParenthesis { position, .. }
            | ParseError::UnterminatedString { position, .. }
            | ParseError::InvalidEscape { position, .. }
            | ParseError::MissingColumn { position, .. }
            | ParseError::NestingTooDeep { position, .. } => Some(*position),
        }
    }
}

/// Returns up to [`FRAGMENT_WIDTH`] characters starting at `position`.
fn window(input: &str, position: usize) -> String {
    let start = floor_char_boundary(input, position.min(input.len()));
    input[start..].chars().take(FRAGMENT_WIDTH).collect()
}

/// Returns the last [`FRAGMENT_WIDTH`] characters of the input.
fn tail(input: &str) -> String {
    let count = input.chars().count();
    input
        .chars()
        .skip(count.saturating_sub(FRAGMENT_WIDTH))
        .collect()
}

fn floor_char_boundary(input: &str, mut index: usize) -> usize {
    while index > 0 && !input.is_char_boundary(index) {
        index -= 1;
    }
    index
}

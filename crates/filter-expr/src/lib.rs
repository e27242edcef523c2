//! Filter expression engine for dashboard filters.
//!
//! This crate parses the compact, URL-safe filter text used to persist
//! dashboard filters, renders trees back to canonical text, and provides the
//! structural edits a filter bar performs on them.
//!
//! # Supported Syntax
//!
//! ## Membership
//! - `country IN ('US','CA')` - value is one of the list
//! - `country NIN ('US')`, `country NOT IN ('US')` - value is none of the list
//! - `country IN LIST ('US','CA')` - same as `IN`, edited as a pasted list
//!
//! ## Pattern
//! - `city LIKE '%san%'`, `city NLIKE '%san%'`, `city NOT LIKE '%san%'`
//!
//! ## Comparison
//! - `revenue GT 100` with `EQ`, `NEQ`, `GT`, `GTE`, `LT`, `LTE`
//!
//! ## Aggregate condition
//! - `country HAVING (revenue GT 100)`
//!
//! ## Boolean Operators
//! - `AND` binds tighter than `OR`
//! - `()` - Grouping
//!
//! Columns are bare words (`[A-Za-z][A-Za-z0-9_]*`) or quoted. Keywords are
//! case-insensitive.
//!
//! # Example
//!
//! ```
//! use filter_expr_rs::{parse, serialize, toggle_value, SerializeOptions, ToggleOptions, Value};
//!
//! let parsed = parse("'country' IN ('US','CA')").unwrap();
//! let options = SerializeOptions {
//!     list_columns: parsed.meta.list_columns.clone(),
//! };
//! assert_eq!(serialize(&parsed.expr, &options), "country IN ('US','CA')");
//!
//! let edited = toggle_value(&parsed.expr, "country", &Value::from("US"), ToggleOptions::default());
//! assert_eq!(serialize(&edited, &options), "country IN ('CA')");
//! ```

mod ast;
mod error;
mod lexer;
mod mutate;
mod parser;
mod serializer;
mod threshold;

pub use ast::{CompareOp, Expr, Value};
pub use error::{ParseError, ParseResult};
pub use lexer::{FilterToken, Lexer, LexerError, LexerErrorKind, LexerResult, PositionedToken};
pub use mutate::{
    apply_contains_mode, apply_in_list_mode, contains_pattern, find_dimension_filter,
    remove_filter, root_children, search_text, toggle_exclude_mode, toggle_value, toggle_values,
    ToggleOptions,
};
pub use parser::{parse, FilterParser, ParseMeta, Parsed, MAX_NESTING};
pub use serializer::{is_bare_identifier, serialize, SerializeOptions};
pub use threshold::{
    find_threshold, merge_where, move_threshold, remove_threshold, set_threshold, split_where,
    ThresholdEntry, ThresholdGroup,
};

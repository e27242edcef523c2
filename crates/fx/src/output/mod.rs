//! Output formatting utilities for the fx CLI.
//!
//! - [`display`] - Merged filter bar (show)
//! - [`expr`] - Parsed expressions (parse, format)
//! - [`update`] - Results of editing commands
//! - [`helpers`] - Common formatting utilities (truncation, filter summaries)

mod display;
mod expr;
pub mod helpers;
mod update;

pub use display::{format_display_json, format_display_table};
pub use expr::{canonical_text, format_parsed_json, format_parsed_table};
pub use update::{format_action_json, format_action_table, ActionResult};

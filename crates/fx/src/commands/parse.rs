//! Parse and format commands.
//!
//! Both work on filter text alone and need no catalog or session.

use filter_expr_rs::parse;

use super::{CommandContext, Result};
use crate::output::{canonical_text, format_parsed_json, format_parsed_table};

/// Parses `text` and prints its canonical form and tree.
///
/// # Errors
///
/// Returns [`super::CommandError::Parse`] if the text is not a valid filter.
pub fn execute_parse(ctx: &CommandContext, text: &str) -> Result<()> {
    let parsed = parse(text)?;

    if ctx.json_output {
        println!("{}", format_parsed_json(&parsed)?);
    } else if !ctx.quiet {
        print!("{}", format_parsed_table(&parsed, ctx.use_colors));
    }
    Ok(())
}

/// Prints the canonical form of `text`.
pub fn execute_format(ctx: &CommandContext, text: &str) -> Result<()> {
    let parsed = parse(text)?;
    let canonical = canonical_text(&parsed);

    if ctx.json_output {
        let output = serde_json::json!({ "canonical": canonical });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{canonical}");
    }
    Ok(())
}

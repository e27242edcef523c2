//! Parsed expression output formatting.

use std::collections::BTreeSet;

use filter_expr_rs::{serialize, Expr, Parsed, SerializeOptions};
use owo_colors::OwoColorize;
use serde::Serialize;

/// JSON output structure for the parse command.
#[derive(Serialize)]
pub struct ParsedOutput<'a> {
    pub canonical: String,
    pub list_columns: &'a BTreeSet<String>,
    pub identifiers: Vec<String>,
    pub expr: &'a Expr,
}

fn options(parsed: &Parsed) -> SerializeOptions {
    SerializeOptions {
        list_columns: parsed.meta.list_columns.clone(),
    }
}

/// Canonical text of a parse result.
pub fn canonical_text(parsed: &Parsed) -> String {
    serialize(&parsed.expr, &options(parsed))
}

/// Formats a parse result as JSON.
pub fn format_parsed_json(parsed: &Parsed) -> Result<String, serde_json::Error> {
    let output = ParsedOutput {
        canonical: canonical_text(parsed),
        list_columns: &parsed.meta.list_columns,
        identifiers: parsed.expr.identifiers(),
        expr: &parsed.expr,
    };
    serde_json::to_string_pretty(&output)
}

/// Formats a parse result as the canonical text followed by an indented
/// outline of the tree.
pub fn format_parsed_table(parsed: &Parsed, use_colors: bool) -> String {
    let options = options(parsed);
    let canonical = serialize(&parsed.expr, &options);
    let mut output = String::new();

    if canonical.is_empty() {
        output.push_str("(empty filter)\n");
        return output;
    }
    if use_colors {
        output.push_str(&format!("{}\n", canonical.bold()));
    } else {
        output.push_str(&canonical);
        output.push('\n');
    }

    outline(&parsed.expr, &options, 0, use_colors, &mut output);
    output
}

fn outline(expr: &Expr, options: &SerializeOptions, depth: usize, use_colors: bool, out: &mut String) {
    let indent = "  ".repeat(depth);
    let (label, children) = match expr {
        Expr::And(children) => ("AND", Some(children)),
        Expr::Or(children) => ("OR", Some(children)),
        Expr::Having { column, condition } => {
            let head = format!("{indent}{column} HAVING");
            out.push_str(&paint(&head, use_colors));
            out.push('\n');
            outline(condition, options, depth + 1, use_colors, out);
            return;
        }
        leaf => {
            out.push_str(&format!("{indent}{}\n", serialize(leaf, options)));
            return;
        }
    };
    if let Some(children) = children {
        out.push_str(&paint(&format!("{indent}{label}"), use_colors));
        out.push('\n');
        for child in children {
            outline(child, options, depth + 1, use_colors, out);
        }
    }
}

fn paint(text: &str, use_colors: bool) -> String {
    if use_colors {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

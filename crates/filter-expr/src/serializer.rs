//! Canonical text rendering for filter expressions.
//!
//! The output is always accepted by [`crate::FilterParser`], and parsing it
//! back yields an equivalent tree.

use std::collections::BTreeSet;

use super::ast::{Expr, Value};

/// Options controlling serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Columns whose membership nodes render as `IN LIST (...)`.
    pub list_columns: BTreeSet<String>,
}

impl SerializeOptions {
    /// Creates options with the given list-mode columns.
    pub fn with_list_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            list_columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Renders an expression as canonical filter text.
///
/// Joiners at the top level are bare; nested joiners are parenthesized.
/// Nodes that cannot be rendered (an empty value list, a comparison with a
/// missing operand) produce nothing and are dropped by their parent.
///
/// # Example
///
/// ```
/// use filter_expr_rs::{serialize, Expr, SerializeOptions, Value};
///
/// let expr = Expr::and([
///     Expr::in_set("country", vec![Value::from("US"), Value::from("CA")]),
///     Expr::like("city", "%san%"),
/// ]);
/// assert_eq!(
///     serialize(&expr, &SerializeOptions::default()),
///     "country IN ('US','CA') AND city LIKE '%san%'"
/// );
/// ```
pub fn serialize(expr: &Expr, options: &SerializeOptions) -> String {
    Serializer { options }.render(expr, 0)
}

struct Serializer<'a> {
    options: &'a SerializeOptions,
}

impl Serializer<'_> {
    fn render(&self, expr: &Expr, depth: usize) -> String {
        match expr {
            Expr::Identifier(name) => identifier(name),
            Expr::Literal(value) => literal(value),
            Expr::And(children) => self.join(children, "AND", depth),
            Expr::Or(children) => self.join(children, "OR", depth),
            Expr::Compare { op, left, right } => {
                let left = self.operand(left);
                let right = self.operand(right);
                if left.is_empty() || right.is_empty() {
                    return String::new();
                }
                format!("{left} {} {right}", op.keyword())
            }
            Expr::In {
                column,
                values,
                exclude,
            } => {
                let column_text = identifier(column);
                if column_text.is_empty() || values.is_empty() {
                    return String::new();
                }
                let list = self.options.list_columns.contains(column);
                let operator = match (*exclude, list) {
                    (false, false) => "IN",
                    (true, false) => "NIN",
                    (false, true) => "IN LIST",
                    (true, true) => "NOT IN LIST",
                };
                let rendered: Vec<String> = values.iter().map(literal).collect();
                format!("{column_text} {operator} ({})", rendered.join(","))
            }
            Expr::Like {
                column,
                pattern,
                exclude,
            } => {
                let column_text = identifier(column);
                if column_text.is_empty() {
                    return String::new();
                }
                let operator = if *exclude { "NLIKE" } else { "LIKE" };
                format!("{column_text} {operator} {}", quote_string(pattern))
            }
            Expr::Having { column, condition } => {
                let column_text = identifier(column);
                let inner = self.render(condition, 0);
                if column_text.is_empty() || inner.is_empty() {
                    return String::new();
                }
                format!("{column_text} HAVING ({inner})")
            }
        }
    }

    /// Renders one side of a comparison. Only identifiers and literals are
    /// operands; anything else yields nothing.
    fn operand(&self, expr: &Expr) -> String {
        match expr {
            Expr::Identifier(_) | Expr::Literal(_) => self.render(expr, 0),
            _ => String::new(),
        }
    }

    fn join(&self, children: &[std::sync::Arc<Expr>], joiner: &str, depth: usize) -> String {
        let parts: Vec<String> = children
            .iter()
            .map(|child| self.render(child, depth + 1))
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            return String::new();
        }
        let separator = format!(" {joiner} ");
        let joined = parts.join(&separator);
        if depth == 0 || parts.len() == 1 {
            joined
        } else {
            format!("({joined})")
        }
    }
}

/// Returns `true` if `name` can be written without quotes.
pub fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Renders a column name, double-quoting it when it is not a bare word.
fn identifier(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    if is_bare_identifier(name) {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Renders a string literal in single quotes.
fn quote_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => quote_string(s),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) if !f.is_finite() => String::new(),
        Value::Float(f) => {
            let text = f.to_string();
            if text.contains('.') {
                text
            } else {
                format!("{text}.0")
            }
        }
        Value::Boolean(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::List(items) => {
            let parts: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{}:{}", quote_string(key), literal(value)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

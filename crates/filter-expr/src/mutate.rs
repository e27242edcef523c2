//! Structural edits on a view's dimension filter.
//!
//! Every function takes the current tree by reference and returns a new
//! one. The root is normalized to an `And`; only the touched root child is
//! rebuilt, all other children are shared with the input tree.
//!
//! A dimension is matched by the column of a root-level `IN`/`NIN` or
//! `LIKE`/`NLIKE` node. Anything nested deeper (inside an `OR`, a `HAVING`)
//! is left alone.

use std::sync::Arc;

use super::ast::{Expr, Value};

/// Options for [`toggle_value`] and [`toggle_values`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToggleOptions {
    /// Polarity of a newly created node. Ignored when a membership node
    /// already exists, which keeps its own polarity.
    pub exclude: bool,
    /// Replace the whole selection with the toggled value.
    pub exclusive: bool,
}

/// Where the rebuilt node for a dimension goes.
enum Slot {
    Replace(usize),
    Append,
}

/// Returns the root children of `expr`, treating a non-`And` root as a
/// single child.
pub fn root_children(expr: &Expr) -> Vec<Arc<Expr>> {
    match expr {
        Expr::And(children) => children.clone(),
        other if other.is_empty() => Vec::new(),
        other => vec![Arc::new(other.clone())],
    }
}

/// Finds the root-level membership or pattern node for `dimension`.
pub fn find_dimension_filter<'e>(expr: &'e Expr, dimension: &str) -> Option<&'e Expr> {
    match expr {
        Expr::And(children) => children
            .iter()
            .map(|child| &**child)
            .find(|child| is_dimension_node(child, dimension)),
        other if is_dimension_node(other, dimension) => Some(other),
        _ => None,
    }
}

fn is_dimension_node(expr: &Expr, dimension: &str) -> bool {
    matches!(expr, Expr::In { column, .. } | Expr::Like { column, .. } if column == dimension)
}

fn position(children: &[Arc<Expr>], dimension: &str) -> Option<usize> {
    children
        .iter()
        .position(|child| is_dimension_node(child, dimension))
}

fn place(mut children: Vec<Arc<Expr>>, slot: Slot, node: Option<Expr>) -> Expr {
    match (slot, node) {
        (Slot::Replace(index), Some(node)) => children[index] = Arc::new(node),
        (Slot::Replace(index), None) => {
            children.remove(index);
        }
        (Slot::Append, Some(node)) => children.push(Arc::new(node)),
        (Slot::Append, None) => {}
    }
    Expr::And(children)
}

/// Adds `value` to the selection for `dimension`, or removes it if already
/// selected.
///
/// A `LIKE` node for the dimension is replaced by the membership node at the
/// same position. When the selection becomes empty the node is removed.
///
/// # Example
///
/// ```
/// use filter_expr_rs::{serialize, toggle_value, Expr, SerializeOptions, ToggleOptions, Value};
///
/// let opts = ToggleOptions::default();
/// let expr = toggle_value(&Expr::empty(), "country", &Value::from("US"), opts);
/// let expr = toggle_value(&expr, "country", &Value::from("CA"), opts);
/// assert_eq!(
///     serialize(&expr, &SerializeOptions::default()),
///     "country IN ('US','CA')"
/// );
/// ```
pub fn toggle_value(expr: &Expr, dimension: &str, value: &Value, options: ToggleOptions) -> Expr {
    toggle_values(expr, dimension, std::slice::from_ref(value), options)
}

/// Toggles several values in order. See [`toggle_value`].
pub fn toggle_values(
    expr: &Expr,
    dimension: &str,
    values: &[Value],
    options: ToggleOptions,
) -> Expr {
    let children = root_children(expr);
    let index = position(&children, dimension);

    let (mut selected, exclude, slot) = match index {
        Some(i) => match children[i].as_ref() {
            Expr::In {
                values: current,
                exclude,
                ..
            } => (current.clone(), *exclude, Slot::Replace(i)),
            // Switching away from contains mode discards the search text.
            _ => (Vec::new(), options.exclude, Slot::Replace(i)),
        },
        None => (Vec::new(), options.exclude, Slot::Append),
    };

    for value in values {
        if options.exclusive {
            selected = vec![value.clone()];
        } else if let Some(pos) = selected.iter().position(|v| v == value) {
            selected.remove(pos);
        } else {
            selected.push(value.clone());
        }
    }

    let node = (!selected.is_empty()).then(|| Expr::In {
        column: dimension.to_string(),
        values: selected,
        exclude,
    });
    place(children, slot, node)
}

/// Puts `dimension` into contains mode with pattern `%search_text%`.
///
/// With `exclude` set to `None` an existing node keeps its polarity
/// (`NIN` becomes `NLIKE`); a new node is inclusive.
pub fn apply_contains_mode(
    expr: &Expr,
    dimension: &str,
    search_text: &str,
    exclude: Option<bool>,
) -> Expr {
    let children = root_children(expr);
    let index = position(&children, dimension);
    let existing = index.and_then(|i| children[i].exclude());

    let node = Expr::Like {
        column: dimension.to_string(),
        pattern: contains_pattern(search_text),
        exclude: exclude.or(existing).unwrap_or(false),
    };
    let slot = index.map_or(Slot::Append, Slot::Replace);
    place(children, slot, Some(node))
}

/// Replaces the filter for `dimension` with an inclusive membership over
/// `values`. The caller records the list-mode flag for the column.
///
/// An empty `values` list removes the filter.
pub fn apply_in_list_mode(expr: &Expr, dimension: &str, values: &[Value]) -> Expr {
    let children = root_children(expr);
    let slot = position(&children, dimension).map_or(Slot::Append, Slot::Replace);
    let node = (!values.is_empty()).then(|| Expr::in_set(dimension, values.to_vec()));
    place(children, slot, node)
}

/// Flips the polarity of the filter for `dimension`. No-op when the
/// dimension has no filter.
pub fn toggle_exclude_mode(expr: &Expr, dimension: &str) -> Expr {
    let children = root_children(expr);
    let Some(index) = position(&children, dimension) else {
        return Expr::And(children);
    };

    let negated = match children[index].as_ref() {
        Expr::In {
            column,
            values,
            exclude,
        } => Expr::In {
            column: column.clone(),
            values: values.clone(),
            exclude: !exclude,
        },
        Expr::Like {
            column,
            pattern,
            exclude,
        } => Expr::Like {
            column: column.clone(),
            pattern: pattern.clone(),
            exclude: !exclude,
        },
        other => other.clone(),
    };
    place(children, Slot::Replace(index), Some(negated))
}

/// Removes the filter for `dimension`. No-op when absent.
pub fn remove_filter(expr: &Expr, dimension: &str) -> Expr {
    let children = root_children(expr);
    match position(&children, dimension) {
        Some(index) => place(children, Slot::Replace(index), None),
        None => Expr::And(children),
    }
}

/// Wraps search text into a substring pattern.
pub fn contains_pattern(search_text: &str) -> String {
    format!("%{search_text}%")
}

/// Recovers the search text from a substring pattern.
pub fn search_text(pattern: &str) -> &str {
    let trimmed = pattern.strip_prefix('%').unwrap_or(pattern);
    trimmed.strip_suffix('%').unwrap_or(trimmed)
}

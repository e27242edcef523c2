//! Measure threshold filters and the split/recombine passes that move them
//! in and out of a view's expression.
//!
//! A threshold is a post-aggregation condition on a measure, optionally
//! scoped by a grouping dimension. In text it is either a `HAVING` node
//! (`country HAVING (revenue GT 100)`) or, without grouping, a top-level
//! comparison (`revenue GT 100`). Thresholds are edited apart from value
//! filters and merged back into one expression on every write.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ast::{CompareOp, Expr, Value};
use super::mutate::root_children;

/// A single `measure operator value` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEntry {
    /// The measure being compared.
    pub measure: String,
    /// The comparison operator.
    pub operator: CompareOp,
    /// The threshold value.
    pub value: Value,
}

impl ThresholdEntry {
    /// Creates a new entry.
    pub fn new(measure: impl Into<String>, operator: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            measure: measure.into(),
            operator,
            value: value.into(),
        }
    }

    /// Builds the comparison node for this entry.
    pub fn to_expr(&self) -> Expr {
        Expr::compare(
            self.operator,
            Expr::Identifier(self.measure.clone()),
            Expr::Literal(self.value.clone()),
        )
    }

    /// Recognizes `measure OP literal`. Any other shape returns `None`.
    pub fn from_expr(expr: &Expr) -> Option<Self> {
        let Expr::Compare { op, left, right } = expr else {
            return None;
        };
        match (left.as_ref(), right.as_ref()) {
            (Expr::Identifier(measure), Expr::Literal(value)) => {
                Some(Self::new(measure.clone(), *op, value.clone()))
            }
            _ => None,
        }
    }
}

/// All thresholds sharing one grouping dimension (or none).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdGroup {
    /// Grouping dimension; `None` for ungrouped thresholds.
    pub dimension: Option<String>,
    /// Entries in insertion order, at most one per measure.
    pub filters: Vec<ThresholdEntry>,
}

impl ThresholdGroup {
    fn matches(&self, grouping: Option<&str>) -> bool {
        self.dimension.as_deref() == grouping
    }

    /// Returns the entry for `measure`, if any.
    pub fn entry(&self, measure: &str) -> Option<&ThresholdEntry> {
        self.filters.iter().find(|f| f.measure == measure)
    }
}

/// Sets the threshold for `entry.measure` in the group for `grouping`.
///
/// An existing entry for the measure is replaced in place; otherwise it is
/// appended. The group is created on first use.
pub fn set_threshold(
    groups: &[ThresholdGroup],
    grouping: Option<&str>,
    entry: ThresholdEntry,
) -> Vec<ThresholdGroup> {
    let mut groups = groups.to_vec();
    match groups.iter_mut().find(|g| g.matches(grouping)) {
        Some(group) => match group.filters.iter_mut().find(|f| f.measure == entry.measure) {
            Some(existing) => *existing = entry,
            None => group.filters.push(entry),
        },
        None => groups.push(ThresholdGroup {
            dimension: grouping.map(str::to_string),
            filters: vec![entry],
        }),
    }
    groups
}

/// Removes the threshold for `measure` from the group for `grouping`.
/// A group left without entries is dropped.
pub fn remove_threshold(
    groups: &[ThresholdGroup],
    grouping: Option<&str>,
    measure: &str,
) -> Vec<ThresholdGroup> {
    let mut groups = groups.to_vec();
    if let Some(index) = groups.iter().position(|g| g.matches(grouping)) {
        groups[index].filters.retain(|f| f.measure != measure);
        if groups[index].filters.is_empty() {
            groups.remove(index);
        }
    }
    groups
}

/// Moves a measure's threshold from one grouping to another, replacing it
/// with `entry`.
pub fn move_threshold(
    groups: &[ThresholdGroup],
    from: Option<&str>,
    to: Option<&str>,
    entry: ThresholdEntry,
) -> Vec<ThresholdGroup> {
    let without = remove_threshold(groups, from, &entry.measure);
    set_threshold(&without, to, entry)
}

/// Finds the threshold for `measure` in any group.
pub fn find_threshold<'g>(
    groups: &'g [ThresholdGroup],
    measure: &str,
) -> Option<(&'g ThresholdGroup, &'g ThresholdEntry)> {
    groups
        .iter()
        .find_map(|group| group.entry(measure).map(|entry| (group, entry)))
}

/// Splits a view's expression into its dimension part and its thresholds.
///
/// Root-level `HAVING` nodes whose condition is a measure comparison (or an
/// `AND` of them) become grouped thresholds. Root-level comparisons on a
/// column for which `is_measure` holds become ungrouped thresholds.
/// Everything else stays in the dimension part, in its original order.
///
/// A group holds one entry per measure, so a measure compared more than once
/// under the same grouping (a range such as `revenue GT 10 AND revenue LT
/// 100`) is left in the dimension part as written.
///
/// # Example
///
/// ```
/// use filter_expr_rs::{parse, split_where};
///
/// let parsed = parse("country IN ('US') AND country HAVING (revenue GT 100)").unwrap();
/// let (dimension, groups) = split_where(&parsed.expr, |name| name == "revenue");
/// assert_eq!(dimension.children().len(), 1);
/// assert_eq!(groups[0].dimension.as_deref(), Some("country"));
/// ```
pub fn split_where(expr: &Expr, is_measure: impl Fn(&str) -> bool) -> (Expr, Vec<ThresholdGroup>) {
    let children = root_children(expr);
    let candidates: Vec<_> = children
        .iter()
        .map(|child| threshold_candidate(child, &is_measure))
        .collect();

    let mut occurrences: HashMap<(Option<&str>, &str), usize> = HashMap::new();
    for (grouping, entries) in candidates.iter().flatten() {
        for entry in entries {
            *occurrences
                .entry((*grouping, entry.measure.as_str()))
                .or_default() += 1;
        }
    }
    let splittable: Vec<bool> = candidates
        .iter()
        .map(|candidate| match candidate {
            Some((grouping, entries)) => entries
                .iter()
                .all(|e| occurrences.get(&(*grouping, e.measure.as_str())) == Some(&1)),
            None => false,
        })
        .collect();

    let mut dimension = Vec::new();
    let mut groups: Vec<ThresholdGroup> = Vec::new();
    for ((child, candidate), split) in children.iter().zip(&candidates).zip(splittable) {
        match candidate {
            Some((grouping, entries)) if split => {
                for entry in entries {
                    groups = set_threshold(&groups, *grouping, entry.clone());
                }
            }
            _ => dimension.push(Arc::clone(child)),
        }
    }

    (Expr::And(dimension), groups)
}

/// The grouping and entries `expr` would contribute as a threshold.
fn threshold_candidate<'e>(
    expr: &'e Expr,
    is_measure: &impl Fn(&str) -> bool,
) -> Option<(Option<&'e str>, Vec<ThresholdEntry>)> {
    if let Some((column, entries)) = having_entries(expr) {
        return Some((Some(column), entries));
    }
    ThresholdEntry::from_expr(expr)
        .filter(|entry| is_measure(&entry.measure))
        .map(|entry| (None, vec![entry]))
}

fn having_entries(expr: &Expr) -> Option<(&str, Vec<ThresholdEntry>)> {
    let Expr::Having { column, condition } = expr else {
        return None;
    };
    let entries = match condition.as_ref() {
        Expr::And(children) if !children.is_empty() => children
            .iter()
            .map(|c| ThresholdEntry::from_expr(c.as_ref()))
            .collect::<Option<Vec<_>>>()?,
        single => vec![ThresholdEntry::from_expr(single)?],
    };
    Some((column.as_str(), entries))
}

/// Recombines a dimension expression with thresholds into one root `And`.
///
/// Dimension conditions come first, then grouped thresholds as `HAVING`
/// nodes, with ungrouped comparisons placed where their group sits.
pub fn merge_where(dimension: &Expr, groups: &[ThresholdGroup]) -> Expr {
    let mut children = root_children(dimension);

    for group in groups.iter().filter(|g| !g.filters.is_empty()) {
        match &group.dimension {
            Some(column) => {
                let condition = match group.filters.as_slice() {
                    [single] => single.to_expr(),
                    many => Expr::and(many.iter().map(ThresholdEntry::to_expr)),
                };
                children.push(Arc::new(Expr::having(column.clone(), condition)));
            }
            None => children.extend(group.filters.iter().map(|f| Arc::new(f.to_expr()))),
        }
    }

    Expr::And(children)
}

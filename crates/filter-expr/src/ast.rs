//! Boolean expression tree (BET) for filter expressions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Comparison operator used by [`Expr::Compare`] and measure thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    /// Equal (`EQ`).
    Eq,
    /// Not equal (`NEQ`).
    Neq,
    /// Greater than (`GT`).
    Gt,
    /// Greater than or equal (`GTE`).
    Gte,
    /// Less than (`LT`).
    Lt,
    /// Less than or equal (`LTE`).
    Lte,
}

impl CompareOp {
    /// All operators, in keyword order.
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Eq,
        CompareOp::Neq,
        CompareOp::Gt,
        CompareOp::Gte,
        CompareOp::Lt,
        CompareOp::Lte,
    ];

    /// Returns the canonical keyword used in filter text.
    pub fn keyword(self) -> &'static str {
        match self {
            CompareOp::Eq => "EQ",
            CompareOp::Neq => "NEQ",
            CompareOp::Gt => "GT",
            CompareOp::Gte => "GTE",
            CompareOp::Lt => "LT",
            CompareOp::Lte => "LTE",
        }
    }

    /// Returns the symbolic form, used for display.
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }

    /// Matches a keyword case-insensitively (`gt`, `GTE`, ...).
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.keyword().eq_ignore_ascii_case(word))
    }

    /// Matches either a keyword or a symbol (`>`, `>=`, `!=`, ...).
    pub fn parse_any(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::from_keyword(text).or_else(|| Self::ALL.into_iter().find(|op| op.symbol() == text))
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A scalar or composite literal value.
///
/// The grammar only ever produces strings, integers and floats. The other
/// variants exist so that trees built programmatically still have a defined
/// textual form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Creates a string value.
    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as it should appear to a user (strings unquoted).
    pub fn display_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Interprets free-form user input: numbers become numeric values,
    /// everything else a string.
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        if trimmed.contains('.') {
            if let Ok(f) = trimmed.parse::<f64>() {
                if f.is_finite() {
                    return Value::Float(f);
                }
            }
        }
        Value::String(input.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(","))
            }
            Value::Object(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{k}:{v}")).collect();
                write!(f, "{{{}}}", parts.join(","))
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// A node of the boolean expression tree.
///
/// Children are held behind [`Arc`] so that a mutation only rebuilds the
/// path it touches; every other subtree is shared with the previous tree.
///
/// The root of a view's filter is always an [`Expr::And`]. An empty `And`
/// means "no filter" and is the only place an empty joiner may appear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    // ==================== Operands ====================
    /// A dimension or measure column name.
    Identifier(String),

    /// A literal value.
    Literal(Value),

    // ==================== Conditions ====================
    /// Binary comparison. At least one side is an identifier when parsed.
    Compare {
        op: CompareOp,
        left: Arc<Expr>,
        right: Arc<Expr>,
    },

    /// Set membership (`IN`), or its negation (`NIN`) when `exclude` is set.
    In {
        column: String,
        values: Vec<Value>,
        exclude: bool,
    },

    /// Pattern match (`LIKE`), or its negation (`NLIKE`) when `exclude` is set.
    Like {
        column: String,
        pattern: String,
        exclude: bool,
    },

    /// Aggregate condition scoped to a grouping column. Carried through
    /// verbatim; nothing in this crate evaluates it.
    Having { column: String, condition: Arc<Expr> },

    // ==================== Joiners ====================
    /// Conjunction. Never directly contains another `And`.
    And(Vec<Arc<Expr>>),

    /// Disjunction. Never directly contains another `Or`.
    Or(Vec<Arc<Expr>>),
}

impl Default for Expr {
    fn default() -> Self {
        Expr::empty()
    }
}

impl Expr {
    /// The always-true filter: an `And` without children.
    pub fn empty() -> Self {
        Expr::And(Vec::new())
    }

    /// Creates an identifier operand.
    pub fn identifier(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    /// Creates a literal operand.
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Creates a comparison.
    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Expr::Compare {
            op,
            left: Arc::new(left),
            right: Arc::new(right),
        }
    }

    /// Creates an `IN` node.
    pub fn in_set(column: impl Into<String>, values: Vec<Value>) -> Self {
        Expr::In {
            column: column.into(),
            values,
            exclude: false,
        }
    }

    /// Creates a `NIN` node.
    pub fn not_in_set(column: impl Into<String>, values: Vec<Value>) -> Self {
        Expr::In {
            column: column.into(),
            values,
            exclude: true,
        }
    }

    /// Creates a `LIKE` node.
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Expr::Like {
            column: column.into(),
            pattern: pattern.into(),
            exclude: false,
        }
    }

    /// Creates an `NLIKE` node.
    pub fn not_like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Expr::Like {
            column: column.into(),
            pattern: pattern.into(),
            exclude: true,
        }
    }

    /// Creates a `HAVING` node.
    pub fn having(column: impl Into<String>, condition: Expr) -> Self {
        Expr::Having {
            column: column.into(),
            condition: Arc::new(condition),
        }
    }

    /// Creates a flattened `And` from owned children.
    ///
    /// # Example
    ///
    /// ```
    /// use filter_expr_rs::{Expr, Value};
    ///
    /// let inner = Expr::and([Expr::in_set("a", vec![Value::from("x")])]);
    /// let outer = Expr::and([inner, Expr::like("b", "%y%")]);
    /// assert_eq!(outer.children().len(), 2);
    /// ```
    pub fn and(children: impl IntoIterator<Item = Expr>) -> Self {
        Expr::and_of(children.into_iter().map(Arc::new).collect())
    }

    /// Creates a flattened `Or` from owned children.
    pub fn or(children: impl IntoIterator<Item = Expr>) -> Self {
        Expr::or_of(children.into_iter().map(Arc::new).collect())
    }

    /// Creates a flattened `And` from shared children. Nested `And`
    /// children are spliced into the result.
    pub fn and_of(children: Vec<Arc<Expr>>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child.as_ref() {
                Expr::And(grand) => flat.extend(grand.iter().cloned()),
                _ => flat.push(child),
            }
        }
        Expr::And(flat)
    }

    /// Creates a flattened `Or` from shared children.
    pub fn or_of(children: Vec<Arc<Expr>>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child.as_ref() {
                Expr::Or(grand) => flat.extend(grand.iter().cloned()),
                _ => flat.push(child),
            }
        }
        Expr::Or(flat)
    }

    /// Returns `true` for a joiner without children.
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(children) | Expr::Or(children) => children.is_empty(),
            _ => false,
        }
    }

    /// Returns `true` for `And` and `Or`.
    pub fn is_joiner(&self) -> bool {
        matches!(self, Expr::And(_) | Expr::Or(_))
    }

    /// Returns the children of a joiner, or an empty slice for any other node.
    pub fn children(&self) -> &[Arc<Expr>] {
        match self {
            Expr::And(children) | Expr::Or(children) => children,
            _ => &[],
        }
    }

    /// Returns the column a membership, pattern or having node applies to.
    pub fn column(&self) -> Option<&str> {
        match self {
            Expr::In { column, .. } | Expr::Like { column, .. } | Expr::Having { column, .. } => {
                Some(column)
            }
            _ => None,
        }
    }

    /// Returns `Some(exclude)` for membership and pattern nodes.
    pub fn exclude(&self) -> Option<bool> {
        match self {
            Expr::In { exclude, .. } | Expr::Like { exclude, .. } => Some(*exclude),
            _ => None,
        }
    }

    /// Returns the identifier name if this is an identifier operand.
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Expr::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the literal if this is a literal operand.
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expr::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Wraps any node into a root `And`, flattening an existing one.
    pub fn into_root(self) -> Expr {
        match self {
            Expr::And(_) => self,
            other if other.is_empty() => Expr::empty(),
            other => Expr::And(vec![Arc::new(other)]),
        }
    }

    /// Collects every column name referenced anywhere in the tree, in
    /// first-occurrence order and without duplicates.
    pub fn identifiers(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_identifiers(&mut names);
        names
    }

    fn collect_identifiers(&self, names: &mut Vec<String>) {
        match self {
            Expr::Identifier(name) => push_unique(names, name),
            Expr::Literal(_) => {}
            Expr::In { column, .. } | Expr::Like { column, .. } => push_unique(names, column),
            Expr::Compare { left, right, .. } => {
                left.collect_identifiers(names);
                right.collect_identifiers(names);
            }
            Expr::Having { column, condition } => {
                push_unique(names, column);
                condition.collect_identifiers(names);
            }
            Expr::And(children) | Expr::Or(children) => {
                for child in children {
                    child.collect_identifiers(names);
                }
            }
        }
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = crate::serializer::serialize(self, &crate::serializer::SerializeOptions::default());
        f.write_str(&text)
    }
}

//! Threshold commands: set and remove measure conditions.

use filter_expr_rs::{CompareOp, ThresholdEntry, Value};

use super::session::{FieldRole, FilterSession};
use super::{CommandContext, CommandError, Result};

/// Options for the threshold set command.
#[derive(Debug)]
pub struct ThresholdSetOptions {
    pub measure: String,
    pub operator: String,
    pub value: String,
    /// Grouping dimension.
    pub by: Option<String>,
    pub views: Vec<String>,
}

/// Reads an operator keyword (`GT`) or symbol (`>`).
fn parse_operator(text: &str) -> Result<CompareOp> {
    CompareOp::parse_any(text).ok_or_else(|| {
        let valid: Vec<&str> = CompareOp::ALL.iter().map(|op| op.keyword()).collect();
        CommandError::InvalidArgument(format!(
            "Unknown operator '{}'. Valid operators: {} (or =, !=, >, >=, <, <=)",
            text,
            valid.join(", ")
        ))
    })
}

/// Executes the threshold set command.
pub async fn execute_set(ctx: &CommandContext, opts: &ThresholdSetOptions) -> Result<()> {
    let operator = parse_operator(&opts.operator)?;
    let mut session = FilterSession::open(ctx).await?;
    session.check_field(&opts.measure, FieldRole::Measure, &opts.views)?;
    if let Some(by) = &opts.by {
        session.check_field(by, FieldRole::Dimension, &opts.views)?;
    }

    let entry = ThresholdEntry::new(opts.measure.clone(), operator, Value::from_input(&opts.value));
    let update = session
        .manager
        .set_threshold(opts.by.as_deref(), entry, &opts.views);
    let key = session.manager.key_for(&opts.measure, &opts.views);
    session.commit(ctx, "threshold set", Some(key), update).await
}

/// Executes the threshold remove command.
pub async fn execute_remove(ctx: &CommandContext, measure: &str, views: &[String]) -> Result<()> {
    let mut session = FilterSession::open(ctx).await?;
    session.check_field(measure, FieldRole::Measure, views)?;

    let key = session.manager.key_for(measure, views);
    let update = session.manager.remove_threshold(measure, views);
    session.commit(ctx, "threshold remove", Some(key), update).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operator_accepts_keywords_and_symbols() {
        assert_eq!(parse_operator("gte").unwrap(), CompareOp::Gte);
        assert_eq!(parse_operator(">").unwrap(), CompareOp::Gt);
        assert_eq!(parse_operator("!=").unwrap(), CompareOp::Neq);
    }

    #[test]
    fn test_parse_operator_rejects_unknown() {
        let err = parse_operator("between").unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument(_)));
        assert!(err.to_string().contains("EQ, NEQ, GT, GTE, LT, LTE"));
    }
}

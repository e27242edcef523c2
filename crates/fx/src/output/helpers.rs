//! Common helper functions for output formatting.

use filter_expr_rs::Value;
use filter_state_rs::{DimensionMode, MergedFilter, ResolvedFilter};
use owo_colors::OwoColorize;

/// Truncates a string to a maximum number of characters.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Joins values as the user typed them.
pub fn format_values(values: &[Value]) -> String {
    values
        .iter()
        .map(Value::display_text)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One-line summary of a merged entry's condition.
pub fn summarize_filter(filter: &ResolvedFilter) -> String {
    match filter {
        ResolvedFilter::Dimension {
            mode,
            include,
            values,
            search_text,
        } => {
            let negation = if *include { "" } else { "not " };
            match mode {
                DimensionMode::Contains => format!(
                    "{negation}contains '{}'",
                    search_text.as_deref().unwrap_or_default()
                ),
                _ if values.is_empty() => "(any)".to_string(),
                DimensionMode::InList => {
                    format!("{negation}in list ({})", format_values(values))
                }
                DimensionMode::Select => format!("{negation}{}", format_values(values)),
            }
        }
        ResolvedFilter::Measure { dimension, filter } => {
            let Some(entry) = filter else {
                return "(any)".to_string();
            };
            let condition = format!("{} {}", entry.operator.symbol(), entry.value.display_text());
            match dimension {
                Some(dimension) => format!("{condition} per {dimension}"),
                None => condition,
            }
        }
    }
}

/// Marker column for an entry: pinned, temporary or nothing.
pub fn format_marker(entry: &MergedFilter, use_colors: bool) -> String {
    let marker = if entry.pinned {
        "*"
    } else if entry.temporary {
        "+"
    } else {
        " "
    };
    if !use_colors {
        return marker.to_string();
    }
    if entry.pinned {
        marker.yellow().to_string()
    } else if entry.just_added {
        marker.green().bold().to_string()
    } else {
        marker.dimmed().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filter_expr_rs::{CompareOp, ThresholdEntry};

    #[test]
    fn test_truncate_str_counts_characters() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("abcdefghij", 8), "abcde...");
        assert_eq!(truncate_str("ééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_summarize_dimension_modes() {
        let select = ResolvedFilter::Dimension {
            mode: DimensionMode::Select,
            include: false,
            values: vec![Value::from("EU"), Value::Integer(3)],
            search_text: None,
        };
        assert_eq!(summarize_filter(&select), "not EU, 3");

        let contains = ResolvedFilter::Dimension {
            mode: DimensionMode::Contains,
            include: true,
            values: Vec::new(),
            search_text: Some("dh".to_string()),
        };
        assert_eq!(summarize_filter(&contains), "contains 'dh'");

        let list = ResolvedFilter::Dimension {
            mode: DimensionMode::InList,
            include: true,
            values: vec![Value::from("US"), Value::from("CA")],
            search_text: None,
        };
        assert_eq!(summarize_filter(&list), "in list (US, CA)");
    }

    #[test]
    fn test_summarize_placeholders() {
        let dimension = ResolvedFilter::Dimension {
            mode: DimensionMode::Select,
            include: true,
            values: Vec::new(),
            search_text: None,
        };
        assert_eq!(summarize_filter(&dimension), "(any)");

        let measure = ResolvedFilter::Measure {
            dimension: None,
            filter: None,
        };
        assert_eq!(summarize_filter(&measure), "(any)");
    }

    #[test]
    fn test_summarize_grouped_threshold() {
        let measure = ResolvedFilter::Measure {
            dimension: Some("region".to_string()),
            filter: Some(ThresholdEntry::new("revenue", CompareOp::Gte, 10i64)),
        };
        assert_eq!(summarize_filter(&measure), ">= 10 per region");
    }
}

//! Filter bar output formatting.

use filter_state_rs::{FilterManager, MergedDisplay, MergedFilter};
use owo_colors::OwoColorize;
use serde::Serialize;

use super::helpers::{format_marker, summarize_filter, truncate_str};

/// JSON output structure for the show command.
#[derive(Serialize)]
pub struct ShowOutput<'a> {
    pub display: &'a MergedDisplay,
    pub views: Vec<ViewOutput<'a>>,
    pub unresolved: Vec<UnresolvedOutput>,
}

/// One view's canonical text.
#[derive(Serialize)]
pub struct ViewOutput<'a> {
    pub name: &'a str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub complex_filters: usize,
}

/// An identifier a view does not define.
#[derive(Serialize)]
pub struct UnresolvedOutput {
    pub view: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

fn views_output(manager: &FilterManager) -> Vec<ViewOutput<'_>> {
    manager
        .states()
        .iter()
        .map(|state| ViewOutput {
            name: state.name(),
            text: state.text(),
            error: state.error().map(ToString::to_string),
            complex_filters: state.complex_filters().len(),
        })
        .collect()
}

fn unresolved_output(manager: &FilterManager) -> Vec<UnresolvedOutput> {
    manager
        .unresolved_fields()
        .into_iter()
        .map(|(view, field)| UnresolvedOutput {
            view,
            name: field.name,
            suggestion: field.suggestion,
        })
        .collect()
}

/// Formats the filter bar as JSON.
pub fn format_display_json(
    display: &MergedDisplay,
    manager: &FilterManager,
) -> Result<String, serde_json::Error> {
    let output = ShowOutput {
        display,
        views: views_output(manager),
        unresolved: unresolved_output(manager),
    };
    serde_json::to_string_pretty(&output)
}

fn push_section(output: &mut String, title: &str, entries: &[MergedFilter], use_colors: bool) {
    if entries.is_empty() {
        return;
    }
    if use_colors {
        output.push_str(&format!("{}\n", title.bold()));
    } else {
        output.push_str(title);
        output.push('\n');
    }
    for entry in entries {
        let line = format!(
            "{} {:<20} {:<24} {}",
            format_marker(entry, use_colors),
            truncate_str(&entry.label, 20),
            truncate_str(&entry.views.join(", "), 24),
            summarize_filter(&entry.filter)
        );
        output.push_str(&line);
        output.push('\n');
    }
}

/// Formats the filter bar as a table, followed by each view's text.
pub fn format_display_table(
    display: &MergedDisplay,
    manager: &FilterManager,
    use_colors: bool,
) -> String {
    let mut output = String::new();

    if display.iter().next().is_none() {
        output.push_str("No filters.\n");
    } else {
        let header = format!("  {:<20} {:<24} {}", "Field", "Views", "Filter");
        if use_colors {
            output.push_str(&format!("{}\n", header.dimmed()));
        } else {
            output.push_str(&header);
            output.push('\n');
        }
        push_section(&mut output, "Dimensions", &display.dimensions, use_colors);
        push_section(&mut output, "Measures", &display.measures, use_colors);
    }

    for view in views_output(manager) {
        if view.text.is_empty() && view.error.is_none() {
            continue;
        }
        let name = if use_colors {
            view.name.cyan().to_string()
        } else {
            view.name.to_string()
        };
        output.push_str(&format!("\n{name}: {}", view.text));
        if view.complex_filters > 0 {
            output.push_str(&format!(" ({} not shown)", view.complex_filters));
        }
        output.push('\n');
        if let Some(error) = view.error {
            output.push_str(&format!("  invalid filter ignored: {error}\n"));
        }
    }

    for field in unresolved_output(manager) {
        let mut line = format!(
            "\nUnknown field '{}' in view '{}'.",
            field.name, field.view
        );
        if let Some(suggestion) = field.suggestion {
            line.push_str(&format!(" Did you mean '{suggestion}'?"));
        }
        if use_colors {
            output.push_str(&line.yellow().to_string());
        } else {
            output.push_str(&line);
        }
        output.push('\n');
    }

    output
}

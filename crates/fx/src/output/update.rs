//! Action result output formatting.

use filter_state_rs::FilterUpdate;
use owo_colors::OwoColorize;
use serde::Serialize;

/// What an editing command did.
#[derive(Debug, Serialize)]
pub struct ActionResult<'a> {
    /// Command name, e.g. `toggle`.
    pub action: &'a str,
    /// Merge key of the affected filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// New text per affected view; `None` means the view has no filter.
    pub update: &'a FilterUpdate,
    /// Query string after the update.
    pub query: &'a str,
}

/// Formats an action result as JSON.
pub fn format_action_json(result: &ActionResult<'_>) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}

/// Formats an action result as one line per affected view.
pub fn format_action_table(result: &ActionResult<'_>, use_colors: bool) -> String {
    if result.update.is_empty() {
        return "No views changed.\n".to_string();
    }

    let mut output = String::new();
    for (view, text) in &result.update.views {
        let name = if use_colors {
            view.cyan().to_string()
        } else {
            view.clone()
        };
        match text {
            Some(text) => output.push_str(&format!("{name}: {text}\n")),
            None if use_colors => {
                output.push_str(&format!("{name}: {}\n", "(no filter)".dimmed()))
            }
            None => output.push_str(&format!("{name}: (no filter)\n")),
        }
    }
    output
}

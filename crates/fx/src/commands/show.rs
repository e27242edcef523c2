//! Show command implementation.
//!
//! Displays the merged filter bar of the current session.

use chrono::Utc;

use super::session::FilterSession;
use super::{CommandContext, Result};
use crate::output::{format_display_json, format_display_table};

/// Executes the show command. Read-only: the session is not saved.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let mut session = FilterSession::open(ctx).await?;
    let display = session.manager.display(Utc::now());

    if ctx.json_output {
        println!("{}", format_display_json(&display, &session.manager)?);
    } else if !ctx.quiet {
        print!(
            "{}",
            format_display_table(&display, &session.manager, ctx.use_colors)
        );
    }
    Ok(())
}

//! Filter bar membership commands: pin, add, clear.

use chrono::Utc;

use super::session::{FieldRole, FilterSession};
use super::{CommandContext, Result};

/// Executes the pin command, toggling the field's pin.
pub async fn execute_pin(ctx: &CommandContext, field: &str, views: &[String]) -> Result<()> {
    let mut session = FilterSession::open(ctx).await?;
    session.check_field(field, FieldRole::Any, views)?;

    let key = session.manager.key_for(field, views);
    let pinned = session.manager.toggle_pin(field, views);
    session.save().await?;

    if ctx.json_output {
        let output = serde_json::json!({ "key": key, "pinned": pinned });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        let verb = if pinned { "Pinned" } else { "Unpinned" };
        println!("{verb} {key}");
    }
    Ok(())
}

/// Executes the add command: shows an empty entry for the field.
pub async fn execute_add(ctx: &CommandContext, field: &str, views: &[String]) -> Result<()> {
    let mut session = FilterSession::open(ctx).await?;
    session.check_field(field, FieldRole::Any, views)?;

    let now = Utc::now();
    let key = session.manager.add_temporary_filter(field, views, now);
    let display = session.manager.display(now);
    let entry = display.get(&key);
    session.save().await?;

    if ctx.json_output {
        let output = serde_json::json!({ "key": key, "entry": entry });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        match entry {
            Some(entry) if entry.pinned => println!("{key} is pinned"),
            _ => println!("Added {key}"),
        }
    }
    Ok(())
}

/// Executes the clear command.
pub async fn execute_clear(ctx: &CommandContext) -> Result<()> {
    let mut session = FilterSession::open(ctx).await?;
    let update = session.manager.clear_all();
    session.commit(ctx, "clear", None, update).await
}

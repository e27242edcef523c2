//! Query string commands: print the session's query string or replace it.

use super::session::FilterSession;
use super::{CommandContext, Result};

/// Executes the url command.
pub async fn execute_url(ctx: &CommandContext) -> Result<()> {
    let session = FilterSession::open(ctx).await?;
    let query = session.url.to_query_string()?;

    if ctx.json_output {
        let output = serde_json::json!({ "query": query });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{query}");
    }
    Ok(())
}

/// Executes the load command: replaces the session's filters with those in
/// `query`. Views whose text does not parse are reset and reported.
pub async fn execute_load(ctx: &CommandContext, query: &str) -> Result<()> {
    let mut session = FilterSession::open(ctx).await?;
    session.load_query(ctx, query)?;
    session.save().await?;

    if ctx.json_output {
        let views: serde_json::Map<String, serde_json::Value> = session
            .manager
            .states()
            .iter()
            .map(|state| (state.name().to_string(), state.text().into()))
            .collect();
        let output = serde_json::json!({
            "query": session.url.to_query_string()?,
            "views": views,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        for state in session.manager.states() {
            if !state.text().is_empty() {
                println!("{}: {}", state.name(), state.text());
            }
        }
    }
    Ok(())
}
